//! Depth to opacity/blur mapping.
//!
//! Planes are only sharp and opaque inside a mid-depth focus band; both ends of
//! the depth range are transparent and blurred so wraps never pop.

use std::time::{Duration, Instant};

use crate::config::{BlurSettings, CurveWindow, FadeSettings};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Appearance {
    pub opacity: f32,
    pub blur: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppearanceCurve {
    fade: FadeSettings,
    blur: BlurSettings,
}

impl Default for AppearanceCurve {
    fn default() -> Self {
        Self::new(FadeSettings::default(), BlurSettings::default())
    }
}

impl AppearanceCurve {
    pub fn new(fade: FadeSettings, blur: BlurSettings) -> Self {
        Self { fade, blur }
    }

    /// Opacity for a normalized depth in `[0, 1)`, before the global multiplier.
    pub fn opacity(&self, t: f32) -> f32 {
        let FadeSettings { fade_in, fade_out } = self.fade;
        let opacity = if within(t, fade_in) {
            progress(t, fade_in)
        } else if t < fade_in.start {
            0.0
        } else if within(t, fade_out) {
            1.0 - progress(t, fade_out)
        } else if t > fade_out.end {
            0.0
        } else {
            1.0
        };
        opacity.clamp(0.0, 1.0)
    }

    pub fn blur(&self, t: f32) -> f32 {
        let BlurSettings {
            blur_in,
            blur_out,
            max_blur,
        } = self.blur;
        let blur = if within(t, blur_in) {
            max_blur * (1.0 - progress(t, blur_in))
        } else if t < blur_in.start {
            max_blur
        } else if within(t, blur_out) {
            max_blur * progress(t, blur_out)
        } else if t > blur_out.end {
            max_blur
        } else {
            0.0
        };
        blur.clamp(0.0, max_blur)
    }

    pub fn at(&self, normalized_depth: f32, global_opacity: f32) -> Appearance {
        Appearance {
            opacity: self.opacity(normalized_depth) * global_opacity.clamp(0.0, 1.0),
            blur: self.blur(normalized_depth),
        }
    }
}

fn within(t: f32, window: CurveWindow) -> bool {
    t >= window.start && t <= window.end
}

fn progress(t: f32, window: CurveWindow) -> f32 {
    let span = window.end - window.start;
    if span <= f32::EPSILON {
        return 1.0;
    }
    (t - window.start) / span
}

/// Global opacity ramp played once when the gallery first becomes visible.
#[derive(Debug, Clone, Copy)]
pub struct IntroFade {
    duration: Duration,
    started_at: Option<Instant>,
}

impl IntroFade {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            started_at: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    pub fn opacity(&self, now: Instant) -> f32 {
        let Some(started_at) = self.started_at else {
            return 0.0;
        };
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(started_at);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn curve() -> AppearanceCurve {
        AppearanceCurve::new(
            FadeSettings {
                fade_in: CurveWindow::new(0.05, 0.15),
                fade_out: CurveWindow::new(0.65, 0.75),
            },
            BlurSettings {
                blur_in: CurveWindow::new(0.0, 0.1),
                blur_out: CurveWindow::new(0.9, 1.0),
                max_blur: 3.0,
            },
        )
    }

    #[test]
    fn opacity_is_continuous_at_window_edges() {
        let c = curve();
        assert!(close(c.opacity(0.0), 0.0));
        assert!(close(c.opacity(0.05), 0.0));
        assert!(close(c.opacity(0.10), 0.5));
        assert!(close(c.opacity(0.15), 1.0));
        assert!(close(c.opacity(0.4), 1.0));
        assert!(close(c.opacity(0.65), 1.0));
        assert!(close(c.opacity(0.70), 0.5));
        assert!(close(c.opacity(0.75), 0.0));
        assert!(close(c.opacity(0.9), 0.0));
    }

    #[test]
    fn blur_is_inverse_shaped() {
        let c = curve();
        assert!(close(c.blur(0.0), 3.0));
        assert!(close(c.blur(0.05), 1.5));
        assert!(close(c.blur(0.1), 0.0));
        assert!(close(c.blur(0.5), 0.0));
        assert!(close(c.blur(0.95), 1.5));
        assert!(close(c.blur(0.999), 2.97));
    }

    #[test]
    fn global_opacity_multiplies_depth_opacity() {
        let c = curve();
        let a = c.at(0.10, 0.5);
        assert!(close(a.opacity, 0.25));
        assert!(close(a.blur, 0.0));
        assert!(close(c.at(0.4, 3.0).opacity, 1.0));
    }

    #[test]
    fn intro_fade_ramps_once_started() {
        let now = Instant::now();
        let mut fade = IntroFade::new(Duration::from_secs(4));
        assert_eq!(fade.opacity(now), 0.0);
        fade.start(now);
        assert!(close(fade.opacity(now + Duration::from_secs(1)), 0.25));
        assert_eq!(fade.opacity(now + Duration::from_secs(9)), 1.0);
        fade.start(now + Duration::from_secs(2));
        assert!(close(fade.opacity(now + Duration::from_secs(2)), 0.5));
    }

    #[test]
    fn zero_length_intro_is_fully_visible() {
        let now = Instant::now();
        let mut fade = IntroFade::new(Duration::ZERO);
        fade.start(now);
        assert_eq!(fade.opacity(now), 1.0);
    }
}
