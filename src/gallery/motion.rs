use std::time::{Duration, Instant};

use crate::config::GalleryOptions;
use crate::events::{InputEvent, KeyDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Manual,
    AutoPlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChange {
    pub from: Mode,
    pub to: Mode,
}

/// Mutable scroll state owned by one gallery instance.
#[derive(Debug, Clone, Copy)]
pub struct ScrollState {
    pub velocity: f32,
    pub mode: Mode,
    pub last_interaction: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionTuning {
    pub speed: f32,
    pub wheel_factor: f32,
    pub key_impulse: f32,
    pub damping: f32,
    pub auto_play_acceleration: f32,
    pub idle_timeout: Duration,
}

impl From<&GalleryOptions> for MotionTuning {
    fn from(opts: &GalleryOptions) -> Self {
        Self {
            speed: opts.speed,
            wheel_factor: opts.wheel_factor,
            key_impulse: opts.key_impulse,
            damping: opts.damping,
            auto_play_acceleration: opts.auto_play_acceleration,
            idle_timeout: opts.idle_timeout,
        }
    }
}

impl Default for MotionTuning {
    fn default() -> Self {
        Self::from(&GalleryOptions::default())
    }
}

/// Turns discrete input into a continuously damped scroll velocity.
///
/// Any input switches to [`Mode::Manual`]; [`MotionController::poll_idle`]
/// switches back to [`Mode::AutoPlay`] once no input arrived for
/// `idle_timeout`. The gallery starts in auto-play.
#[derive(Debug, Clone)]
pub struct MotionController {
    state: ScrollState,
    tuning: MotionTuning,
}

impl MotionController {
    pub fn new(tuning: MotionTuning, now: Instant) -> Self {
        Self {
            state: ScrollState {
                velocity: 0.0,
                mode: Mode::AutoPlay,
                last_interaction: now,
            },
            tuning,
        }
    }

    pub fn velocity(&self) -> f32 {
        self.state.velocity
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    /// Applies one input impulse and cancels auto-play on the same tick.
    pub fn on_input(&mut self, event: InputEvent, now: Instant) -> Option<ModeChange> {
        let impulse = match event {
            InputEvent::Wheel { delta_y } | InputEvent::TouchDrag { delta_y } => {
                delta_y * self.tuning.wheel_factor * self.tuning.speed
            }
            InputEvent::Key(KeyDirection::Forward) => self.tuning.key_impulse * self.tuning.speed,
            InputEvent::Key(KeyDirection::Backward) => {
                -self.tuning.key_impulse * self.tuning.speed
            }
        };
        if impulse.is_finite() {
            self.state.velocity += impulse;
        }
        self.state.last_interaction = now;
        self.goto(Mode::Manual)
    }

    /// Promotes to auto-play once the idle timeout has elapsed.
    pub fn poll_idle(&mut self, now: Instant) -> Option<ModeChange> {
        if self.state.mode == Mode::AutoPlay {
            return None;
        }
        if now.saturating_duration_since(self.state.last_interaction) > self.tuning.idle_timeout {
            return self.goto(Mode::AutoPlay);
        }
        None
    }

    /// Per-frame integration: auto-play drift, then damping. Returns the new velocity.
    pub fn on_frame(&mut self, dt: f32) -> f32 {
        if self.state.mode == Mode::AutoPlay && dt.is_finite() && dt > 0.0 {
            self.state.velocity += self.tuning.auto_play_acceleration * dt;
        }
        self.state.velocity *= self.tuning.damping;
        self.state.velocity
    }

    fn goto(&mut self, to: Mode) -> Option<ModeChange> {
        if self.state.mode == to {
            return None;
        }
        let change = ModeChange {
            from: self.state.mode,
            to,
        };
        self.state.mode = to;
        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> MotionTuning {
        MotionTuning {
            speed: 1.0,
            ..MotionTuning::default()
        }
    }

    #[test]
    fn starts_in_auto_play() {
        let ctl = MotionController::new(tuning(), Instant::now());
        assert_eq!(ctl.mode(), Mode::AutoPlay);
        assert_eq!(ctl.velocity(), 0.0);
    }

    #[test]
    fn wheel_adds_scaled_delta_and_switches_to_manual() {
        let now = Instant::now();
        let mut ctl = MotionController::new(tuning(), now);
        let change = ctl.on_input(InputEvent::Wheel { delta_y: 100.0 }, now);
        assert_eq!(
            change,
            Some(ModeChange {
                from: Mode::AutoPlay,
                to: Mode::Manual
            })
        );
        assert!((ctl.velocity() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn arrow_keys_apply_signed_impulse_times_speed() {
        let now = Instant::now();
        let mut ctl = MotionController::new(
            MotionTuning {
                speed: 1.5,
                ..tuning()
            },
            now,
        );
        ctl.on_input(InputEvent::Key(KeyDirection::Forward), now);
        assert!((ctl.velocity() - 3.0).abs() < 1e-6);
        ctl.on_input(InputEvent::Key(KeyDirection::Backward), now);
        ctl.on_input(InputEvent::Key(KeyDirection::Backward), now);
        assert!((ctl.velocity() + 3.0).abs() < 1e-6);
    }

    #[test]
    fn damping_shrinks_velocity_without_reaching_zero() {
        let now = Instant::now();
        let mut ctl = MotionController::new(tuning(), now);
        ctl.on_input(InputEvent::Key(KeyDirection::Backward), now);
        let mut previous = ctl.velocity().abs();
        for _ in 0..200 {
            let v = ctl.on_frame(1.0 / 60.0).abs();
            assert!(v < previous);
            assert!(v > 0.0);
            previous = v;
        }
    }

    #[test]
    fn idle_promotion_respects_timeout() {
        let start = Instant::now();
        let mut ctl = MotionController::new(tuning(), start);
        ctl.on_input(InputEvent::TouchDrag { delta_y: 10.0 }, start);
        assert_eq!(ctl.poll_idle(start + Duration::from_millis(2_999)), None);
        assert_eq!(ctl.poll_idle(start + Duration::from_millis(3_000)), None);
        assert_eq!(
            ctl.poll_idle(start + Duration::from_millis(3_001)),
            Some(ModeChange {
                from: Mode::Manual,
                to: Mode::AutoPlay
            })
        );
        assert_eq!(ctl.poll_idle(start + Duration::from_secs(10)), None);
    }

    #[test]
    fn auto_play_drifts_toward_terminal_velocity() {
        let mut ctl = MotionController::new(tuning(), Instant::now());
        let dt = 1.0 / 60.0;
        for _ in 0..2_000 {
            ctl.on_frame(dt);
        }
        // fixed point of v = (v + a*dt) * d
        let expected = 0.48 * dt * 0.95 / (1.0 - 0.95);
        assert!((ctl.velocity() - expected).abs() < 1e-4);
    }

    #[test]
    fn input_stops_auto_play_drift_on_same_tick() {
        let now = Instant::now();
        let mut ctl = MotionController::new(tuning(), now);
        ctl.on_input(InputEvent::Wheel { delta_y: 0.0 }, now);
        assert_eq!(ctl.on_frame(0.5), 0.0);
    }
}
