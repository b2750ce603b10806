//! Scroll gallery simulation.
//!
//! [`GalleryState::step`] is the single per-frame entry point: it folds the
//! frame's input events into the motion controller, runs the idle check,
//! integrates velocity, advances the depth pool and maps every slot to its
//! world position and appearance. Nothing here touches the GPU.

pub mod appearance;
pub mod fallback;
pub mod grid;
pub mod layout;
pub mod motion;
pub mod pool;
pub mod textures;

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::GalleryOptions;
use crate::events::InputEvent;

use appearance::{AppearanceCurve, IntroFade};
use layout::{LaneSpread, lanes};
use motion::{Mode, MotionController, MotionTuning};
use pool::DepthPool;

/// Render-ready view of one slot for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotFrame {
    pub slot_index: usize,
    pub catalog_index: usize,
    /// World position; z is centred on the camera (`depth - depth_range / 2`).
    pub position: [f32; 3],
    pub opacity: f32,
    pub blur: f32,
}

#[derive(Debug, Clone, Default)]
pub struct FrameSnapshot {
    pub slots: Vec<SlotFrame>,
    pub velocity: f32,
    /// Seconds since the gallery was mounted.
    pub time: f32,
    pub global_opacity: f32,
}

#[derive(Debug)]
pub struct GalleryState {
    pool: DepthPool,
    motion: MotionController,
    curve: AppearanceCurve,
    intro: IntroFade,
    depth_scale: f32,
    idle_check_interval: Duration,
    last_idle_check: Instant,
    mounted_at: Instant,
    frame: FrameSnapshot,
}

impl GalleryState {
    pub fn new(opts: &GalleryOptions, catalog_len: usize, now: Instant) -> Self {
        let spread = LaneSpread {
            max_horizontal: opts.max_horizontal_offset,
            max_vertical: opts.max_vertical_offset,
        };
        let pool = DepthPool::new(
            opts.visible_count,
            catalog_len,
            opts.depth_range,
            &lanes(opts.visible_count, spread),
        );
        debug!(
            slots = pool.slots().len(),
            catalog_len,
            image_advance = pool.image_advance(),
            "gallery state mounted"
        );
        Self {
            frame: FrameSnapshot {
                slots: Vec::with_capacity(pool.slots().len()),
                ..FrameSnapshot::default()
            },
            pool,
            motion: MotionController::new(MotionTuning::from(opts), now),
            curve: AppearanceCurve::new(opts.fade, opts.blur),
            intro: IntroFade::new(opts.intro_fade),
            depth_scale: opts.depth_scale,
            idle_check_interval: opts.idle_check_interval,
            last_idle_check: now,
            mounted_at: now,
        }
    }

    pub fn mode(&self) -> Mode {
        self.motion.mode()
    }

    /// Starts the global opacity ramp; later calls are no-ops.
    pub fn begin_intro(&mut self, now: Instant) {
        self.intro.start(now);
    }

    /// Applies a single input event outside of a frame step.
    pub fn handle_input(&mut self, event: InputEvent, now: Instant) {
        if let Some(change) = self.motion.on_input(event, now) {
            debug!(from = ?change.from, to = ?change.to, "scroll mode changed");
        }
    }

    /// Advances the simulation by `dt` and returns the frame to draw.
    pub fn step(&mut self, events: &[InputEvent], now: Instant, dt: Duration) -> &FrameSnapshot {
        for event in events {
            self.handle_input(*event, now);
        }

        if now.saturating_duration_since(self.last_idle_check) >= self.idle_check_interval {
            self.last_idle_check = now;
            if let Some(change) = self.motion.poll_idle(now) {
                debug!(from = ?change.from, to = ?change.to, "scroll mode changed");
            }
        }

        let dt = dt.as_secs_f32();
        let velocity = self.motion.on_frame(dt);
        self.pool.advance(velocity, dt, self.depth_scale);

        let global_opacity = self.intro.opacity(now);
        let range = self.pool.depth_range();
        let curve = self.curve;

        self.frame.slots.clear();
        self.frame.slots.extend(self.pool.slots().iter().map(|slot| {
            let look = curve.at(slot.depth / range, global_opacity);
            SlotFrame {
                slot_index: slot.slot_index,
                catalog_index: slot.catalog_index,
                position: [slot.lateral_x, slot.lateral_y, slot.depth - range / 2.0],
                opacity: look.opacity,
                blur: look.blur,
            }
        }));
        self.frame.velocity = velocity;
        self.frame.time = now.saturating_duration_since(self.mounted_at).as_secs_f32();
        self.frame.global_opacity = global_opacity;
        &self.frame
    }

    pub fn frame(&self) -> &FrameSnapshot {
        &self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::KeyDirection;

    fn opts() -> GalleryOptions {
        GalleryOptions {
            visible_count: 12,
            depth_range: 50.0,
            speed: 1.0,
            intro_fade: Duration::ZERO,
            ..GalleryOptions::default()
        }
    }

    #[test]
    fn empty_catalog_produces_empty_frames() {
        let now = Instant::now();
        let mut state = GalleryState::new(&opts(), 0, now);
        let frame = state.step(
            &[InputEvent::Key(KeyDirection::Forward)],
            now,
            Duration::from_millis(16),
        );
        assert!(frame.slots.is_empty());
    }

    #[test]
    fn positions_are_centred_on_camera() {
        let now = Instant::now();
        let mut state = GalleryState::new(&opts(), 5, now);
        state.begin_intro(now);
        let frame = state.step(&[], now, Duration::ZERO);
        assert_eq!(frame.slots.len(), 12);
        assert!((frame.slots[0].position[2] + 25.0).abs() < 1e-4);
        for slot in &frame.slots {
            assert!(slot.position[2] >= -25.0 && slot.position[2] < 25.0);
            assert!((0.0..=1.0).contains(&slot.opacity));
        }
    }

    #[test]
    fn input_in_a_step_cancels_auto_play_before_integration() {
        let now = Instant::now();
        let mut state = GalleryState::new(&opts(), 5, now);
        assert_eq!(state.mode(), Mode::AutoPlay);
        let frame = state.step(
            &[InputEvent::Key(KeyDirection::Forward)],
            now,
            Duration::from_secs(1),
        );
        // 2.0 impulse, no drift, one damping pass
        assert!((frame.velocity - 1.9).abs() < 1e-5);
        assert_eq!(state.mode(), Mode::Manual);
    }

    #[test]
    fn idle_check_runs_on_its_interval() {
        let start = Instant::now();
        let mut state = GalleryState::new(&opts(), 5, start);
        state.step(&[InputEvent::Wheel { delta_y: 10.0 }], start, Duration::ZERO);
        state.step(&[], start + Duration::from_millis(2_500), Duration::ZERO);
        assert_eq!(state.mode(), Mode::Manual);
        state.step(&[], start + Duration::from_millis(3_500), Duration::ZERO);
        assert_eq!(state.mode(), Mode::AutoPlay);
    }

    #[test]
    fn hidden_until_intro_starts() {
        let now = Instant::now();
        let mut state = GalleryState::new(
            &GalleryOptions {
                intro_fade: Duration::from_secs(4),
                ..opts()
            },
            5,
            now,
        );
        let frame = state.step(&[], now, Duration::ZERO);
        assert!(frame.slots.iter().all(|s| s.opacity == 0.0));
        assert_eq!(frame.global_opacity, 0.0);
    }
}
