//! Translation from winit events to gallery input.

use std::collections::HashMap;

use winit::event::{MouseScrollDelta, Touch, TouchPhase};
use winit::keyboard::{Key, NamedKey};

use crate::events::{InputEvent, KeyDirection};

/// Pixels per wheel "line", matching what browsers report for line-mode wheels.
pub const PIXELS_PER_LINE: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Scroll(KeyDirection),
    /// Switch between the 3D gallery and the flat grid.
    ToggleGrid,
    Close,
}

/// Wheel delta in pixels, positive when scrolling down/forward.
#[allow(clippy::cast_possible_truncation)]
pub fn wheel_delta(delta: MouseScrollDelta) -> f32 {
    // winit reports positive y for scrolling up
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y * PIXELS_PER_LINE,
        MouseScrollDelta::PixelDelta(pos) => -(pos.y as f32),
    }
}

pub fn key_action(key: &Key) -> Option<KeyAction> {
    match key {
        Key::Named(NamedKey::ArrowUp | NamedKey::ArrowLeft) => {
            Some(KeyAction::Scroll(KeyDirection::Backward))
        }
        Key::Named(NamedKey::ArrowDown | NamedKey::ArrowRight) => {
            Some(KeyAction::Scroll(KeyDirection::Forward))
        }
        Key::Named(NamedKey::Escape) => Some(KeyAction::Close),
        Key::Character(c) if c.eq_ignore_ascii_case("q") => Some(KeyAction::Close),
        Key::Character(c) if c.eq_ignore_ascii_case("g") => Some(KeyAction::ToggleGrid),
        _ => None,
    }
}

/// Tracks active touches and turns vertical movement into drag deltas.
#[derive(Debug, Default)]
pub struct TouchTracker {
    last_y: HashMap<u64, f64>,
}

impl TouchTracker {
    pub fn on_touch(&mut self, touch: &Touch) -> Option<InputEvent> {
        self.track(touch.id, touch.phase, touch.location.y)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn track(&mut self, id: u64, phase: TouchPhase, y: f64) -> Option<InputEvent> {
        match phase {
            TouchPhase::Started => {
                self.last_y.insert(id, y);
                None
            }
            TouchPhase::Moved => {
                let previous = self.last_y.insert(id, y)?;
                // dragging upward advances, like swiping a page
                let delta_y = (previous - y) as f32;
                (delta_y != 0.0).then_some(InputEvent::TouchDrag { delta_y })
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.last_y.remove(&id);
                None
            }
        }
    }
}
