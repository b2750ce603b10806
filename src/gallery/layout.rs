//! Fixed lateral scatter for pool slots and aspect-preserving plane sizes.
//!
//! Offsets depend only on the slot index, so a slot keeps the same lane
//! on every lap regardless of which image it currently shows.

use std::f32::consts::{PI, TAU};

const HORIZONTAL_ANGLE_STEP: f32 = 2.618;
const VERTICAL_ANGLE_STEP: f32 = 1.618;
const VERTICAL_ANGLE_PHASE: f32 = PI / 3.0;
const HORIZONTAL_RADIUS_STEP: f32 = 1.2;
const VERTICAL_RADIUS_STEP: f32 = 0.8;

/// Lateral (x, y) position of a slot's lane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Lane {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneSpread {
    pub max_horizontal: f32,
    pub max_vertical: f32,
}

impl Default for LaneSpread {
    fn default() -> Self {
        Self {
            max_horizontal: 8.0,
            max_vertical: 8.0,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn lane_for(slot_index: usize, spread: LaneSpread) -> Lane {
    let i = slot_index as f32;
    let horizontal_angle = (i * HORIZONTAL_ANGLE_STEP) % TAU;
    let vertical_angle = (i * VERTICAL_ANGLE_STEP + VERTICAL_ANGLE_PHASE) % TAU;

    let horizontal_radius = (slot_index % 3) as f32 * HORIZONTAL_RADIUS_STEP;
    let vertical_radius = ((slot_index + 1) % 4) as f32 * VERTICAL_RADIUS_STEP;

    Lane {
        x: horizontal_angle.sin() * horizontal_radius * spread.max_horizontal / 3.0,
        y: vertical_angle.cos() * vertical_radius * spread.max_vertical / 4.0,
    }
}

pub fn lanes(visible_count: usize, spread: LaneSpread) -> Vec<Lane> {
    (0..visible_count)
        .map(|slot_index| lane_for(slot_index, spread))
        .collect()
}

/// World-space width and height of a plane showing a `width` x `height` image.
///
/// The short edge is always `base`; the long edge grows with the aspect ratio.
#[allow(clippy::cast_precision_loss)]
pub fn plane_scale(width: u32, height: u32, base: f32) -> [f32; 2] {
    let aspect = if width > 0 && height > 0 {
        width as f32 / height as f32
    } else {
        1.0
    };
    if aspect > 1.0 {
        [base * aspect, base]
    } else {
        [base, base / aspect]
    }
}

/// World-space size of a `width` x `height` image fitted inside a square of
/// edge `extent`, aspect kept.
#[allow(clippy::cast_precision_loss)]
pub fn contain_scale(width: u32, height: u32, extent: f32) -> [f32; 2] {
    let aspect = if width > 0 && height > 0 {
        width as f32 / height as f32
    } else {
        1.0
    };
    if aspect > 1.0 {
        [extent, extent / aspect]
    } else {
        [extent * aspect, extent]
    }
}
