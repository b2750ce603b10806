//! Fixed-size depth pool of image slots.
//!
//! The pool always holds `visible_count` slots no matter how many images the
//! catalog has. Slots travel along a looping z axis of length `depth_range`;
//! whenever one crosses either end it teleports to the other end and steps its
//! catalog index by [`DepthPool::image_advance`] per wrap.

use super::layout::Lane;

#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub slot_index: usize,
    /// Always within `[0, depth_range)`.
    pub depth: f32,
    /// Always within `[0, catalog_len)`.
    pub catalog_index: usize,
    pub lateral_x: f32,
    pub lateral_y: f32,
}

/// Wrap counts produced by a single advance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WrapCount {
    pub forward: u64,
    pub backward: u64,
}

#[derive(Debug, Clone)]
pub struct DepthPool {
    slots: Vec<Slot>,
    depth_range: f32,
    catalog_len: usize,
}

impl DepthPool {
    /// Builds the pool. An empty catalog yields an empty pool.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(visible_count: usize, catalog_len: usize, depth_range: f32, lanes: &[Lane]) -> Self {
        let slots = if catalog_len == 0 || visible_count == 0 {
            Vec::new()
        } else {
            let spacing = depth_range / visible_count as f32;
            (0..visible_count)
                .map(|i| {
                    let lane = lanes.get(i).copied().unwrap_or_default();
                    Slot {
                        slot_index: i,
                        depth: normalize_depth(spacing * i as f32, depth_range),
                        catalog_index: i % catalog_len,
                        lateral_x: lane.x,
                        lateral_y: lane.y,
                    }
                })
                .collect()
        };
        Self {
            slots,
            depth_range,
            catalog_len,
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn depth_range(&self) -> f32 {
        self.depth_range
    }

    pub fn catalog_len(&self) -> usize {
        self.catalog_len
    }

    /// Catalog stride applied per wrap: `visible_count mod catalog_len`, or a
    /// full lap (`catalog_len`) when that is zero.
    pub fn image_advance(&self) -> usize {
        image_advance(self.slots.len(), self.catalog_len)
    }

    /// Moves every slot by `velocity * dt * depth_scale` and applies wraps.
    pub fn advance(&mut self, velocity: f32, dt: f32, depth_scale: f32) -> WrapCount {
        let mut total = WrapCount::default();
        let shift = velocity * dt * depth_scale;
        if !shift.is_finite() || shift == 0.0 || self.slots.is_empty() {
            return total;
        }

        let advance = self.image_advance();
        let range = self.depth_range;
        let len = self.catalog_len;

        for slot in &mut self.slots {
            let raw = slot.depth + shift;
            if raw >= range {
                let wraps = wrap_count(raw / range);
                slot.catalog_index = step_forward(slot.catalog_index, wraps, advance, len);
                total.forward += wraps;
            } else if raw < 0.0 {
                let wraps = wrap_count((-raw / range).ceil());
                slot.catalog_index = step_backward(slot.catalog_index, wraps, advance, len);
                total.backward += wraps;
            }
            slot.depth = normalize_depth(raw, range);
        }
        total
    }
}

pub fn image_advance(visible_count: usize, catalog_len: usize) -> usize {
    if catalog_len == 0 {
        return 0;
    }
    match visible_count % catalog_len {
        0 => catalog_len,
        stride => stride,
    }
}

/// Folds any finite depth into `[0, range)`.
pub fn normalize_depth(depth: f32, range: f32) -> f32 {
    let wrapped = depth.rem_euclid(range);
    // rem_euclid can round up to `range` for tiny negative inputs
    if wrapped >= range { 0.0 } else { wrapped }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn wrap_count(laps: f32) -> u64 {
    laps.floor().max(0.0) as u64
}

#[allow(clippy::cast_possible_truncation)]
fn step_forward(index: usize, wraps: u64, advance: usize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let len64 = len as u64;
    let step = (wraps % len64) * (advance as u64 % len64) % len64;
    ((index as u64 + step) % len64) as usize
}

#[allow(clippy::cast_possible_truncation)]
fn step_backward(index: usize, wraps: u64, advance: usize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let len64 = len as u64;
    let step = (wraps % len64) * (advance as u64 % len64) % len64;
    ((index as u64 + len64 - step) % len64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::layout::{LaneSpread, lanes};

    fn pool(visible: usize, catalog: usize, range: f32) -> DepthPool {
        DepthPool::new(visible, catalog, range, &lanes(visible, LaneSpread::default()))
    }

    #[test]
    fn initial_slots_are_evenly_spaced() {
        let pool = pool(12, 5, 50.0);
        assert_eq!(pool.slots().len(), 12);
        for (i, slot) in pool.slots().iter().enumerate() {
            assert!((slot.depth - 50.0 / 12.0 * i as f32).abs() < 1e-4);
            assert_eq!(slot.catalog_index, i % 5);
            assert_eq!(slot.slot_index, i);
        }
    }

    #[test]
    fn empty_catalog_has_no_slots() {
        let mut pool = pool(12, 0, 50.0);
        assert!(pool.is_empty());
        assert_eq!(pool.advance(5.0, 1.0, 10.0), WrapCount::default());
    }

    #[test]
    fn image_advance_uses_full_lap_when_divisible() {
        assert_eq!(image_advance(12, 5), 2);
        assert_eq!(image_advance(12, 4), 4);
        assert_eq!(image_advance(12, 12), 12);
        assert_eq!(image_advance(3, 7), 3);
        assert_eq!(image_advance(3, 0), 0);
    }

    #[test]
    fn single_forward_wrap_advances_catalog_index() {
        let mut pool = pool(12, 5, 50.0);
        let wraps = pool.advance(5.0, 1.0, 10.0);
        let slot = &pool.slots()[0];
        assert_eq!(slot.depth, 0.0);
        assert_eq!(slot.catalog_index, 2);
        assert_eq!(wraps.forward, 12);
    }

    #[test]
    fn backward_wrap_steps_index_down_with_positive_modulo() {
        let mut pool = pool(12, 5, 50.0);
        // slot 0 starts at depth 0 with index 0; any negative move wraps it once
        pool.advance(-0.1, 1.0, 10.0);
        let slot = &pool.slots()[0];
        assert!((slot.depth - 49.0).abs() < 1e-4);
        assert_eq!(slot.catalog_index, 3);
    }

    #[test]
    fn multiple_wraps_in_one_step() {
        let mut pool = pool(12, 5, 50.0);
        // 0 + 12.5 * 1 * 10 = 125 -> two laps, 25 remaining
        pool.advance(12.5, 1.0, 10.0);
        let slot = &pool.slots()[0];
        assert!((slot.depth - 25.0).abs() < 1e-4);
        assert_eq!(slot.catalog_index, (2 * 2) % 5);
    }

    #[test]
    fn non_finite_velocity_is_ignored() {
        let mut pool = pool(4, 3, 50.0);
        let before = pool.slots().to_vec();
        pool.advance(f32::NAN, 0.016, 10.0);
        pool.advance(f32::INFINITY, 0.016, 10.0);
        assert_eq!(pool.slots(), &before[..]);
    }

    #[test]
    fn normalize_handles_tiny_negative_values() {
        let d = normalize_depth(-1e-9, 50.0);
        assert!((0.0..50.0).contains(&d));
    }
}
