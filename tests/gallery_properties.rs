use std::time::{Duration, Instant};

use infinite_gallery::config::GalleryOptions;
use infinite_gallery::events::{InputEvent, KeyDirection};
use infinite_gallery::gallery::GalleryState;
use infinite_gallery::gallery::layout::{LaneSpread, lane_for, lanes};
use infinite_gallery::gallery::motion::Mode;
use infinite_gallery::gallery::pool::{DepthPool, image_advance};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn pool(visible: usize, catalog: usize) -> DepthPool {
    DepthPool::new(visible, catalog, 50.0, &lanes(visible, LaneSpread::default()))
}

#[test]
fn random_motion_keeps_slots_in_range() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for catalog in [1_usize, 2, 5, 12, 13, 40] {
        let mut pool = pool(12, catalog);
        for _ in 0..2_000 {
            let velocity = rng.random_range(-30.0_f32..30.0);
            let dt = rng.random_range(0.0_f32..0.1);
            pool.advance(velocity, dt, 10.0);
            for slot in pool.slots() {
                assert!(slot.depth >= 0.0 && slot.depth < 50.0, "depth {}", slot.depth);
                assert!(slot.catalog_index < catalog);
            }
        }
        assert_eq!(pool.slots().len(), 12);
    }
}

#[test]
fn forward_then_backward_wraps_restore_indices() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut pool = pool(12, 5);
    let start: Vec<usize> = pool.slots().iter().map(|s| s.catalog_index).collect();
    let start_depths: Vec<f32> = pool.slots().iter().map(|s| s.depth).collect();

    // exact multiples of the range so depths return to where they began
    let laps: Vec<i32> = (0..50).map(|_| rng.random_range(1..4)).collect();
    for &n in &laps {
        pool.advance(5.0 * n as f32, 1.0, 10.0);
    }
    for &n in laps.iter().rev() {
        pool.advance(-5.0 * n as f32, 1.0, 10.0);
    }

    let end: Vec<usize> = pool.slots().iter().map(|s| s.catalog_index).collect();
    assert_eq!(start, end);
    for (a, b) in start_depths.iter().zip(pool.slots().iter().map(|s| s.depth)) {
        assert!((a - b).abs() < 1e-3);
    }
}

#[test]
fn lanes_are_stable_across_wraps() {
    let mut pool = pool(12, 7);
    let spread = LaneSpread::default();
    for _ in 0..100 {
        pool.advance(3.3, 0.7, 10.0);
        for slot in pool.slots() {
            let lane = lane_for(slot.slot_index, spread);
            assert_eq!((slot.lateral_x, slot.lateral_y), (lane.x, lane.y));
        }
    }
}

#[test]
fn one_wrap_advances_every_slot_by_the_stride() {
    // 12 visible over 5 images: stride 2, so wrapped slots never show the
    // image a neighbour just left
    assert_eq!(image_advance(12, 5), 2);
    let mut pool = pool(12, 5);
    let before: Vec<usize> = pool.slots().iter().map(|s| s.catalog_index).collect();
    pool.advance(5.0, 1.0, 10.0);
    for (slot, prev) in pool.slots().iter().zip(before) {
        assert_eq!(slot.catalog_index, (prev + 2) % 5);
    }
}

#[test]
fn idle_gallery_returns_to_auto_play_and_drifts_forward() {
    let start = Instant::now();
    let opts = GalleryOptions {
        intro_fade: Duration::ZERO,
        ..GalleryOptions::default()
    };
    let mut gallery = GalleryState::new(&opts, 9, start);
    gallery.begin_intro(start);

    let frame = Duration::from_millis(16);
    let mut now = start;
    gallery.step(&[InputEvent::Key(KeyDirection::Backward)], now, frame);
    assert_eq!(gallery.mode(), Mode::Manual);

    // ~4 seconds without input
    for _ in 0..250 {
        now += frame;
        gallery.step(&[], now, frame);
    }
    assert_eq!(gallery.mode(), Mode::AutoPlay);
    assert!(gallery.frame().velocity > 0.0);
}

#[test]
fn zero_catalog_gallery_never_draws() {
    let now = Instant::now();
    let mut gallery = GalleryState::new(&GalleryOptions::default(), 0, now);
    for i in 0..10 {
        let snapshot = gallery.step(
            &[InputEvent::Wheel { delta_y: 120.0 }],
            now + Duration::from_millis(16 * i),
            Duration::from_millis(16),
        );
        assert!(snapshot.slots.is_empty());
    }
}
