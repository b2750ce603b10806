//! Flat grid over the whole catalog, the non-3D way to browse it.
//!
//! Cells are square, laid out left to right in rows on a plane facing the
//! camera, and the grid scrolls vertically. Scroll is kept in world units and
//! clamped so the last row never leaves the bottom of the viewport.

use std::ops::Range;

use crate::events::{InputEvent, KeyDirection};

use super::SlotFrame;

/// Distance from the camera to the grid plane.
pub const GRID_DISTANCE: f32 = 10.0;
/// Share of each cell's pitch left empty around the image.
pub const CELL_GAP: f32 = 0.08;

/// Column count for a window width, stepping like the web layout's breakpoints.
pub fn columns_for_width(width_px: u32) -> usize {
    if width_px < 768 {
        2
    } else if width_px < 1024 {
        3
    } else if width_px < 1280 {
        4
    } else {
        5
    }
}

/// World-space size of the visible area on the grid plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridViewport {
    pub width: f32,
    pub height: f32,
}

impl GridViewport {
    pub fn at_distance(fov_y_deg: f32, aspect: f32, distance: f32) -> Self {
        let height = 2.0 * distance * (fov_y_deg.to_radians() * 0.5).tan();
        Self {
            width: height * aspect,
            height,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GridView {
    len: usize,
    columns: usize,
    viewport: GridViewport,
    scroll: f32,
}

impl GridView {
    pub fn new(len: usize, columns: usize, viewport: GridViewport) -> Self {
        Self {
            len,
            columns: columns.max(1),
            viewport,
            scroll: 0.0,
        }
    }

    /// Applies a new column count or viewport and re-clamps the scroll.
    pub fn relayout(&mut self, columns: usize, viewport: GridViewport) {
        self.columns = columns.max(1);
        self.viewport = viewport;
        self.scroll = self.scroll.clamp(0.0, self.max_scroll());
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn pitch(&self) -> f32 {
        self.viewport.width / self.columns as f32
    }

    /// Edge length available to an image inside its cell.
    pub fn cell_extent(&self) -> f32 {
        self.pitch() * (1.0 - CELL_GAP)
    }

    pub fn rows(&self) -> usize {
        self.len.div_ceil(self.columns)
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn max_scroll(&self) -> f32 {
        (self.rows() as f32 * self.pitch() - self.viewport.height).max(0.0)
    }

    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    pub fn scroll_by(&mut self, delta: f32) {
        self.scroll = (self.scroll + delta).clamp(0.0, self.max_scroll());
    }

    /// Scrolls for one input event. Pixel deltas are converted with
    /// `world_per_pixel` so content follows the pointer; keys move one row.
    pub fn handle_input(&mut self, event: InputEvent, world_per_pixel: f32) {
        match event {
            InputEvent::Wheel { delta_y } | InputEvent::TouchDrag { delta_y } => {
                self.scroll_by(delta_y * world_per_pixel);
            }
            InputEvent::Key(KeyDirection::Forward) => self.scroll_by(self.pitch()),
            InputEvent::Key(KeyDirection::Backward) => self.scroll_by(-self.pitch()),
        }
    }

    /// World units covered by one window pixel on the grid plane.
    #[allow(clippy::cast_precision_loss)]
    pub fn world_per_pixel(&self, window_height_px: u32) -> f32 {
        self.viewport.height / window_height_px.max(1) as f32
    }

    /// Centre of cell `index` on the grid plane at the current scroll.
    #[allow(clippy::cast_precision_loss)]
    pub fn cell_center(&self, index: usize) -> [f32; 2] {
        let pitch = self.pitch();
        let col = (index % self.columns) as f32;
        let row = (index / self.columns) as f32;
        [
            -self.viewport.width * 0.5 + pitch * (col + 0.5),
            self.viewport.height * 0.5 - pitch * (row + 0.5) + self.scroll,
        ]
    }

    /// Catalog indices whose row overlaps the viewport.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn visible(&self) -> Range<usize> {
        let pitch = self.pitch();
        if self.len == 0 || pitch <= 0.0 {
            return 0..0;
        }
        let first_row = (self.scroll / pitch).floor() as usize;
        let last_row = ((self.scroll + self.viewport.height) / pitch).ceil() as usize;
        let start = (first_row * self.columns).min(self.len);
        let end = (last_row * self.columns).min(self.len);
        start..end
    }

    /// Writes one fully opaque, unblurred frame per visible cell. Slot indices
    /// count up from zero so they can address a material pool directly.
    pub fn fill(&self, out: &mut Vec<SlotFrame>) {
        out.clear();
        out.extend(self.visible().enumerate().map(|(slot_index, catalog_index)| {
            let [x, y] = self.cell_center(catalog_index);
            SlotFrame {
                slot_index,
                catalog_index,
                position: [x, y, -GRID_DISTANCE],
                opacity: 1.0,
                blur: 0.0,
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    // 4 wide, 2 tall: with 2 columns the pitch is 2.0 and one row fits per
    // viewport height
    fn view(len: usize) -> GridView {
        GridView::new(
            len,
            2,
            GridViewport {
                width: 4.0,
                height: 2.0,
            },
        )
    }

    #[test]
    fn breakpoints_pick_column_counts() {
        assert_eq!(columns_for_width(600), 2);
        assert_eq!(columns_for_width(768), 3);
        assert_eq!(columns_for_width(1100), 4);
        assert_eq!(columns_for_width(1920), 5);
    }

    #[test]
    fn viewport_matches_camera_frustum() {
        let vp = GridViewport::at_distance(90.0, 2.0, 1.0);
        assert!(close(vp.height, 2.0));
        assert!(close(vp.width, 4.0));
    }

    #[test]
    fn cells_fill_rows_left_to_right() {
        let grid = view(5);
        assert_eq!(grid.rows(), 3);
        assert!(close(grid.pitch(), 2.0));
        assert!(close(grid.cell_extent(), 2.0 * (1.0 - CELL_GAP)));

        let [x0, y0] = grid.cell_center(0);
        let [x1, y1] = grid.cell_center(1);
        let [x2, y2] = grid.cell_center(2);
        assert!(close(x0, -1.0) && close(y0, 0.0));
        assert!(close(x1, 1.0) && close(y1, 0.0));
        assert!(close(x2, -1.0) && close(y2, -2.0));
    }

    #[test]
    fn scroll_is_clamped_to_content() {
        let mut grid = view(5);
        // three rows of 2.0 in a 2.0 tall viewport
        assert!(close(grid.max_scroll(), 4.0));

        grid.scroll_by(-3.0);
        assert!(close(grid.scroll(), 0.0));
        grid.scroll_by(100.0);
        assert!(close(grid.scroll(), 4.0));

        // the last row is centred once fully scrolled
        let [_, y4] = grid.cell_center(4);
        assert!(close(y4, 0.0));
    }

    #[test]
    fn short_catalogs_do_not_scroll() {
        let mut grid = view(2);
        grid.scroll_by(10.0);
        assert!(close(grid.scroll(), 0.0));
    }

    #[test]
    fn input_scrolls_by_pixels_and_rows() {
        let mut grid = view(9);
        let wpp = grid.world_per_pixel(200);
        assert!(close(wpp, 0.01));

        grid.handle_input(InputEvent::Wheel { delta_y: 50.0 }, wpp);
        assert!(close(grid.scroll(), 0.5));
        grid.handle_input(InputEvent::Key(KeyDirection::Forward), wpp);
        assert!(close(grid.scroll(), 2.5));
        grid.handle_input(InputEvent::TouchDrag { delta_y: -100.0 }, wpp);
        assert!(close(grid.scroll(), 1.5));
        grid.handle_input(InputEvent::Key(KeyDirection::Backward), wpp);
        assert!(close(grid.scroll(), 0.0));
    }

    #[test]
    fn visible_range_follows_scroll() {
        let mut grid = view(9);
        assert_eq!(grid.visible(), 0..2);
        grid.scroll_by(1.0);
        assert_eq!(grid.visible(), 0..4);
        grid.scroll_by(100.0);
        // max scroll 8.0: only row 4, which holds the single last image
        assert_eq!(grid.visible(), 8..9);
    }

    #[test]
    fn fill_numbers_slots_from_zero() {
        let mut grid = view(9);
        grid.scroll_by(2.0);
        let mut frames = Vec::new();
        grid.fill(&mut frames);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].slot_index, 0);
        assert_eq!(frames[0].catalog_index, 2);
        assert_eq!(frames[1].catalog_index, 3);
        assert!(frames.iter().all(|f| f.opacity == 1.0 && f.blur == 0.0));
        assert!(close(frames[0].position[2], -GRID_DISTANCE));
    }

    #[test]
    fn relayout_reclamps_scroll() {
        let mut grid = view(9);
        grid.scroll_by(100.0);
        grid.relayout(
            3,
            GridViewport {
                width: 6.0,
                height: 2.0,
            },
        );
        // 3 rows of 2.0 now
        assert_eq!(grid.columns(), 3);
        assert!(close(grid.max_scroll(), 4.0));
        assert!(close(grid.scroll(), 4.0));
    }

    #[test]
    fn empty_grid_shows_nothing() {
        let grid = view(0);
        assert_eq!(grid.visible(), 0..0);
        assert!(close(grid.max_scroll(), 0.0));
    }
}
