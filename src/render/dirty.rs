use bitvec::vec::BitVec;

use crate::utils::{Rect, Size};

// ----------------------------------------------
// DirtyBlockGrid
// ----------------------------------------------

// Screen invalidation at block granularity. Marking a rect sets every block it
// touches. Taking the dirty rects merges runs of blocks into larger rectangles
// and clears them.
pub struct DirtyBlockGrid {
    screen: Size,
    columns: i32,
    rows: i32,
    blocks: BitVec,
}

impl DirtyBlockGrid {
    pub const BLOCK_WIDTH: i32 = 64;
    pub const BLOCK_HEIGHT: i32 = 8;

    pub fn new(screen: Size) -> Self {
        let mut grid = Self {
            screen: Size::zero(),
            columns: 0,
            rows: 0,
            blocks: BitVec::new(),
        };
        grid.resize(screen);
        grid
    }

    // Resizing marks the whole screen dirty.
    pub fn resize(&mut self, screen: Size) {
        self.screen = Size::new(screen.width.max(0), screen.height.max(0));
        self.columns = (self.screen.width + Self::BLOCK_WIDTH - 1) / Self::BLOCK_WIDTH;
        self.rows = (self.screen.height + Self::BLOCK_HEIGHT - 1) / Self::BLOCK_HEIGHT;
        self.blocks = BitVec::repeat(true, (self.columns * self.rows) as usize);
    }

    #[inline]
    pub fn screen_size(&self) -> Size {
        self.screen
    }

    #[inline]
    pub fn columns(&self) -> i32 {
        self.columns
    }

    #[inline]
    pub fn rows(&self) -> i32 {
        self.rows
    }

    #[inline]
    fn block_index(&self, column: i32, row: i32) -> usize {
        (row * self.columns + column) as usize
    }

    pub fn mark_dirty(&mut self, rect: Rect) {
        let clamped = Rect::new(
            rect.left.max(0),
            rect.top.max(0),
            rect.right.min(self.screen.width),
            rect.bottom.min(self.screen.height));

        if clamped.left >= clamped.right || clamped.top >= clamped.bottom {
            return;
        }

        // Inclusive block range.
        let first_column = clamped.left / Self::BLOCK_WIDTH;
        let last_column = (clamped.right - 1) / Self::BLOCK_WIDTH;
        let first_row = clamped.top / Self::BLOCK_HEIGHT;
        let last_row = (clamped.bottom - 1) / Self::BLOCK_HEIGHT;

        for row in first_row..=last_row {
            let start = self.block_index(first_column, row);
            let end = self.block_index(last_column, row) + 1;
            self.blocks[start..end].fill(true);
        }
    }

    #[inline]
    pub fn is_dirty(&self, column: i32, row: i32) -> bool {
        if column < 0 || row < 0 || column >= self.columns || row >= self.rows {
            return false;
        }
        self.blocks[self.block_index(column, row)]
    }

    #[inline]
    pub fn has_dirty_blocks(&self) -> bool {
        self.blocks.any()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.blocks.fill(false);
    }

    // Drains the grid into screen-space rects, scanning rows top to bottom.
    pub fn take_dirty_rects(&mut self) -> Vec<Rect> {
        let mut rects = Vec::new();

        for row in 0..self.rows {
            let mut column = 0;
            while column < self.columns {
                if !self.is_dirty(column, row) {
                    column += 1;
                    continue;
                }

                let run_start = column;
                while column < self.columns && self.is_dirty(column, row) {
                    column += 1;
                }
                let run_end = column;

                // Grow downwards while the whole run stays dirty.
                let mut row_end = row + 1;
                while row_end < self.rows && (run_start..run_end).all(|c| self.is_dirty(c, row_end)) {
                    row_end += 1;
                }

                for r in row..row_end {
                    let start = self.block_index(run_start, r);
                    let end = self.block_index(run_end - 1, r) + 1;
                    self.blocks[start..end].fill(false);
                }

                rects.push(Rect::new(
                    run_start * Self::BLOCK_WIDTH,
                    row * Self::BLOCK_HEIGHT,
                    (run_end * Self::BLOCK_WIDTH).min(self.screen.width),
                    (row_end * Self::BLOCK_HEIGHT).min(self.screen.height)));
            }
        }

        rects
    }
}
