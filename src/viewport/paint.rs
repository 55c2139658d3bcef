use crate::{
    render::{DrawPixelInfo, PaintBackend},
    utils::{Rect, floor2},
};

use super::{Viewport, ViewportFlags, ViewportId, system::ViewportSystem};

// Projected width of one paint column.
pub const COLUMN_WIDTH: i32 = 32;

const CLEAR_COLOUR: u8 = 10;
const CLEAR_COLOUR_INVISIBLE_SPRITES: u8 = 0;

// ----------------------------------------------
// Render dispatch
// ----------------------------------------------

impl ViewportSystem {
    // Repaints the part of a viewport under the screen rect `rect`.
    // `dpi` addresses the whole screen framebuffer.
    pub fn render(&self, dpi: &DrawPixelInfo, id: ViewportId, rect: Rect, paint: &mut dyn PaintBackend) {
        let Some(viewport) = self.viewports.get(id) else {
            return;
        };

        let screen = viewport.screen_rect();
        if rect.right <= screen.left || rect.bottom <= screen.top
            || rect.left >= screen.right || rect.top >= screen.bottom {
            return;
        }

        let zoom = viewport.zoom;
        let left   = (rect.left - screen.left).max(0);
        let top    = (rect.top - screen.top).max(0);
        let right  = (rect.right - screen.left).min(viewport.size.width);
        let bottom = (rect.bottom - screen.top).min(viewport.size.height);

        let projected = Rect::new(
            zoom.scale_up(left) + viewport.view_pos.x,
            zoom.scale_up(top) + viewport.view_pos.y,
            zoom.scale_up(right) + viewport.view_pos.x,
            zoom.scale_up(bottom) + viewport.view_pos.y);

        self.paint_viewport(dpi, viewport, projected, paint);
    }

    // Renders every viewport under the screen's dirty blocks and clears them.
    // Returns the rects that were redrawn.
    pub fn render_dirty(&mut self, dpi: &DrawPixelInfo, paint: &mut dyn PaintBackend) -> Vec<Rect> {
        let dirty = self.dirty_blocks.take_dirty_rects();

        let ids: Vec<ViewportId> = self.windows
            .iter()
            .filter_map(|w| w.viewport)
            .collect();

        for rect in &dirty {
            for &id in &ids {
                self.render(dpi, id, *rect, paint);
            }
        }

        dirty
    }

    // Splits the projected rect into pixel aligned 32 wide columns and paints each one.
    fn paint_viewport(&self, dpi: &DrawPixelInfo, viewport: &Viewport, projected: Rect, paint: &mut dyn PaintBackend) {
        let zoom = viewport.zoom;

        let width  = zoom.align(projected.width());
        let height = zoom.align(projected.height());
        let left   = zoom.align(projected.left);
        let top    = zoom.align(projected.top);
        let right  = left + width;

        let x = zoom.scale_down(left - zoom.align(viewport.view_pos.x)) + viewport.pos.x;
        let y = zoom.scale_down(top - zoom.align(viewport.view_pos.y)) + viewport.pos.y;

        let stride = dpi.stride();
        let area = DrawPixelInfo {
            x: left,
            y: top,
            width,
            height,
            bits: dpi.bits + (x - dpi.x) as isize + ((y - dpi.y) * stride) as isize,
            pitch: stride - zoom.scale_down(width),
            zoom,
        };

        let mut column_x = floor2(area.x, COLUMN_WIDTH);
        while column_x < right {
            let mut column = area;

            if column_x >= column.x {
                let left_pitch = column_x - column.x;
                column.width -= left_pitch;
                column.bits += zoom.scale_down(left_pitch) as isize;
                column.pitch += zoom.scale_down(left_pitch);
                column.x = column_x;
            }

            let mut paint_right = column.x + column.width;
            if paint_right >= column_x + COLUMN_WIDTH {
                let right_pitch = paint_right - column_x - COLUMN_WIDTH;
                paint_right -= right_pitch;
                column.pitch += zoom.scale_down(right_pitch);
            }

            column.width = paint_right - column.x;
            self.paint_column(&column, viewport, paint);

            column_x += COLUMN_WIDTH;
        }
    }

    fn paint_column(&self, column: &DrawPixelInfo, viewport: &Viewport, paint: &mut dyn PaintBackend) {
        let flags = viewport.flags;

        if flags.intersects(ViewportFlags::CLEARS_COLUMN) {
            let colour = if flags.contains(ViewportFlags::InvisibleSprites) {
                CLEAR_COLOUR_INVISIBLE_SPRITES
            } else {
                CLEAR_COLOUR
            };
            paint.clear(column, colour);
        }

        paint.paint_column(column, flags, viewport.rotation);

        if self.configs.render_weather_gloom
            && !flags.intersects(ViewportFlags::InvisibleSprites | ViewportFlags::HighlightPathIssues) {
            paint.apply_weather_gloom(column);
        }
    }
}
