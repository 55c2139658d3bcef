use crate::{
    map::TileElement,
    utils::{
        Rect,
        coords::{COORDS_XY_STEP, CoordsXY, CoordsXYZ, world_to_screen},
    },
    window::{Visibility, WindowNumber},
};

use super::{ViewportId, system::ViewportSystem};

// ----------------------------------------------
// Dirty region invalidation
// ----------------------------------------------

impl ViewportSystem {
    // Marks the screen pixels showing the projected rect `rect` of a viewport
    // dirty. Viewports fully covered by another window are skipped.
    pub fn invalidate_viewport(&mut self, id: ViewportId, rect: Rect) {
        let Some(viewport) = self.viewports.get(id) else {
            return;
        };

        if viewport.visibility == Visibility::Unknown {
            let owner = viewport.owner;
            let owner_is_main = self.windows.get(owner).is_some_and(|w| w.is_main());
            if !owner_is_main && !self.windows.is_visible(owner, &mut self.viewports) {
                return;
            }
        }

        let Some(viewport) = self.viewports.get(id) else {
            return;
        };

        if viewport.visibility == Visibility::Covered {
            return;
        }

        let view = viewport.view_rect();
        if rect.right <= view.left || rect.bottom <= view.top {
            return;
        }

        let clipped = rect.intersection(&view);
        if !clipped.is_valid() {
            return;
        }

        let zoom = viewport.zoom;
        let screen = Rect::new(
            zoom.scale_down(clipped.left - view.left) + viewport.pos.x,
            zoom.scale_down(clipped.top - view.top) + viewport.pos.y,
            zoom.scale_down(clipped.right - view.left) + viewport.pos.x,
            zoom.scale_down(clipped.bottom - view.top) + viewport.pos.y);

        self.dirty_blocks.mark_dirty(screen);
    }

    // Whole viewport.
    pub fn invalidate_viewport_full(&mut self, id: ViewportId) {
        if let Some(view) = self.viewports.get(id).map(|vp| vp.view_rect()) {
            self.invalidate_viewport(id, view);
        }
    }

    // Projected rect, in every viewport.
    pub fn invalidate_all_viewports(&mut self, rect: Rect) {
        let ids: Vec<ViewportId> = self.viewports.iter().map(|(id, _)| id).collect();
        for id in ids {
            self.invalidate_viewport(id, rect);
        }
    }

    // Everything that could be drawn for the tile at `tile` between heights
    // `z_low` and `z_high`, in every viewport's own rotation.
    pub fn invalidate_tile(&mut self, tile: CoordsXY, z_low: i32, z_high: i32) {
        if tile.is_null() {
            return;
        }

        let centre = CoordsXYZ::new(
            tile.to_tile_start().x + COORDS_XY_STEP / 2,
            tile.to_tile_start().y + COORDS_XY_STEP / 2,
            0);

        let targets: Vec<(ViewportId, Rect)> = self.viewports
            .iter()
            .map(|(id, viewport)| {
                let screen = world_to_screen(centre, viewport.rotation);
                (id, Rect::new(screen.x - 32, screen.y - 32 - z_high, screen.x + 32, screen.y + 32 - z_low))
            })
            .collect();

        for (id, rect) in targets {
            self.invalidate_viewport(id, rect);
        }
    }

    // Base to clearance height of one element on the tile at `tile`.
    #[inline]
    pub fn invalidate_element(&mut self, tile: CoordsXY, element: &TileElement) {
        self.invalidate_tile(tile, element.base_z(), element.clearance_z());
    }

    // Marks the whole window rectangle dirty, viewport or not.
    pub fn invalidate_window(&mut self, number: WindowNumber) {
        if let Some(rect) = self.windows.get(number).map(|w| w.rect) {
            self.dirty_blocks.mark_dirty(rect);
        }
    }
}

#[cfg(test)]
mod tests;
