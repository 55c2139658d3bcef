use arrayvec::ArrayVec;

use crate::{
    log,
    map::{EntityId, EntityLookup, TileMap},
    render::{PaintBackend, ScreenBackend},
    utils::{
        Rect,
        div_away_from_zero,
        coords::{
            MAP_MINIMUM_X_Y,
            CoordsXY,
            CoordsXYZ,
            Rotation,
            RotationDirection,
            ScreenCoords,
            ZoomLevel,
            viewport_pos_to_map_pos,
            world_to_screen,
        },
    },
    window::{WindowFlags, WindowNumber},
};

use super::{
    ViewportFlags,
    ViewportId,
    interaction::InteractionMask,
    system::ViewportSystem,
};

// ----------------------------------------------
// Shift planning
// ----------------------------------------------

// One step of the redraw that follows a viewport scroll.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShiftOp {
    // Move already presented pixels inside `rect` by (dx, dy).
    Copy { rect: Rect, dx: i32, dy: i32 },
    // Repaint everything under `rect`.
    Draw(Rect),
}

// Redraw for a single unobstructed piece of a viewport whose contents moved
// by (dx, dy) screen pixels. Reuses the old pixels when the shift is smaller
// than the piece and only repaints the exposed bands.
pub fn plan_shift(piece: Rect, dx: i32, dy: i32) -> ArrayVec<ShiftOp, 3> {
    let mut ops = ArrayVec::new();

    if dx.abs() >= piece.width() || dy.abs() >= piece.height() {
        ops.push(ShiftOp::Draw(piece));
        return ops;
    }

    ops.push(ShiftOp::Copy { rect: piece, dx, dy });

    let mut left = piece.left;
    let mut right = piece.right;

    if dx > 0 {
        ops.push(ShiftOp::Draw(Rect::new(piece.left, piece.top, piece.left + dx, piece.bottom)));
        left += dx;
    } else if dx < 0 {
        ops.push(ShiftOp::Draw(Rect::new(piece.right + dx, piece.top, piece.right, piece.bottom)));
        right += dx;
    }

    if dy > 0 {
        ops.push(ShiftOp::Draw(Rect::new(left, piece.top, right, piece.top + dy)));
    } else if dy < 0 {
        ops.push(ShiftOp::Draw(Rect::new(left, piece.bottom + dy, right, piece.bottom)));
    }

    ops
}

// Splits `viewport_rect` around the windows drawn above it (`occluders`,
// bottom to top) and plans a shift for every piece left uncovered.
// Pieces fully inside an occluder are dropped.
pub fn plan_redraw_after_shift(viewport_rect: Rect, occluders: &[Rect], dx: i32, dy: i32) -> Vec<ShiftOp> {
    let mut ops = Vec::new();
    let mut work = vec![(viewport_rect, 0usize)];

    while let Some((piece, index)) = work.pop() {
        let Some(occluder) = occluders.get(index) else {
            ops.extend(plan_shift(piece, dx, dy));
            continue;
        };

        if !piece.intersects(occluder) {
            work.push((piece, index + 1));
            continue;
        }

        let (first, second) = if piece.left < occluder.left {
            split_x(piece, occluder.left)
        } else if piece.right > occluder.right {
            split_x(piece, occluder.right)
        } else if piece.top < occluder.top {
            split_y(piece, occluder.top)
        } else if piece.bottom > occluder.bottom {
            split_y(piece, occluder.bottom)
        } else {
            continue;
        };

        // Both halves are tested against the same occluder again; `first` is handled first.
        work.push((second, index));
        work.push((first, index));
    }

    ops
}

#[inline]
fn split_x(piece: Rect, x: i32) -> (Rect, Rect) {
    (Rect::new(piece.left, piece.top, x, piece.bottom), Rect::new(x, piece.top, piece.right, piece.bottom))
}

#[inline]
fn split_y(piece: Rect, y: i32) -> (Rect, Rect) {
    (Rect::new(piece.left, piece.top, piece.right, y), Rect::new(piece.left, y, piece.right, piece.bottom))
}

fn apply_shift_ops(ops: &[ShiftOp], screen: &mut dyn ScreenBackend) {
    for op in ops {
        match *op {
            ShiftOp::Copy { rect, dx, dy } => screen.copy_rect(rect, dx, dy),
            ShiftOp::Draw(rect) => screen.draw_region(rect),
        }
    }
}

// ----------------------------------------------
// Scroll anchors
// ----------------------------------------------

// Candidate screen positions for a scroll target, in eighths of the viewport.
// The first one not near a window drawn above the viewport wins.
const SCROLL_ANCHORS: [(i32, i32); 17] = [
    (4, 4), (6, 4), (2, 4), (4, 6), (4, 2),
    (6, 6), (6, 2), (2, 6), (2, 2),
    (1, 4), (7, 4), (4, 1), (4, 7),
    (7, 1), (7, 7), (1, 7), (1, 1),
];

const SCROLL_ANCHOR_MARGIN: i32 = 10;

// Map size correction applied when the height search walks off the far map corner.
const HEIGHT_X_CORRECTION: [i32; 4] = [-1, 1, 1, -1];
const HEIGHT_Y_CORRECTION: [i32; 4] = [-1, -1, 1, 1];

// Finds the terrain point under the projected `view_centre` by alternating
// unprojection and height lookups. Always runs 6 iterations.
pub fn adjust_for_map_height(view_centre: ScreenCoords, rotation: Rotation, map: &dyn TileMap) -> CoordsXYZ {
    let mut height = 0;
    let mut pos = CoordsXY::default();
    let max = map.size_minus_2();

    for _ in 0..6 {
        pos = viewport_pos_to_map_pos(view_centre, height, rotation);
        height = map.height_at(pos);

        if pos.x > max && pos.y > max {
            pos.x += HEIGHT_X_CORRECTION[rotation.value() as usize] * height;
            pos.y += HEIGHT_Y_CORRECTION[rotation.value() as usize] * height;
        }
    }

    pos.with_z(height)
}

// Cursor-relative zoom state captured before a zoom change.
#[derive(Copy, Clone, Debug)]
struct ZoomAnchor {
    map_pos: CoordsXY,
    cursor: ScreenCoords,
    offset: ScreenCoords,
}

// ----------------------------------------------
// Camera movement
// ----------------------------------------------

impl ViewportSystem {
    // Per tick camera update for every window with a viewport.
    pub fn update_all_viewports(&mut self,
                                map: &dyn TileMap,
                                entities: &dyn EntityLookup,
                                screen: &mut dyn ScreenBackend) {
        let numbers: Vec<WindowNumber> = self.windows
            .iter()
            .filter(|w| w.viewport.is_some())
            .map(|w| w.number)
            .collect();

        for number in numbers {
            self.update_position(number, map, entities, screen);
        }
    }

    // Recomputes the view of one window: follows its target entity, or clamps
    // the saved view to the map and eases or snaps towards it.
    pub fn update_position(&mut self,
                           number: WindowNumber,
                           map: &dyn TileMap,
                           entities: &dyn EntityLookup,
                           screen: &mut dyn ScreenBackend) {
        let Some(window) = self.windows.get(number) else {
            return;
        };
        let Some(id) = window.viewport else {
            return;
        };

        if let Some(entity) = window.target_entity {
            self.update_entity_follow(number, entity, map, entities, screen);
            return;
        }

        self.set_underground_flag(number, false);

        let Some(viewport) = self.viewports.get(id) else {
            return;
        };
        let Some(window) = self.windows.get_mut(number) else {
            return;
        };

        let min = CoordsXY::new(MAP_MINIMUM_X_Y, MAP_MINIMUM_X_Y);
        let max = CoordsXY::new(map.size_minus_2(), map.size_minus_2());

        // Unproject at the terrain height under a sea level guess, so a view
        // already clamped onto raised terrain stays put.
        let half = viewport.view_size.half();
        let view_half = ScreenCoords::new(half.width, half.height);
        let centre = window.saved_view + view_half;
        let guess = viewport_pos_to_map_pos(centre, 0, viewport.rotation);
        let map_pos = viewport_pos_to_map_pos(centre, map.height_at(guess.clamp(min, max)), viewport.rotation);
        let clamped = map_pos.clamp(min, max);

        if clamped != map_pos {
            let z = map.height_at(clamped);
            window.saved_view = viewport.centre_view_at(clamped.with_z(z));
        }

        let mut target = window.saved_view;

        if window.flags.contains(WindowFlags::ScrollingToLocation) {
            let remaining = window.saved_view - viewport.view_pos;
            let step = ScreenCoords::new(div_away_from_zero(remaining.x, 8), div_away_from_zero(remaining.y, 8));

            // Arrives this tick.
            if step == remaining {
                window.flags.remove(WindowFlags::ScrollingToLocation);
            }

            target = viewport.view_pos + step;
        }

        self.move_viewport(number, target, screen);
    }

    fn update_entity_follow(&mut self,
                            number: WindowNumber,
                            entity: EntityId,
                            map: &dyn TileMap,
                            entities: &dyn EntityLookup,
                            screen: &mut dyn ScreenBackend) {
        // Entities off the map (guests on rides) hold a null position.
        let Some(pos) = entities.entity_position(entity).filter(|pos| !pos.is_null()) else {
            return;
        };

        let height = map.height_at(pos.xy()) - 16;
        self.set_underground_flag(number, pos.z < height);

        let Some(centre) = self.window_viewport(number).map(|vp| vp.centre_view_at(pos)) else {
            return;
        };

        if let Some(window) = self.windows.get_mut(number) {
            window.saved_view = centre;
        }

        self.move_viewport(number, centre, screen);
    }

    // Only non-main windows switch to the underground view on their own.
    fn set_underground_flag(&mut self, number: WindowNumber, underground: bool) {
        if self.windows.get(number).is_none_or(|w| w.is_main()) {
            return;
        }

        let Some(viewport) = self.window_viewport_mut(number) else {
            return;
        };

        let was_underground = viewport.flags.contains(ViewportFlags::UndergroundInside);
        viewport.flags.set(ViewportFlags::UndergroundInside, underground);

        if was_underground != underground {
            self.invalidate_window(number);
        }
    }

    // Sets the view origin and redraws what the move exposed.
    pub fn move_viewport(&mut self, number: WindowNumber, view_pos: ScreenCoords, screen: &mut dyn ScreenBackend) {
        if view_pos.is_null() {
            return;
        }
        let Some(index) = self.windows.index_of(number) else {
            return;
        };
        let Some(window) = self.windows.at(index) else {
            return;
        };
        let flags = window.flags;
        let Some(id) = window.viewport else {
            return;
        };
        let Some(viewport) = self.viewports.get_mut(id) else {
            return;
        };

        let zoom = viewport.zoom;
        let dx = zoom.scale_down(viewport.view_pos.x) - zoom.scale_down(view_pos.x);
        let dy = zoom.scale_down(viewport.view_pos.y) - zoom.scale_down(view_pos.y);

        viewport.view_pos = view_pos;

        if dx == 0 && dy == 0 {
            return;
        }

        let screen_rect = Rect::from_pos_and_size(0, 0, screen.screen_size());
        let visible = viewport.screen_rect().intersection(&screen_rect);

        if !visible.is_valid() {
            return;
        }

        if !screen.has_dirty_optimisations() {
            // The whole screen is redrawn every frame anyway.
            return;
        }

        if flags.contains(WindowFlags::RedrawOnMove) {
            screen.draw_region(visible);
            return;
        }

        self.shift_pixels(index, id, visible, dx, dy, screen);
    }

    // Repaints transparent windows over the viewport before blitting it, then
    // blits and repaints the exposed bands of every uncovered piece.
    fn shift_pixels(&self,
                    owner_index: usize,
                    id: ViewportId,
                    visible: Rect,
                    dx: i32,
                    dy: i32,
                    screen: &mut dyn ScreenBackend) {
        for window in self.windows.iter().skip(owner_index) {
            if !window.flags.contains(WindowFlags::Transparent) || window.viewport == Some(id) {
                continue;
            }

            let overlap = window.rect.intersection(&visible);
            if overlap.is_valid() {
                screen.draw_region(overlap);
            }
        }

        let occluders: Vec<Rect> = self.windows
            .iter()
            .skip(owner_index + 1)
            .filter(|w| w.viewport != Some(id))
            .map(|w| w.rect)
            .collect();

        let ops = plan_redraw_after_shift(visible, &occluders, dx, dy);
        apply_shift_ops(&ops, screen);
    }

    // ----------------------
    // Follow / scroll:
    // ----------------------

    pub fn follow_entity(&mut self, number: WindowNumber, entity: EntityId) {
        if let Some(window) = self.windows.get_mut(number) {
            window.target_entity = Some(entity);
        }
    }

    pub fn unfollow(&mut self, number: WindowNumber) {
        if let Some(window) = self.windows.get_mut(number) {
            window.target_entity = None;
        }
    }

    // Starts easing the window's camera so `pos` ends up at the first free
    // scroll anchor of its viewport.
    pub fn scroll_to_location(&mut self, number: WindowNumber, pos: CoordsXYZ, map: &dyn TileMap) {
        if pos.is_null() {
            return;
        }
        self.unfollow(number);

        let Some(index) = self.windows.index_of(number) else {
            return;
        };
        let Some(viewport) = self.window_viewport_mut(number) else {
            return;
        };

        let underground = pos.z < map.height_at(pos.xy()) - 16;
        let was_underground = viewport.flags.contains(ViewportFlags::UndergroundInside);
        viewport.flags.set(ViewportFlags::UndergroundInside, underground);

        let projected = world_to_screen(pos, viewport.rotation);
        let (anchor_x, anchor_y) = self.free_scroll_anchor(index);

        if was_underground != underground {
            self.invalidate_window(number);
        }

        let Some(viewport) = self.window_viewport(number) else {
            return;
        };
        let saved = ScreenCoords::new(
            projected.x - viewport.view_size.width * anchor_x / 8,
            projected.y - viewport.view_size.height * anchor_y / 8);

        let Some(window) = self.windows.get_mut(number) else {
            return;
        };

        if window.target_entity.is_none() && !window.flags.contains(WindowFlags::NoScrolling) {
            window.saved_view = saved;
            window.flags.insert(WindowFlags::ScrollingToLocation);
        }
    }

    // Jumps without easing on the next update.
    pub fn set_location(&mut self, number: WindowNumber, pos: CoordsXYZ, map: &dyn TileMap) {
        if pos.is_null() {
            return;
        }
        self.scroll_to_location(number, pos, map);
        if let Some(window) = self.windows.get_mut(number) {
            window.flags.remove(WindowFlags::ScrollingToLocation);
        }
    }

    fn free_scroll_anchor(&self, window_index: usize) -> (i32, i32) {
        let Some(viewport) = self.windows.at(window_index).and_then(|w| self.window_viewport(w.number)) else {
            return SCROLL_ANCHORS[0];
        };

        let covered = |x: i32, y: i32| {
            self.windows.iter().skip(window_index + 1).any(|other| {
                x >= other.rect.left - SCROLL_ANCHOR_MARGIN
                && x <= other.rect.right + SCROLL_ANCHOR_MARGIN
                && y >= other.rect.top - SCROLL_ANCHOR_MARGIN
                && y <= other.rect.bottom + SCROLL_ANCHOR_MARGIN
            })
        };

        SCROLL_ANCHORS
            .iter()
            .copied()
            .find(|&(ax, ay)| {
                !covered(viewport.pos.x + viewport.size.width * ax / 8,
                         viewport.pos.y + viewport.size.height * ay / 8)
            })
            .unwrap_or(SCROLL_ANCHORS[0])
    }

    // ----------------------
    // Rotation:
    // ----------------------

    // Rotates one 90 degree step, keeping the terrain point at the centre of
    // the viewport in place.
    pub fn rotate_camera(&mut self,
                         number: WindowNumber,
                         direction: RotationDirection,
                         map: &dyn TileMap,
                         paint: &mut dyn PaintBackend) {
        let Some(window) = self.windows.get(number) else {
            return;
        };
        let is_main = window.is_main();
        let Some(id) = window.viewport else {
            return;
        };
        let Some(viewport) = self.viewports.get(id) else {
            return;
        };

        let half = viewport.size.half();
        let screen_centre = viewport.pos + ScreenCoords::new(half.width, half.height);
        let view_centre = viewport.view_centre();
        let rotation = viewport.rotation;

        let centre = match self.screen_get_map_xy(screen_centre, map, paint) {
            Some((pos, hit_viewport)) if hit_viewport == id => pos.with_z(map.height_at(pos)),
            _ => adjust_for_map_height(view_centre, rotation, map),
        };

        let new_rotation = rotation.rotated(direction);

        let Some(viewport) = self.viewports.get_mut(id) else {
            return;
        };
        viewport.rotation = new_rotation;
        let view_pos = viewport.centre_view_at(centre);
        viewport.view_pos = view_pos;

        if let Some(window) = self.windows.get_mut(number) {
            window.saved_view = view_pos;
        }

        if is_main {
            self.rotation = new_rotation;
        }

        self.invalidate_window(number);

        log::verbose!(log::channel!("camera"), "{number} rotated {direction} to {new_rotation} around {centre}.");
    }

    // ----------------------
    // Zoom:
    // ----------------------

    // Steps the zoom one level at a time towards `zoom`, keeping the view
    // centre in place, or the tile under `cursor` when zooming to the cursor
    // is enabled.
    pub fn zoom_set(&mut self,
                    number: WindowNumber,
                    zoom: ZoomLevel,
                    cursor: Option<ScreenCoords>,
                    map: &dyn TileMap,
                    paint: &mut dyn PaintBackend) {
        let zoom = self.configs.clamp_zoom(zoom);

        let Some(current) = self.window_viewport(number).map(|vp| vp.zoom) else {
            return;
        };
        if current == zoom {
            return;
        }

        let anchor = match cursor {
            Some(cursor) if self.configs.zoom_to_cursor => self.zoom_anchor(number, cursor, map, paint),
            _ => None,
        };

        let Some(id) = self.windows.get(number).and_then(|w| w.viewport) else {
            return;
        };
        let Some(viewport) = self.viewports.get_mut(id) else {
            return;
        };
        let Some(window) = self.windows.get_mut(number) else {
            return;
        };

        while viewport.zoom != zoom {
            let old_view = viewport.view_size;
            let next = if viewport.zoom > zoom { viewport.zoom.zoomed_in() } else { viewport.zoom.zoomed_out() };
            viewport.set_zoom(next);

            window.saved_view += ScreenCoords::new(
                (old_view.width - viewport.view_size.width) / 2,
                (old_view.height - viewport.view_size.height) / 2);
        }

        if let Some(anchor) = anchor {
            let dest = viewport.centre_view_at(anchor.map_pos.with_z(map.height_at(anchor.map_pos)));
            let rebased = cursor_rebase(window.rect, anchor.cursor, viewport.zoom);
            window.saved_view = dest + rebased + ScreenCoords::new(
                viewport.zoom.scale_down(anchor.offset.x),
                viewport.zoom.scale_down(anchor.offset.y));
        }

        log::verbose!(log::channel!("camera"), "{number} zoomed from {current} to {zoom}.");

        self.bring_to_front(number);
    }

    pub fn zoom_in(&mut self, number: WindowNumber, cursor: Option<ScreenCoords>, map: &dyn TileMap, paint: &mut dyn PaintBackend) {
        if let Some(zoom) = self.window_viewport(number).map(|vp| vp.zoom.zoomed_in()) {
            self.zoom_set(number, zoom, cursor, map, paint);
        }
    }

    pub fn zoom_out(&mut self, number: WindowNumber, cursor: Option<ScreenCoords>, map: &dyn TileMap, paint: &mut dyn PaintBackend) {
        if let Some(zoom) = self.window_viewport(number).map(|vp| vp.zoom.zoomed_out()) {
            self.zoom_set(number, zoom, cursor, map, paint);
        }
    }

    fn zoom_anchor(&mut self,
                   number: WindowNumber,
                   cursor: ScreenCoords,
                   map: &dyn TileMap,
                   paint: &mut dyn PaintBackend) -> Option<ZoomAnchor> {
        let info = self.get_map_coordinates_from_pos(cursor, InteractionMask::all(), paint);
        if info.is_none() {
            return None;
        }

        let window = self.windows.get(number)?;
        let viewport = self.window_viewport(number)?;

        let dest = viewport.centre_view_at(info.pos.with_z(map.height_at(info.pos)));
        let rebased = cursor_rebase(window.rect, cursor, viewport.zoom);
        let offset = window.saved_view - (dest + rebased);

        Some(ZoomAnchor {
            map_pos: info.pos,
            cursor,
            offset: ScreenCoords::new(viewport.zoom.scale_up(offset.x), viewport.zoom.scale_up(offset.y)),
        })
    }
}

// Distance from the cursor to the window centre, in projected pixels.
#[inline]
fn cursor_rebase(window_rect: Rect, cursor: ScreenCoords, zoom: ZoomLevel) -> ScreenCoords {
    ScreenCoords::new(
        zoom.scale_up(window_rect.width() / 2 - (cursor.x - window_rect.left)),
        zoom.scale_up(window_rect.height() / 2 - (cursor.y - window_rect.top)))
}
