use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display, EnumCount, EnumIter};

use crate::{
    bitflags_with_display,
    log,
    map::{TileElementKind, TileElementRef, TileMap},
    render::{DrawPixelInfo, PaintBackend, PaintPrimitive},
    utils::coords::{
        COORDS_XY_STEP,
        MAXIMUM_MAP_SIZE_BIG,
        CoordsXY,
        ScreenCoords,
        map_get_tile_quadrant,
        map_get_tile_side,
        viewport_pos_to_map_pos,
    },
    window::WindowNumber,
};

use super::{ViewportFlags, ViewportId, system::ViewportSystem};

// ----------------------------------------------
// InteractionKind
// ----------------------------------------------

// What a painted primitive belongs to, as far as the picker is concerned.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display, EnumCount, EnumIter, IntoPrimitive, TryFromPrimitive)]
pub enum InteractionKind {
    #[default]
    None,
    Terrain,
    Entity,
    Ride,
    Water,
    Scenery,
    Footpath,
    FootpathItem,
    ParkEntrance,
    Wall,
    LargeScenery,
    Label,
    Banner,
}

impl InteractionKind {
    // Mask bit a primitive of this kind is filtered with. Banners use the
    // large scenery bit, so they are only pickable when large scenery is.
    // None and Label are never picked.
    #[inline]
    pub fn pick_mask(self) -> Option<InteractionMask> {
        match self {
            Self::None | Self::Label => None,
            Self::Banner => InteractionMask::from_bits(1 << (u8::from(self) - 3)),
            _ => InteractionMask::from_bits(1 << (u8::from(self) - 1)),
        }
    }
}

bitflags_with_display! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct InteractionMask: u16 {
        const Terrain      = 1 << 0;
        const Entity       = 1 << 1;
        const Ride         = 1 << 2;
        const Water        = 1 << 3;
        const Scenery      = 1 << 4;
        const Footpath     = 1 << 5;
        const FootpathItem = 1 << 6;
        const ParkEntrance = 1 << 7;
        const Wall         = 1 << 8;
        const LargeScenery = 1 << 9;
        const Label        = 1 << 10;
        const Banner       = 1 << 11;
    }
}

// ----------------------------------------------
// InteractionInfo / TilePick
// ----------------------------------------------

// Result of a pick. `element` aliases map storage and is only meaningful
// until the map changes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InteractionInfo {
    pub kind: InteractionKind,
    pub pos: CoordsXY,
    pub element: Option<TileElementRef>,
    // Viewport of the window under the point, even if the point missed it.
    pub viewport: Option<ViewportId>,
}

impl InteractionInfo {
    #[inline]
    pub fn none() -> Self {
        Self {
            kind: InteractionKind::None,
            pos: CoordsXY::null(),
            element: None,
            viewport: None,
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.kind == InteractionKind::None
    }
}

// A tile plus a direction on it: a side (0-3), a quadrant (0-3),
// or 4 for "near the tile centre".
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TilePick {
    pub pos: CoordsXY,
    pub direction: u8,
    pub element: Option<TileElementRef>,
}

impl TilePick {
    #[inline]
    fn new(pos: CoordsXY, direction: u8) -> Self {
        Self { pos: pos.to_tile_start(), direction, element: None }
    }
}

// ----------------------------------------------
// PickContext
// ----------------------------------------------

// Best hit of a single pick pass. Primitives arrive back to front, so the
// last one that passes the mask is the one closest to the viewer.
#[derive(Copy, Clone, Debug)]
pub struct PickContext {
    mask: InteractionMask,
    kind: InteractionKind,
    pos: CoordsXY,
    element: Option<TileElementRef>,
}

impl PickContext {
    #[inline]
    pub fn new(mask: InteractionMask) -> Self {
        Self {
            mask,
            kind: InteractionKind::None,
            pos: CoordsXY::null(),
            element: None,
        }
    }

    pub fn store(&mut self, primitive: &PaintPrimitive) {
        let kind = match InteractionKind::try_from(primitive.interaction) {
            Ok(kind) => kind,
            Err(_) => {
                log::verbose!(log::channel!("picker"), "Ignoring unknown interaction type {}.", primitive.interaction);
                return;
            }
        };

        if kind == InteractionKind::Label {
            log::verbose!(log::channel!("picker"), "Ignoring {kind} primitive at {}.", primitive.map_pos);
        }

        let Some(bit) = kind.pick_mask() else {
            return;
        };

        if self.mask.contains(bit) {
            self.kind = kind;
            self.pos = primitive.map_pos;
            self.element = primitive.element;
        }
    }

    #[inline]
    pub fn into_info(self, viewport: Option<ViewportId>) -> InteractionInfo {
        InteractionInfo {
            kind: self.kind,
            pos: self.pos,
            element: self.element,
            viewport,
        }
    }
}

// ----------------------------------------------
// Picking
// ----------------------------------------------

// Number of refinement passes when unprojecting onto a picked tile.
const TILE_REFINE_ITERATIONS: usize = 5;

impl ViewportSystem {
    // Viewport drawn at a screen point, if the topmost window there has one
    // and the point is inside it.
    pub fn viewport_find_from_point(&self, screen: ScreenCoords) -> Option<ViewportId> {
        if screen.is_null() {
            return None;
        }
        let number = self.windows.find_from_point(screen.x, screen.y)?;
        let id = self.windows.get(number)?.viewport?;
        let viewport = self.viewports.get(id)?;
        viewport.contains_screen_point(screen).then_some(id)
    }

    pub fn get_map_coordinates_from_pos(&mut self,
                                        screen: ScreenCoords,
                                        mask: InteractionMask,
                                        paint: &mut dyn PaintBackend) -> InteractionInfo {
        let number = self.windows.find_from_point(screen.x, screen.y);
        self.get_map_coordinates_from_pos_window(number, screen, mask, paint)
    }

    // Paints the single projected pixel under `screen` in capture mode and
    // keeps the frontmost primitive that is opaque there and passes `mask`.
    pub fn get_map_coordinates_from_pos_window(&mut self,
                                               number: Option<WindowNumber>,
                                               screen: ScreenCoords,
                                               mask: InteractionMask,
                                               paint: &mut dyn PaintBackend) -> InteractionInfo {
        if screen.is_null() {
            return InteractionInfo::none();
        }
        let Some(id) = number.and_then(|n| self.windows.get(n)).and_then(|w| w.viewport) else {
            return InteractionInfo::none();
        };
        let Some(viewport) = self.viewports.get(id) else {
            return InteractionInfo::none();
        };

        let mut context = PickContext::new(mask);

        if !viewport.contains_screen_point(screen) {
            return context.into_info(Some(id));
        }

        let projected = viewport.screen_to_viewport(screen);
        let projected = ScreenCoords::new(viewport.zoom.align(projected.x), viewport.zoom.align(projected.y));
        let dpi = DrawPixelInfo::pixel(projected, viewport.zoom);

        let mut primitives = std::mem::take(&mut self.pick_scratch);
        primitives.clear();
        paint.arrange(&dpi, viewport.flags, viewport.rotation, &mut primitives);

        let sprites = paint.sprites();
        for primitive in &primitives {
            if sprites.is_pixel_present(&dpi, primitive.image, primitive.pos) {
                context.store(primitive);
            }

            for attached in &primitive.attached {
                if sprites.is_pixel_present(&dpi, attached.image, primitive.pos + attached.offset) {
                    context.store(primitive);
                }
            }
        }

        self.pick_scratch = primitives;
        context.into_info(Some(id))
    }

    // ----------------------
    // Terrain helpers:
    // ----------------------

    // World position on the terrain under a screen point, refined inside the
    // picked tile.
    pub fn screen_get_map_xy(&mut self,
                             screen: ScreenCoords,
                             map: &dyn TileMap,
                             paint: &mut dyn PaintBackend) -> Option<(CoordsXY, ViewportId)> {
        let info = self.get_map_coordinates_from_pos(screen, InteractionMask::Terrain, paint);
        if info.is_none() {
            return None;
        }

        let id = info.viewport?;
        let viewport = self.viewports.get(id)?;

        let start = viewport.screen_to_viewport(screen);
        let min = info.pos.to_tile_start();
        let max = min + CoordsXY::new(COORDS_XY_STEP - 1, COORDS_XY_STEP - 1);

        let mut pos = min + CoordsXY::new(COORDS_XY_STEP / 2, COORDS_XY_STEP / 2);
        for _ in 0..TILE_REFINE_ITERATIONS {
            let z = map.height_at(pos);
            pos = viewport_pos_to_map_pos(start, z, viewport.rotation).clamp(min, max);
        }

        Some((pos, id))
    }

    // Unprojects at a fixed height, without picking. None outside the
    // largest possible map.
    pub fn screen_get_map_xy_with_z(&self, screen: ScreenCoords, z: i32) -> Option<CoordsXY> {
        let id = self.viewport_find_from_point(screen)?;
        let viewport = self.viewports.get(id)?;

        let projected = viewport.screen_to_viewport(screen);
        let pos = viewport_pos_to_map_pos(projected, z, viewport.rotation);

        let on_map = (0..MAXIMUM_MAP_SIZE_BIG).contains(&pos.x) && (0..MAXIMUM_MAP_SIZE_BIG).contains(&pos.y);
        on_map.then_some(pos)
    }

    pub fn screen_get_map_xy_quadrant(&mut self,
                                      screen: ScreenCoords,
                                      map: &dyn TileMap,
                                      paint: &mut dyn PaintBackend) -> Option<TilePick> {
        let (pos, _) = self.screen_get_map_xy(screen, map, paint)?;
        Some(TilePick::new(pos, map_get_tile_quadrant(pos)))
    }

    pub fn screen_get_map_xy_quadrant_with_z(&self, screen: ScreenCoords, z: i32) -> Option<TilePick> {
        let pos = self.screen_get_map_xy_with_z(screen, z)?;
        Some(TilePick::new(pos, map_get_tile_quadrant(pos)))
    }

    pub fn screen_get_map_xy_side(&mut self,
                                  screen: ScreenCoords,
                                  map: &dyn TileMap,
                                  paint: &mut dyn PaintBackend) -> Option<TilePick> {
        let (pos, _) = self.screen_get_map_xy(screen, map, paint)?;
        Some(TilePick::new(pos, map_get_tile_side(pos)))
    }

    pub fn screen_get_map_xy_side_with_z(&self, screen: ScreenCoords, z: i32) -> Option<TilePick> {
        let pos = self.screen_get_map_xy_with_z(screen, z)?;
        Some(TilePick::new(pos, map_get_tile_side(pos)))
    }

    // Terrain tile under the point plus a coarse direction: 4 near the tile
    // centre, otherwise the quadrant the cursor is in.
    pub fn screen_pos_to_map_pos(&mut self,
                                 screen: ScreenCoords,
                                 map: &dyn TileMap,
                                 paint: &mut dyn PaintBackend) -> Option<TilePick> {
        let (pos, _) = self.screen_get_map_xy(screen, map, paint)?;
        Some(TilePick::new(pos, centre_or_quadrant(pos)))
    }

    // ----------------------
    // Footpath helpers:
    // ----------------------

    // Tile and nearest edge for footpath placement. Paths are only trusted
    // directly in cutaway views, otherwise terrain is picked as well.
    pub fn footpath_get_coordinates_from_pos(&mut self,
                                             screen: ScreenCoords,
                                             map: &dyn TileMap,
                                             paint: &mut dyn PaintBackend) -> Option<TilePick> {
        let mut info = self.get_map_coordinates_from_pos(screen, InteractionMask::Footpath, paint);

        if info.kind != InteractionKind::Footpath || !self.is_cutaway_view(info.viewport) {
            info = self.get_map_coordinates_from_pos(screen, InteractionMask::Footpath | InteractionMask::Terrain, paint);
            if info.is_none() {
                return None;
            }
        }

        let viewport = self.viewports.get(info.viewport?)?;
        let start = viewport.screen_to_viewport(screen);

        let min = info.pos;
        let max = min + CoordsXY::new(COORDS_XY_STEP - 1, COORDS_XY_STEP - 1);
        let mut pos = min + CoordsXY::new(COORDS_XY_STEP / 2, COORDS_XY_STEP / 2);

        let on_path = info.kind == InteractionKind::Footpath;
        let mut z = if on_path {
            info.element
                .and_then(|element| map.element(element))
                .map_or(0, |element| element.footpath_z())
        } else {
            0
        };

        for _ in 0..TILE_REFINE_ITERATIONS {
            if !on_path {
                z = map.height_at(pos);
            }
            pos = viewport_pos_to_map_pos(start, z, viewport.rotation).clamp(min, max);
        }

        Some(TilePick {
            pos: pos.to_tile_start(),
            direction: map_get_tile_side(pos),
            element: info.element,
        })
    }

    // Like footpath_get_coordinates_from_pos, but pointing at a ride entrance
    // or exit yields the direction its path leaves in.
    pub fn footpath_bridge_get_info_from_pos(&mut self,
                                             screen: ScreenCoords,
                                             map: &dyn TileMap,
                                             paint: &mut dyn PaintBackend) -> Option<TilePick> {
        let info = self.get_map_coordinates_from_pos(screen, InteractionMask::Ride, paint);
        if info.kind == InteractionKind::Ride && self.is_cutaway_view(info.viewport) {
            if let Some(pick) = entrance_pick(&info, map) {
                return Some(pick);
            }
        }

        let info = self.get_map_coordinates_from_pos(
            screen,
            InteractionMask::Ride | InteractionMask::Footpath | InteractionMask::Terrain,
            paint);

        if info.kind == InteractionKind::Ride {
            if let Some(pick) = entrance_pick(&info, map) {
                return Some(pick);
            }
        }

        self.footpath_get_coordinates_from_pos(screen, map, paint)
    }

    #[inline]
    fn is_cutaway_view(&self, id: Option<ViewportId>) -> bool {
        id.and_then(|id| self.viewports.get(id))
            .is_some_and(|vp| vp.flags.intersects(ViewportFlags::CUTAWAY_VIEW))
    }
}

fn entrance_pick(info: &InteractionInfo, map: &dyn TileMap) -> Option<TilePick> {
    let element_ref = info.element?;
    let element = map.element(element_ref)?;

    if element.kind != TileElementKind::Entrance {
        return None;
    }

    Some(TilePick {
        pos: info.pos,
        direction: element.first_connection_direction()?,
        element: Some(element_ref),
    })
}

// 4 when both sub-tile offsets are strictly between 8 and 24.
#[inline]
fn centre_or_quadrant(pos: CoordsXY) -> u8 {
    let from_corner_x = (pos.x % COORDS_XY_STEP).abs();
    let from_corner_y = (pos.y % COORDS_XY_STEP).abs();

    if (9..24).contains(&from_corner_x) && (9..24).contains(&from_corner_y) {
        return 4;
    }

    let sub = pos.tile_offset();
    if sub.x <= 16 {
        if sub.y < 16 { 2 } else { 3 }
    } else {
        if sub.y < 16 { 1 } else { 0 }
    }
}
