use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display, EnumCount, EnumIter};

use crate::utils::coords::{COORDS_XY_STEP, COORDS_Z_STEP, CoordsXY, CoordsXYZ};

// ----------------------------------------------
// TileElementKind
// ----------------------------------------------

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumCount, EnumIter, IntoPrimitive, TryFromPrimitive)]
pub enum TileElementKind {
    Surface,
    Path,
    Track,
    SmallScenery,
    Entrance,
    Wall,
    LargeScenery,
    Banner,
}

// ----------------------------------------------
// TileElement
// ----------------------------------------------

// Read-only view of one element in a tile's stack, as far as the
// camera and picking code care about it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileElement {
    pub kind: TileElementKind,
    // Heights in Z steps (8 world units each).
    pub base_height: u8,
    pub clearance_height: u8,
    pub direction: u8,
    pub is_sloped: bool,
    // Entrances only: bitmask of the connected sides, relative to `direction`.
    pub connections: u8,
}

impl TileElement {
    #[inline]
    pub const fn new(kind: TileElementKind, base_height: u8) -> Self {
        Self {
            kind,
            base_height,
            clearance_height: base_height,
            direction: 0,
            is_sloped: false,
            connections: 0,
        }
    }

    #[inline]
    pub const fn base_z(&self) -> i32 {
        self.base_height as i32 * COORDS_Z_STEP
    }

    #[inline]
    pub const fn clearance_z(&self) -> i32 {
        self.clearance_height as i32 * COORDS_Z_STEP
    }

    #[inline]
    pub const fn is_footpath(&self) -> bool {
        matches!(self.kind, TileElementKind::Path)
    }

    // Walking height on top of a path, half a step higher on slopes.
    #[inline]
    pub const fn footpath_z(&self) -> i32 {
        if self.is_sloped { self.base_z() + COORDS_Z_STEP } else { self.base_z() }
    }

    // First connected side of an entrance, rotated into world space.
    #[inline]
    pub fn first_connection_direction(&self) -> Option<u8> {
        let sides = self.connections & 0x0F;
        if sides == 0 {
            return None;
        }
        Some(((sides.trailing_zeros() as u8) + self.direction) & 3)
    }
}

// ----------------------------------------------
// TileElementRef
// ----------------------------------------------

// Non-owning handle to an element: the tile it lives on plus its index in the
// stack. Resolve it through the TileMap that produced it, before the map changes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TileElementRef {
    pub tile: CoordsXY,
    pub index: u16,
}

impl TileElementRef {
    #[inline]
    pub fn new(pos: CoordsXY, index: u16) -> Self {
        Self { tile: pos.to_tile_start(), index }
    }
}

impl std::fmt::Display for TileElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}#{}", self.tile, self.index)
    }
}

// ----------------------------------------------
// TileMap
// ----------------------------------------------

pub trait TileMap {
    // Map side length in tiles.
    fn size_in_tiles(&self) -> i32;

    // Terrain height in world units at a world position. Must return 0 (not panic)
    // for positions outside the map, the camera clamps past the edges.
    fn height_at(&self, pos: CoordsXY) -> i32;

    // Element stack of the tile containing `pos`, bottom to top.
    fn elements_at(&self, pos: CoordsXY) -> &[TileElement];

    // Largest valid camera centre coordinate, in world units.
    #[inline]
    fn size_minus_2(&self) -> i32 {
        self.size_in_tiles() * COORDS_XY_STEP - 2
    }

    #[inline]
    fn element(&self, element_ref: TileElementRef) -> Option<&TileElement> {
        self.elements_at(element_ref.tile).get(element_ref.index as usize)
    }
}

// ----------------------------------------------
// Entities
// ----------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityId(pub u16);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

pub trait EntityLookup {
    // Current world position, or None if the entity no longer exists.
    fn entity_position(&self, id: EntityId) -> Option<CoordsXYZ>;
}
