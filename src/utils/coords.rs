use std::ops::{Add, AddAssign, Sub, SubAssign};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use super::{Size, floor2};

// ----------------------------------------------
// Constants
// ----------------------------------------------

// Reserved "no valid position" value. Only the X axis is checked.
pub const LOCATION_NULL: i32 = -32768;

// World units per tile along X/Y and per height step along Z.
pub const COORDS_XY_STEP: i32 = 32;
pub const COORDS_Z_STEP:  i32 = 8;

pub const MAXIMUM_MAP_SIZE_TECHNICAL: i32 = 256;
pub const MAXIMUM_MAP_SIZE_BIG: i32 = MAXIMUM_MAP_SIZE_TECHNICAL * COORDS_XY_STEP;

// The camera centre may wander up to this far past the top/left map edges.
pub const MAP_MINIMUM_X_Y: i32 = -MAXIMUM_MAP_SIZE_TECHNICAL;

// ----------------------------------------------
// ScreenCoords
// ----------------------------------------------

// Integer pixel position. Used both for screen space and for the
// zoom-independent "projected" space viewports are scrolled in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenCoords {
    pub x: i32,
    pub y: i32,
}

impl ScreenCoords {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x: x, y: y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    #[inline]
    pub const fn null() -> Self {
        Self { x: LOCATION_NULL, y: 0 }
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        self.x == LOCATION_NULL
    }
}

impl Add for ScreenCoords {
    type Output = ScreenCoords;
    fn add(self, rhs: ScreenCoords) -> ScreenCoords {
        ScreenCoords::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for ScreenCoords {
    fn add_assign(&mut self, rhs: ScreenCoords) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for ScreenCoords {
    type Output = ScreenCoords;
    fn sub(self, rhs: ScreenCoords) -> ScreenCoords {
        ScreenCoords::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for ScreenCoords {
    fn sub_assign(&mut self, rhs: ScreenCoords) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl std::fmt::Display for ScreenCoords {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{},{}]", self.x, self.y)
    }
}

// ----------------------------------------------
// CoordsXY
// ----------------------------------------------

// World position in map units (32 per tile).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordsXY {
    pub x: i32,
    pub y: i32,
}

impl CoordsXY {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x: x, y: y }
    }

    #[inline]
    pub const fn null() -> Self {
        Self { x: LOCATION_NULL, y: 0 }
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        self.x == LOCATION_NULL
    }

    // North/west corner of the tile containing this position.
    #[inline]
    pub const fn to_tile_start(self) -> Self {
        Self {
            x: floor2(self.x, COORDS_XY_STEP),
            y: floor2(self.y, COORDS_XY_STEP),
        }
    }

    // Sub-tile offset, both axes in [0,31].
    #[inline]
    pub const fn tile_offset(self) -> Self {
        Self {
            x: self.x & (COORDS_XY_STEP - 1),
            y: self.y & (COORDS_XY_STEP - 1),
        }
    }

    #[inline]
    pub fn clamp(self, min: Self, max: Self) -> Self {
        Self {
            x: self.x.clamp(min.x, max.x),
            y: self.y.clamp(min.y, max.y),
        }
    }

    #[inline]
    pub const fn with_z(self, z: i32) -> CoordsXYZ {
        CoordsXYZ::new(self.x, self.y, z)
    }
}

impl Add for CoordsXY {
    type Output = CoordsXY;
    fn add(self, rhs: CoordsXY) -> CoordsXY {
        CoordsXY::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for CoordsXY {
    type Output = CoordsXY;
    fn sub(self, rhs: CoordsXY) -> CoordsXY {
        CoordsXY::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::fmt::Display for CoordsXY {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{},{}]", self.x, self.y)
    }
}

// ----------------------------------------------
// CoordsXYZ
// ----------------------------------------------

// World position plus height, Z in world units (8 per height step).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordsXYZ {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CoordsXYZ {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x: x, y: y, z: z }
    }

    #[inline]
    pub const fn null() -> Self {
        Self { x: LOCATION_NULL, y: 0, z: 0 }
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        self.x == LOCATION_NULL
    }

    #[inline]
    pub const fn xy(self) -> CoordsXY {
        CoordsXY::new(self.x, self.y)
    }
}

impl std::fmt::Display for CoordsXYZ {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{},{},{}]", self.x, self.y, self.z)
    }
}

// ----------------------------------------------
// Rotation
// ----------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum RotationDirection {
    Clockwise,
    AntiClockwise,
}

impl RotationDirection {
    #[inline]
    pub const fn step(self) -> i32 {
        match self {
            Self::Clockwise     =>  1,
            Self::AntiClockwise => -1,
        }
    }
}

// One of the 4 isometric camera orientations, always in [0,3].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rotation(u8);

impl Rotation {
    pub const ALL: [Rotation; 4] = [Rotation(0), Rotation(1), Rotation(2), Rotation(3)];

    #[inline]
    pub const fn new(value: u8) -> Self {
        Self(value & 3)
    }

    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    // Rotates a single 90 degree step.
    #[inline]
    #[must_use]
    pub const fn rotated(self, direction: RotationDirection) -> Self {
        Self(((self.0 as i32 + direction.step()) & 3) as u8)
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}

// ----------------------------------------------
// ZoomLevel
// ----------------------------------------------

// Signed log2 zoom. 0 = 1:1, positive = zoomed out (one screen pixel
// covers 2^zoom projected pixels), negative = zoomed in.
// Always within MIN..=MAX.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i8")]
pub struct ZoomLevel(i8);

impl ZoomLevel {
    pub const MIN: ZoomLevel = ZoomLevel(-2);
    pub const MAX: ZoomLevel = ZoomLevel(3);

    #[inline]
    pub const fn new(level: i8) -> Self {
        if level < Self::MIN.0 {
            Self::MIN
        } else if level > Self::MAX.0 {
            Self::MAX
        } else {
            Self(level)
        }
    }

    #[inline]
    pub const fn value(self) -> i8 {
        self.0
    }

    #[inline]
    const fn factor(self) -> i32 {
        1 << self.0.unsigned_abs()
    }

    // Screen distance -> projected distance.
    // Floor division when zoomed in, so both directions agree with an arithmetic shift.
    #[inline]
    pub const fn scale_up(self, value: i32) -> i32 {
        if self.0 >= 0 {
            value * self.factor()
        } else {
            value.div_euclid(self.factor())
        }
    }

    // Projected distance -> screen distance.
    #[inline]
    pub const fn scale_down(self, value: i32) -> i32 {
        if self.0 >= 0 {
            value.div_euclid(self.factor())
        } else {
            value * self.factor()
        }
    }

    // Mask that snaps projected coordinates to whole screen pixels at this zoom.
    // Zoomed-in levels have sub-pixel projected steps, so nothing is masked.
    #[inline]
    pub const fn granularity_mask(self) -> i32 {
        if self.0 > 0 {
            !(self.factor() - 1)
        } else {
            !0
        }
    }

    #[inline]
    pub const fn align(self, value: i32) -> i32 {
        value & self.granularity_mask()
    }

    #[inline]
    #[must_use]
    pub const fn zoomed_in(self) -> Self {
        Self::new(self.0 - 1)
    }

    #[inline]
    #[must_use]
    pub const fn zoomed_out(self) -> Self {
        Self::new(self.0 + 1)
    }

    #[inline]
    #[must_use]
    pub fn clamp(self, min: Self, max: Self) -> Self {
        Self(self.0.clamp(min.0, max.0.max(min.0)))
    }
}

impl From<i8> for ZoomLevel {
    #[inline]
    fn from(level: i8) -> Self {
        Self::new(level)
    }
}

impl std::fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Z{}", self.0)
    }
}

// +--------------------------------------------------------+
// |          COORDINATE SPACE TRANSFORMS REFERENCE         |
// +--------------------------------------------------------+
// | Operation                    | Function                |
// | ---------------------------- | ----------------------- |
// | World XYZ -> Projected       | world_to_screen()       |
// | Projected + Z -> World XY    | viewport_pos_to_map_pos()|
// | World XYZ -> View origin     | centre_view_at()        |
// | Screen -> Projected          | Viewport::screen_to_viewport() |
// | World XY -> Tile side (0-3)  | map_get_tile_side()     |
// | World XY -> Quadrant (0-3)   | map_get_tile_quadrant() |
// +--------------------------------------------------------+
//
// Projection per rotation (">> 1" is an arithmetic shift):
//   R0: sx =  y - x   sy = ( y + x >> 1) - z
//   R1: sx = -y - x   sy = ( y - x >> 1) - z
//   R2: sx = -y + x   sy = (-y - x >> 1) - z
//   R3: sx =  y + x   sy = (-y + x >> 1) - z
// Stepping rotation by one is the same as feeding (y, -x) to the previous one.

#[inline]
pub fn world_to_screen(pos: CoordsXYZ, rotation: Rotation) -> ScreenCoords {
    if pos.is_null() {
        return ScreenCoords::null();
    }

    let CoordsXYZ { x, y, z } = pos;
    match rotation.value() {
        0 => ScreenCoords::new( y - x, (( y + x) >> 1) - z),
        1 => ScreenCoords::new(-y - x, (( y - x) >> 1) - z),
        2 => ScreenCoords::new(-y + x, ((-y - x) >> 1) - z),
        _ => ScreenCoords::new( y + x, ((-y + x) >> 1) - z),
    }
}

// Inverse of world_to_screen for an assumed height `z`.
// Halving truncates towards zero; round trips are exact to within 1 unit.
#[inline]
pub fn viewport_pos_to_map_pos(projected: ScreenCoords, z: i32, rotation: Rotation) -> CoordsXY {
    if projected.is_null() {
        return CoordsXY::null();
    }

    let ScreenCoords { x, y } = projected;
    match rotation.value() {
        0 => CoordsXY::new(-x / 2 + y + z,  x / 2 + y + z),
        1 => CoordsXY::new(-x / 2 - y - z, -x / 2 + y + z),
        2 => CoordsXY::new( x / 2 - y - z, -x / 2 - y - z),
        _ => CoordsXY::new( x / 2 + y + z,  x / 2 - y - z),
    }
}

// View origin that puts `pos` at the centre of a view of `view_size` projected pixels.
#[inline]
pub fn centre_view_at(pos: CoordsXYZ, rotation: Rotation, view_size: Size) -> ScreenCoords {
    if pos.is_null() {
        return ScreenCoords::null();
    }

    let projected = world_to_screen(pos, rotation);
    let half = view_size.half();
    ScreenCoords::new(projected.x - half.width, projected.y - half.height)
}

// Nearest tile edge (0-3), found by splitting the tile along both diagonals.
#[inline]
pub fn map_get_tile_side(pos: CoordsXY) -> u8 {
    let sub = pos.tile_offset();
    if sub.x < sub.y {
        if sub.x + sub.y < COORDS_XY_STEP { 0 } else { 1 }
    } else {
        if sub.x + sub.y < COORDS_XY_STEP { 3 } else { 2 }
    }
}

#[inline]
pub fn map_get_tile_quadrant(pos: CoordsXY) -> u8 {
    let sub = pos.tile_offset();
    if sub.x > 16 {
        if sub.y < 16 { 1 } else { 0 }
    } else {
        if sub.y < 16 { 2 } else { 3 }
    }
}
