// Test doubles shared by the unit tests.

use std::collections::HashMap;
use image::{GrayImage, Luma};

use crate::{
    engine::config::ViewportConfigs,
    log,
    map::{EntityId, EntityLookup, TileElement, TileMap},
    render::{
        DrawPixelInfo,
        PaintBackend,
        PaintPrimitive,
        ScreenBackend,
        sprite::{ImageId, Sprite, SpriteSheet},
    },
    utils::{
        Rect,
        Size,
        coords::{COORDS_XY_STEP, CoordsXY, CoordsXYZ, Rotation},
    },
    viewport::{ViewportFlags, camera::ShiftOp, system::ViewportSystem},
};

pub fn test_system(screen: Size) -> ViewportSystem {
    test_system_with(ViewportConfigs::default(), screen)
}

pub fn test_system_with(configs: ViewportConfigs, screen: Size) -> ViewportSystem {
    ViewportSystem::new(ViewportConfigs { log_level: log::Level::Error, ..configs }, screen)
}

// ----------------------------------------------
// TestMap
// ----------------------------------------------

pub struct TestMap {
    size_in_tiles: i32,
    height: i32,
    tile_heights: HashMap<(i32, i32), i32>,
    elements: HashMap<(i32, i32), Vec<TileElement>>,
}

impl TestMap {
    pub fn flat(size_in_tiles: i32, height: i32) -> Self {
        Self {
            size_in_tiles,
            height,
            tile_heights: HashMap::new(),
            elements: HashMap::new(),
        }
    }

    pub fn set_tile_height(&mut self, tile_x: i32, tile_y: i32, height: i32) {
        self.tile_heights.insert((tile_x, tile_y), height);
    }

    pub fn push_element(&mut self, tile_x: i32, tile_y: i32, element: TileElement) -> u16 {
        let stack = self.elements.entry((tile_x, tile_y)).or_default();
        stack.push(element);
        (stack.len() - 1) as u16
    }

    fn tile_of(pos: CoordsXY) -> (i32, i32) {
        (pos.x.div_euclid(COORDS_XY_STEP), pos.y.div_euclid(COORDS_XY_STEP))
    }
}

impl TileMap for TestMap {
    fn size_in_tiles(&self) -> i32 {
        self.size_in_tiles
    }

    fn height_at(&self, pos: CoordsXY) -> i32 {
        let tile = Self::tile_of(pos);
        if tile.0 < 0 || tile.1 < 0 || tile.0 >= self.size_in_tiles || tile.1 >= self.size_in_tiles {
            return 0;
        }
        self.tile_heights.get(&tile).copied().unwrap_or(self.height)
    }

    fn elements_at(&self, pos: CoordsXY) -> &[TileElement] {
        self.elements.get(&Self::tile_of(pos)).map_or(&[], |stack| stack.as_slice())
    }
}

// ----------------------------------------------
// TestEntities
// ----------------------------------------------

#[derive(Default)]
pub struct TestEntities {
    pub positions: HashMap<EntityId, CoordsXYZ>,
}

impl TestEntities {
    pub fn with(id: EntityId, pos: CoordsXYZ) -> Self {
        let mut entities = Self::default();
        entities.positions.insert(id, pos);
        entities
    }
}

impl EntityLookup for TestEntities {
    fn entity_position(&self, id: EntityId) -> Option<CoordsXYZ> {
        self.positions.get(&id).copied()
    }
}

// ----------------------------------------------
// ScriptedPaint
// ----------------------------------------------

// Hands out a fixed primitive list and records every call it receives.
#[derive(Default)]
pub struct ScriptedPaint {
    pub sheet: SpriteSheet,
    pub primitives: Vec<PaintPrimitive>,
    pub cleared: Vec<(DrawPixelInfo, u8)>,
    pub columns: Vec<(DrawPixelInfo, ViewportFlags, Rotation)>,
    pub gloomed: Vec<DrawPixelInfo>,
    pub arranged: Vec<DrawPixelInfo>,
}

impl ScriptedPaint {
    pub fn new() -> Self {
        Self::default()
    }

    // Fully opaque rectangle anchored at its top left corner.
    pub fn add_solid_sprite(&mut self, index: u32, width: u32, height: u32) -> ImageId {
        let image = GrayImage::from_pixel(width, height, Luma([1]));
        self.sheet.insert(index, Sprite::from_bitmap(image, Default::default()))
    }
}

impl PaintBackend for ScriptedPaint {
    fn sprites(&self) -> &SpriteSheet {
        &self.sheet
    }

    fn clear(&mut self, dpi: &DrawPixelInfo, palette_index: u8) {
        self.cleared.push((*dpi, palette_index));
    }

    fn paint_column(&mut self, dpi: &DrawPixelInfo, flags: ViewportFlags, rotation: Rotation) {
        self.columns.push((*dpi, flags, rotation));
    }

    fn apply_weather_gloom(&mut self, dpi: &DrawPixelInfo) {
        self.gloomed.push(*dpi);
    }

    fn arrange(&mut self, dpi: &DrawPixelInfo, _flags: ViewportFlags, _rotation: Rotation, out: &mut Vec<PaintPrimitive>) {
        self.arranged.push(*dpi);
        out.extend(self.primitives.iter().cloned());
    }
}

// ----------------------------------------------
// RecordingScreen
// ----------------------------------------------

pub struct RecordingScreen {
    pub size: Size,
    pub dirty_optimisations: bool,
    pub ops: Vec<ShiftOp>,
}

impl RecordingScreen {
    pub fn new(size: Size) -> Self {
        Self { size, dirty_optimisations: true, ops: Vec::new() }
    }

    pub fn draws(&self) -> Vec<Rect> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                ShiftOp::Draw(rect) => Some(*rect),
                ShiftOp::Copy { .. } => None,
            })
            .collect()
    }

    pub fn copies(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, ShiftOp::Copy { .. })).count()
    }
}

impl ScreenBackend for RecordingScreen {
    fn screen_size(&self) -> Size {
        self.size
    }

    fn has_dirty_optimisations(&self) -> bool {
        self.dirty_optimisations
    }

    fn copy_rect(&mut self, rect: Rect, dx: i32, dy: i32) {
        self.ops.push(ShiftOp::Copy { rect, dx, dy });
    }

    fn draw_region(&mut self, rect: Rect) {
        self.ops.push(ShiftOp::Draw(rect));
    }
}
