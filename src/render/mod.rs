use smallvec::SmallVec;

use crate::{
    map::TileElementRef,
    utils::{
        Rect,
        Size,
        coords::{CoordsXY, Rotation, ScreenCoords, ZoomLevel},
    },
    viewport::ViewportFlags,
};

use sprite::{ImageId, SpriteSheet};

pub mod dirty;
pub mod sprite;

// ----------------------------------------------
// DrawPixelInfo
// ----------------------------------------------

// A rectangular target region inside a framebuffer.
// x/y/width/height are in projected pixels when `zoom` != 0, the framebuffer
// itself is always addressed in screen pixels through `bits` and `pitch`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DrawPixelInfo {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    // Offset of the region's first pixel into the framebuffer.
    pub bits: isize,
    // Pixels to skip at the end of each row.
    pub pitch: i32,
    pub zoom: ZoomLevel,
}

impl DrawPixelInfo {
    // The whole framebuffer, at 1:1.
    #[inline]
    pub fn screen(size: Size) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.width,
            height: size.height,
            bits: 0,
            pitch: 0,
            zoom: ZoomLevel::default(),
        }
    }

    // Single projected pixel, used by the interaction picker.
    #[inline]
    pub fn pixel(pos: ScreenCoords, zoom: ZoomLevel) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            width: 1,
            height: 1,
            bits: 0,
            pitch: 0,
            zoom,
        }
    }

    #[inline]
    pub fn stride(&self) -> i32 {
        self.width + self.pitch
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

impl std::fmt::Display for DrawPixelInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "(P:[{},{}], S:[{},{}], bits:{}, pitch:{}, {})",
               self.x, self.y, self.width, self.height, self.bits, self.pitch, self.zoom)
    }
}

// ----------------------------------------------
// PaintPrimitive
// ----------------------------------------------

// Extra image drawn relative to its parent primitive (e.g. a path railing).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AttachedImage {
    pub image: ImageId,
    pub offset: ScreenCoords,
}

// One sprite the paint backend would draw, plus what it belongs to in the world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaintPrimitive {
    pub image: ImageId,
    // Projected position the image is anchored at.
    pub pos: ScreenCoords,
    // Raw interaction kind byte, decoded by the picker.
    pub interaction: u8,
    pub map_pos: CoordsXY,
    pub element: Option<TileElementRef>,
    pub attached: SmallVec<[AttachedImage; 2]>,
}

impl PaintPrimitive {
    #[inline]
    pub fn new(image: ImageId, pos: ScreenCoords, interaction: u8, map_pos: CoordsXY) -> Self {
        Self {
            image,
            pos,
            interaction,
            map_pos,
            element: None,
            attached: SmallVec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_element(mut self, element: TileElementRef) -> Self {
        self.element = Some(element);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_attached(mut self, image: ImageId, offset: ScreenCoords) -> Self {
        self.attached.push(AttachedImage { image, offset });
        self
    }
}

// ----------------------------------------------
// PaintBackend
// ----------------------------------------------

// World painter. Knows how to rasterize the map into a column and how to
// produce the sorted list of primitives it would draw for that column.
pub trait PaintBackend {
    fn sprites(&self) -> &SpriteSheet;

    fn clear(&mut self, dpi: &DrawPixelInfo, palette_index: u8);

    fn paint_column(&mut self, dpi: &DrawPixelInfo, flags: ViewportFlags, rotation: Rotation);

    fn apply_weather_gloom(&mut self, dpi: &DrawPixelInfo);

    // Appends the primitives covering `dpi` to `out`, in draw order (back to front).
    fn arrange(&mut self, dpi: &DrawPixelInfo, flags: ViewportFlags, rotation: Rotation, out: &mut Vec<PaintPrimitive>);
}

// ----------------------------------------------
// ScreenBackend
// ----------------------------------------------

// The presented framebuffer and whatever draws windows into it.
pub trait ScreenBackend {
    fn screen_size(&self) -> Size;

    // Whether already presented pixels survive between frames,
    // which makes blit-shifting a moved viewport worthwhile.
    fn has_dirty_optimisations(&self) -> bool;

    // Copies the pixels of `rect` by (dx, dy). Source pixels shifted outside `rect` are dropped.
    fn copy_rect(&mut self, rect: Rect, dx: i32, dy: i32);

    // Redraws every window intersecting `rect`, clipped to it.
    fn draw_region(&mut self, rect: Rect);
}
