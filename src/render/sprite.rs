use std::collections::HashMap;
use std::path::Path;
use image::GrayImage;

use crate::{
    bitflags_with_display,
    utils::{floor2, coords::{ScreenCoords, ZoomLevel}},
};

use super::DrawPixelInfo;

// ----------------------------------------------
// ImageId
// ----------------------------------------------

// Sprite index in the low 19 bits, remap palette and draw-mode bits above.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ImageId(pub u32);

impl ImageId {
    pub const INDEX_MASK: u32 = 0x7FFFF;
    pub const REMAP: u32 = 1 << 29;
    pub const TRANSPARENT: u32 = 1 << 30;
    pub const REMAP_2_PLUS: u32 = 1 << 31;

    const PALETTE_SHIFT: u32 = 19;
    const PALETTE_MASK: u32 = 0x7F;

    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index & Self::INDEX_MASK)
    }

    #[inline]
    #[must_use]
    pub const fn with_remap(self, palette: u8) -> Self {
        let bits = self.0 & !(Self::PALETTE_MASK << Self::PALETTE_SHIFT);
        Self(bits | Self::REMAP | (((palette as u32) & Self::PALETTE_MASK) << Self::PALETTE_SHIFT))
    }

    #[inline]
    #[must_use]
    pub const fn with_flags(self, flags: u32) -> Self {
        Self(self.0 | flags)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0 & Self::INDEX_MASK
    }

    #[inline]
    pub const fn is_remap(self) -> bool {
        (self.0 & Self::REMAP) != 0
    }

    #[inline]
    pub const fn is_transparent(self) -> bool {
        (self.0 & Self::TRANSPARENT) != 0
    }

    #[inline]
    pub const fn remap_palette(self) -> usize {
        let palette = (self.0 >> Self::PALETTE_SHIFT) & Self::PALETTE_MASK;
        if (self.0 & Self::REMAP_2_PLUS) != 0 {
            (palette & 0x1F) as usize
        } else {
            palette as usize
        }
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "img#{}", self.index())
    }
}

// ----------------------------------------------
// Sprite
// ----------------------------------------------

bitflags_with_display! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct SpriteFlags: u16 {
        const Bmp            = 1 << 0;
        const Rle            = 1 << 2;
        const HasZoomSprite  = 1 << 4;
        const NoZoomDraw     = 1 << 5;
    }
}

// Palette indexed pixels. Index 0 is transparent.
#[derive(Clone, Debug, PartialEq)]
pub enum SpritePixels {
    Bitmap(GrayImage),
    // Row offset table (u16 LE per row) followed by runs of
    // [count | 0x80 on last run, x start, count pixels].
    Rle(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    pub width: i32,
    pub height: i32,
    // Drawn at anchor + offset.
    pub x_offset: i32,
    pub y_offset: i32,
    pub flags: SpriteFlags,
    // Distance back to the half-size version of this sprite, if HasZoomSprite.
    pub zoomed_offset: u32,
    pub pixels: SpritePixels,
}

impl Sprite {
    pub fn from_bitmap(image: GrayImage, offset: ScreenCoords) -> Self {
        Self {
            width: image.width() as i32,
            height: image.height() as i32,
            x_offset: offset.x,
            y_offset: offset.y,
            flags: SpriteFlags::Bmp,
            zoomed_offset: 0,
            pixels: SpritePixels::Bitmap(image),
        }
    }

    pub fn rle_from_bitmap(image: &GrayImage, offset: ScreenCoords) -> Result<Self, String> {
        Ok(Self {
            width: image.width() as i32,
            height: image.height() as i32,
            x_offset: offset.x,
            y_offset: offset.y,
            flags: SpriteFlags::Rle,
            zoomed_offset: 0,
            pixels: SpritePixels::Rle(encode_rle(image)?),
        })
    }

    // Loads any image format the `image` crate understands, using its luma
    // channel as the palette index.
    pub fn load_bitmap(path: &Path, offset: ScreenCoords) -> Result<Self, String> {
        let image = image::open(path).map_err(|err| format!("Failed to load sprite {path:?}: {err}"))?;
        Ok(Self::from_bitmap(image.to_luma8(), offset))
    }

    #[inline]
    #[must_use]
    pub fn with_flags(mut self, flags: SpriteFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_zoomed_offset(mut self, zoomed_offset: u32) -> Self {
        self.flags |= SpriteFlags::HasZoomSprite;
        self.zoomed_offset = zoomed_offset;
        self
    }

    #[inline]
    pub fn is_rle(&self) -> bool {
        matches!(self.pixels, SpritePixels::Rle(_))
    }
}

// ----------------------------------------------
// RLE encoding
// ----------------------------------------------

const RLE_LAST_RUN: u8 = 0x80;
const RLE_MAX_RUN: u32 = 0x7F;

pub fn encode_rle(image: &GrayImage) -> Result<Vec<u8>, String> {
    if image.width() > 256 {
        return Err(format!("RLE sprites are limited to 256 pixels wide, got {}", image.width()));
    }

    let row_count = image.height() as usize;
    let mut rows: Vec<Vec<u8>> = Vec::with_capacity(row_count);

    for y in 0..image.height() {
        let mut row = Vec::new();
        let mut x = 0;

        while x < image.width() {
            if image.get_pixel(x, y)[0] == 0 {
                x += 1;
                continue;
            }

            let start = x;
            while x < image.width() && image.get_pixel(x, y)[0] != 0 && (x - start) < RLE_MAX_RUN {
                x += 1;
            }

            row.push((x - start) as u8);
            row.push(start as u8);
            row.extend((start..x).map(|px| image.get_pixel(px, y)[0]));
        }

        if row.is_empty() {
            row.extend([RLE_LAST_RUN, 0]);
        } else {
            // Flag the last run of the row.
            let mut last_run = 0;
            let mut cursor = 0;
            while cursor < row.len() {
                last_run = cursor;
                cursor += 2 + row[cursor] as usize;
            }
            row[last_run] |= RLE_LAST_RUN;
        }

        rows.push(row);
    }

    let table_size = row_count * 2;
    let mut data = Vec::with_capacity(table_size + rows.iter().map(Vec::len).sum::<usize>());
    let mut offset = table_size;

    for row in &rows {
        let offset16 = u16::try_from(offset).map_err(|_| "RLE sprite data exceeds 64KB".to_string())?;
        data.extend(offset16.to_le_bytes());
        offset += row.len();
    }

    for row in rows {
        data.extend(row);
    }

    Ok(data)
}

fn is_pixel_present_rle(data: &[u8], x: i32, row: i32, round: i32) -> bool {
    let table_index = row as usize * 2;
    let (Some(&lo), Some(&hi)) = (data.get(table_index), data.get(table_index + 1)) else {
        return false;
    };

    let mut cursor = u16::from_le_bytes([lo, hi]) as usize;

    loop {
        let (Some(&count_byte), Some(&gap_byte)) = (data.get(cursor), data.get(cursor + 1)) else {
            return false;
        };

        let is_last_run = (count_byte & RLE_LAST_RUN) != 0;
        let mut count = (count_byte & !RLE_LAST_RUN) as i32;
        let mut gap = gap_byte as i32;
        cursor += 2 + count as usize;

        // Zoomed out draws skip odd (and at zoom 2, non multiple of 4) columns.
        let mut skip = false;
        if round > 1 && gap % 2 != 0 {
            gap += 1;
            count -= 1;
            skip = count == 0;
        }
        if !skip && round == 4 && gap % 4 != 0 {
            gap += 2;
            count -= 2;
            skip = count <= 0;
        }

        if !skip && x >= gap && x < gap + count {
            return true;
        }

        if is_last_run {
            return false;
        }
    }
}

// Offset of the pixel under the 1x1 target, given the sprite span starts
// `offset` pixels from it. None if the span misses the target.
#[inline]
fn clip_span(offset: i32, start: i32, extent: i32) -> Option<i32> {
    if offset > 0 || offset + extent <= 0 {
        return None;
    }
    Some(start - offset)
}

// ----------------------------------------------
// SpriteSheet
// ----------------------------------------------

#[derive(Default)]
pub struct SpriteSheet {
    sprites: HashMap<u32, Sprite>,
    remap_palettes: HashMap<usize, Box<[u8; 256]>>,
}

impl SpriteSheet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn insert(&mut self, index: u32, sprite: Sprite) -> ImageId {
        let image = ImageId::new(index);
        self.sprites.insert(image.index(), sprite);
        image
    }

    #[inline]
    pub fn get(&self, index: u32) -> Option<&Sprite> {
        self.sprites.get(&(index & ImageId::INDEX_MASK))
    }

    #[inline]
    pub fn set_remap_palette(&mut self, palette: usize, table: [u8; 256]) {
        self.remap_palettes.insert(palette, Box::new(table));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    // Whether `image` drawn at `pos` puts an opaque pixel on the 1x1 `dpi`.
    // The transparent draw flag is ignored; glass-like images are still pickable.
    pub fn is_pixel_present(&self, dpi: &DrawPixelInfo, image: ImageId, pos: ScreenCoords) -> bool {
        let palette = if image.is_remap() {
            // Missing palettes fall back to a plain index test.
            self.remap_palettes.get(&image.remap_palette()).map(|table| table.as_ref())
        } else {
            None
        };

        self.is_sprite_pixel_present(dpi, image.index(), pos, palette)
    }

    fn is_sprite_pixel_present(&self,
                               dpi: &DrawPixelInfo,
                               index: u32,
                               pos: ScreenCoords,
                               palette: Option<&[u8; 256]>) -> bool {
        let Some(sprite) = self.get(index) else {
            return false;
        };

        // Zoomed-in targets sample full resolution sprites.
        let zoom = dpi.zoom.value().max(0) as i32;

        if zoom != 0 {
            if sprite.flags.contains(SpriteFlags::NoZoomDraw) {
                return false;
            }

            if sprite.flags.contains(SpriteFlags::HasZoomSprite) {
                let zoomed_dpi = DrawPixelInfo {
                    x: dpi.x >> 1,
                    y: dpi.y >> 1,
                    zoom: ZoomLevel::new((zoom - 1) as i8),
                    ..*dpi
                };
                let zoomed_pos = ScreenCoords::new(pos.x / 2, pos.y / 2);
                return self.is_sprite_pixel_present(&zoomed_dpi, index.wrapping_sub(sprite.zoomed_offset), zoomed_pos, palette);
            }
        }

        let round = 1 << zoom;

        let mut y = pos.y;
        if sprite.is_rle() {
            y -= round - 1;
        }
        y += sprite.y_offset;

        let mut y_start = 0;
        let mut height = sprite.height;
        if zoom != 0 {
            if height % 2 != 0 {
                height -= 1;
                y_start += 1;
            }
            if zoom == 2 && height % 4 != 0 {
                height -= 2;
                y_start += 2;
            }
            if height == 0 {
                return false;
            }
        }

        let Some(row) = clip_span(floor2(y, round) - dpi.y, y_start, height) else {
            return false;
        };

        let x = floor2(pos.x + sprite.x_offset, round);
        let Some(column) = clip_span(x - dpi.x, 0, sprite.width) else {
            return false;
        };

        match &sprite.pixels {
            SpritePixels::Rle(data) => is_pixel_present_rle(data, column, row, round),
            SpritePixels::Bitmap(image) => {
                let Some(pixel) = image.get_pixel_checked(column as u32, row as u32) else {
                    return false;
                };
                let palette_index = pixel[0];
                match palette {
                    Some(table) => table[palette_index as usize] != 0,
                    None => palette_index != 0,
                }
            }
        }
    }
}
