use slab::Slab;
use serde::{Deserialize, Serialize};

use crate::{
    bitflags_with_display,
    utils::{
        Rect,
        Size,
        coords::{self, CoordsXYZ, Rotation, ScreenCoords, ZoomLevel},
    },
    window::{Visibility, WindowNumber},
};

pub mod camera;
pub mod interaction;
pub mod invalidate;
pub mod paint;
pub mod system;

// ----------------------------------------------
// ViewportFlags
// ----------------------------------------------

bitflags_with_display! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ViewportFlags: u32 {
        const UndergroundInside   = 1 << 0;
        const SeeThroughRides     = 1 << 1;
        const SeeThroughScenery   = 1 << 2;
        const InvisibleSupports   = 1 << 3;
        const LandHeights         = 1 << 4;
        const TrackHeights        = 1 << 5;
        const PathHeights         = 1 << 6;
        const Gridlines           = 1 << 7;
        const LandOwnership       = 1 << 8;
        const ConstructionRights  = 1 << 9;
        const SoundOn             = 1 << 10;
        const InvisiblePeeps      = 1 << 11;
        const HideBase            = 1 << 12;
        const HideVertical        = 1 << 13;
        const InvisibleSprites    = 1 << 14;
        const SeeThroughPaths     = 1 << 16;
        const ClipView            = 1 << 17;
        const HighlightPathIssues = 1 << 18;
    }
}

impl ViewportFlags {
    // Views that cut away terrain: columns must be cleared before painting,
    // and the picker should trust paths it hits directly.
    pub const CUTAWAY_VIEW: Self = Self::UndergroundInside
        .union(Self::HideBase)
        .union(Self::HideVertical);

    pub const CLEARS_COLUMN: Self = Self::CUTAWAY_VIEW.union(Self::ClipView);

    pub const SEE_THROUGH_AND_HEIGHTS: Self = Self::UndergroundInside
        .union(Self::SeeThroughRides)
        .union(Self::SeeThroughScenery)
        .union(Self::SeeThroughPaths)
        .union(Self::InvisibleSupports)
        .union(Self::LandHeights)
        .union(Self::TrackHeights)
        .union(Self::PathHeights)
        .union(Self::InvisiblePeeps)
        .union(Self::HideBase)
        .union(Self::HideVertical);
}

// ----------------------------------------------
// Viewport
// ----------------------------------------------

// A camera onto the world, drawn into a rectangle of its owner window.
//
// Screen space is framebuffer pixels. Projected space is the isometric
// projection of the world at 1:1; `view_pos` and `view_size` live there
// and `view_size` is always `size` scaled up by `zoom`.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    pub owner: WindowNumber,
    pub pos: ScreenCoords,
    pub size: Size,
    pub view_pos: ScreenCoords,
    pub view_size: Size,
    pub zoom: ZoomLevel,
    pub rotation: Rotation,
    pub flags: ViewportFlags,
    pub visibility: Visibility,
}

impl Viewport {
    pub fn new(owner: WindowNumber, pos: ScreenCoords, size: Size, zoom: ZoomLevel, rotation: Rotation) -> Self {
        Self {
            owner,
            pos,
            size,
            view_pos: ScreenCoords::zero(),
            view_size: Self::scaled_view_size(size, zoom),
            zoom,
            rotation,
            flags: ViewportFlags::empty(),
            visibility: Visibility::Unknown,
        }
    }

    #[inline]
    fn scaled_view_size(size: Size, zoom: ZoomLevel) -> Size {
        Size::new(zoom.scale_up(size.width), zoom.scale_up(size.height))
    }

    #[inline]
    pub fn screen_rect(&self) -> Rect {
        Rect::from_pos_and_size(self.pos.x, self.pos.y, self.size)
    }

    #[inline]
    pub fn view_rect(&self) -> Rect {
        Rect::from_pos_and_size(self.view_pos.x, self.view_pos.y, self.view_size)
    }

    #[inline]
    pub fn contains_screen_point(&self, point: ScreenCoords) -> bool {
        self.screen_rect().contains_point(point.x, point.y)
    }

    // Screen pixel -> projected pixel.
    #[inline]
    pub fn screen_to_viewport(&self, screen: ScreenCoords) -> ScreenCoords {
        if screen.is_null() {
            return ScreenCoords::null();
        }
        let relative = screen - self.pos;
        ScreenCoords::new(self.zoom.scale_up(relative.x), self.zoom.scale_up(relative.y)) + self.view_pos
    }

    // View origin that centres this viewport on `pos`, in its own rotation.
    #[inline]
    pub fn centre_view_at(&self, pos: CoordsXYZ) -> ScreenCoords {
        coords::centre_view_at(pos, self.rotation, self.view_size)
    }

    #[inline]
    pub fn view_centre(&self) -> ScreenCoords {
        let half = self.view_size.half();
        self.view_pos + ScreenCoords::new(half.width, half.height)
    }

    #[inline]
    pub fn set_zoom(&mut self, zoom: ZoomLevel) {
        self.zoom = zoom;
        self.view_size = Self::scaled_view_size(self.size, zoom);
    }

    #[inline]
    pub fn set_size(&mut self, size: Size) {
        self.size = size;
        self.view_size = Self::scaled_view_size(size, self.zoom);
    }
}

// ----------------------------------------------
// ViewportId
// ----------------------------------------------

// Generation checked handle into the ViewportTable. A handle to a closed
// viewport never resolves, even after its slot is reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ViewportId {
    index: u32,
    generation: u32,
}

impl ViewportId {
    #[inline]
    fn new(index: usize, generation: u32) -> Option<Self> {
        debug_assert!(generation != 0);
        Some(Self { index: u32::try_from(index).ok()?, generation })
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl std::fmt::Display for ViewportId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "viewport#{}:{}", self.index, self.generation)
    }
}

// ----------------------------------------------
// ViewportTable
// ----------------------------------------------

pub struct ViewportTable {
    viewports: Slab<(u32, Viewport)>,
    generation: u32,
    capacity: usize,
}

impl ViewportTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            viewports: Slab::with_capacity(capacity),
            generation: 0,
            capacity,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.viewports.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.viewports.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.viewports.len() >= self.capacity
    }

    // None when every slot is taken.
    pub fn insert(&mut self, viewport: Viewport) -> Option<ViewportId> {
        if self.is_full() {
            return None;
        }

        self.generation = self.generation.wrapping_add(1).max(1);
        let index = self.viewports.insert((self.generation, viewport));

        let id = ViewportId::new(index, self.generation);
        if id.is_none() {
            self.viewports.remove(index);
        }
        id
    }

    pub fn remove(&mut self, id: ViewportId) -> Option<Viewport> {
        self.get(id)?;
        Some(self.viewports.remove(id.index()).1)
    }

    #[inline]
    pub fn get(&self, id: ViewportId) -> Option<&Viewport> {
        match self.viewports.get(id.index()) {
            Some((generation, viewport)) if *generation == id.generation => Some(viewport),
            _ => None,
        }
    }

    #[inline]
    pub fn get_mut(&mut self, id: ViewportId) -> Option<&mut Viewport> {
        match self.viewports.get_mut(id.index()) {
            Some((generation, viewport)) if *generation == id.generation => Some(viewport),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ViewportId, &Viewport)> {
        self.viewports
            .iter()
            .map(|(index, (generation, viewport))| (ViewportId { index: index as u32, generation: *generation }, viewport))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ViewportId, &mut Viewport)> {
        self.viewports
            .iter_mut()
            .map(|(index, (generation, viewport))| (ViewportId { index: index as u32, generation: *generation }, viewport))
    }
}

// ----------------------------------------------
// SavedView
// ----------------------------------------------

// Main camera state persisted with a saved park.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedView {
    pub centre: ScreenCoords,
    pub zoom: ZoomLevel,
    pub rotation: Rotation,
}
