use std::path::Path;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display, EnumCount, EnumIter};

use crate::{
    log,
    engine::config::{Configs, ViewportConfigs},
    map::{EntityId, EntityLookup},
    render::{PaintPrimitive, dirty::DirtyBlockGrid},
    utils::{
        Rect,
        Size,
        coords::{CoordsXYZ, Rotation, ScreenCoords, ZoomLevel},
    },
    window::{Window, WindowClass, WindowFlags, WindowNumber, WindowStack},
};

use super::{SavedView, Viewport, ViewportFlags, ViewportId, ViewportTable};

// ----------------------------------------------
// ViewportFocus
// ----------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ViewportFocus {
    Coordinate(CoordsXYZ),
    // Entity focus starts at zoom 0, clamped by the config, and follows the entity.
    Entity(EntityId),
}

// ----------------------------------------------
// Overlay / VisibilityMode
// ----------------------------------------------

// Reference counted overlays drawn on the main viewport while any tool wants them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumCount, EnumIter)]
pub enum Overlay {
    Gridlines,
    LandRights,
    ConstructionRights,
}

impl Overlay {
    #[inline]
    pub const fn flag(self) -> ViewportFlags {
        match self {
            Self::Gridlines          => ViewportFlags::Gridlines,
            Self::LandRights         => ViewportFlags::LandOwnership,
            Self::ConstructionRights => ViewportFlags::ConstructionRights,
        }
    }
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, IntoPrimitive, TryFromPrimitive)]
pub enum VisibilityMode {
    // Clears every see-through, height marker and cutaway flag.
    Reset = 0,
    #[num_enum(alternatives = [4])]
    UndergroundOn = 1,
    TrackHeightsOn = 2,
    #[num_enum(alternatives = [5])]
    UndergroundOff = 3,
}

// ----------------------------------------------
// ViewportSystem
// ----------------------------------------------

// Owns the window stack, the viewport slots and the dirty block grid.
// Map, entity and rendering collaborators are borrowed per call.
pub struct ViewportSystem {
    pub(super) configs: ViewportConfigs,
    pub(super) windows: WindowStack,
    pub(super) viewports: ViewportTable,
    pub(super) dirty_blocks: DirtyBlockGrid,
    pub(super) rotation: Rotation,
    pub(super) overlay_counts: [u32; 3],
    pub(super) saved_view: Option<SavedView>,
    pub(super) pick_scratch: Vec<PaintPrimitive>,
}

impl ViewportSystem {
    pub fn new(configs: ViewportConfigs, screen_size: Size) -> Self {
        log::set_level(configs.log_level);

        Self {
            viewports: ViewportTable::new(configs.max_viewports),
            configs,
            windows: WindowStack::new(),
            dirty_blocks: DirtyBlockGrid::new(screen_size),
            rotation: Rotation::default(),
            overlay_counts: [0; 3],
            saved_view: None,
            pick_scratch: Vec::new(),
        }
    }

    // Missing or malformed config files fall back to defaults.
    pub fn with_config_file(config_json_path: &Path, screen_size: Size) -> Self {
        Self::new(ViewportConfigs::load_file::<ViewportConfigs>(config_json_path), screen_size)
    }

    #[inline]
    pub fn configs(&self) -> &ViewportConfigs {
        &self.configs
    }

    #[inline]
    pub fn configs_mut(&mut self) -> &mut ViewportConfigs {
        &mut self.configs
    }

    #[inline]
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    #[inline]
    pub fn screen_size(&self) -> Size {
        self.dirty_blocks.screen_size()
    }

    pub fn resize_screen(&mut self, screen_size: Size) {
        self.dirty_blocks.resize(screen_size);
        self.windows.reset_visibilities(&mut self.viewports);
    }

    #[inline]
    pub fn windows(&self) -> &WindowStack {
        &self.windows
    }

    #[inline]
    pub fn viewports(&self) -> &ViewportTable {
        &self.viewports
    }

    #[inline]
    pub fn window(&self, number: WindowNumber) -> Option<&Window> {
        self.windows.get(number)
    }

    #[inline]
    pub fn window_mut(&mut self, number: WindowNumber) -> Option<&mut Window> {
        self.windows.get_mut(number)
    }

    #[inline]
    pub fn viewport(&self, id: ViewportId) -> Option<&Viewport> {
        self.viewports.get(id)
    }

    #[inline]
    pub fn viewport_mut(&mut self, id: ViewportId) -> Option<&mut Viewport> {
        self.viewports.get_mut(id)
    }

    #[inline]
    pub fn window_viewport(&self, number: WindowNumber) -> Option<&Viewport> {
        self.viewports.get(self.windows.get(number)?.viewport?)
    }

    #[inline]
    pub(super) fn window_viewport_mut(&mut self, number: WindowNumber) -> Option<&mut Viewport> {
        let id = self.windows.get(number)?.viewport?;
        self.viewports.get_mut(id)
    }

    #[inline]
    pub fn main_window(&self) -> Option<&Window> {
        self.windows.main()
    }

    #[inline]
    pub fn main_viewport(&self) -> Option<&Viewport> {
        self.window_viewport(self.windows.main()?.number)
    }

    #[inline]
    pub fn dirty_blocks(&self) -> &DirtyBlockGrid {
        &self.dirty_blocks
    }

    #[inline]
    pub fn take_dirty_rects(&mut self) -> Vec<Rect> {
        self.dirty_blocks.take_dirty_rects()
    }

    #[inline]
    pub fn saved_view(&self) -> Option<SavedView> {
        self.saved_view
    }

    // ----------------------
    // Windows:
    // ----------------------

    pub fn open_window(&mut self, class: WindowClass, rect: Rect, flags: WindowFlags) -> WindowNumber {
        let number = self.windows.open(class, rect, flags);
        self.windows.reset_visibilities(&mut self.viewports);
        self.dirty_blocks.mark_dirty(rect);
        number
    }

    pub fn close_window(&mut self, number: WindowNumber) {
        self.close_viewport(number);

        if let Some(window) = self.windows.close(number) {
            self.windows.reset_visibilities(&mut self.viewports);
            self.dirty_blocks.mark_dirty(window.rect);
        }
    }

    pub fn bring_to_front(&mut self, number: WindowNumber) {
        if self.windows.bring_to_front(number) {
            self.windows.reset_visibilities(&mut self.viewports);
        }
        self.invalidate_window(number);
    }

    // ----------------------
    // Viewports:
    // ----------------------

    pub fn create_viewport(&mut self,
                           entities: &dyn EntityLookup,
                           number: WindowNumber,
                           pos: ScreenCoords,
                           size: Size,
                           zoom: ZoomLevel,
                           focus: ViewportFocus) -> Option<ViewportId> {
        if self.windows.get(number).is_none() {
            log::error!(log::channel!("viewport"), "Cannot create viewport for unknown {number}.");
            return None;
        }

        let zoom = match focus {
            ViewportFocus::Coordinate(_) => self.configs.clamp_zoom(zoom),
            ViewportFocus::Entity(_) => self.configs.clamp_zoom(ZoomLevel::default()),
        };

        let mut viewport = Viewport::new(number, pos, size, zoom, self.rotation);
        if self.configs.always_show_gridlines {
            viewport.flags |= ViewportFlags::Gridlines;
        }

        let (centre, target_entity) = match focus {
            ViewportFocus::Coordinate(centre) => (centre, None),
            ViewportFocus::Entity(entity) => (entities.entity_position(entity).unwrap_or(CoordsXYZ::null()), Some(entity)),
        };

        let centre = if centre.is_null() {
            log::warn!(log::channel!("viewport"), "Viewport focus of {number} has no location, centring on the map origin.");
            CoordsXYZ::default()
        } else {
            centre
        };

        let view_pos = viewport.centre_view_at(centre);
        viewport.view_pos = view_pos;

        // Replacing a viewport frees the old slot first.
        self.close_viewport(number);

        let Some(id) = self.viewports.insert(viewport) else {
            log::error!(log::channel!("viewport"), "No more viewport slots left to allocate ({} in use).", self.viewports.len());
            return None;
        };

        if let Some(window) = self.windows.get_mut(number) {
            window.viewport = Some(id);
            window.target_entity = target_entity;
            window.saved_view = view_pos;
        }

        self.windows.reset_visibilities(&mut self.viewports);

        log::verbose!(log::channel!("viewport"), "Created {id} for {number} at {pos}, {size}, {zoom}.");
        Some(id)
    }

    pub fn close_viewport(&mut self, number: WindowNumber) {
        let Some(window) = self.windows.get_mut(number) else {
            return;
        };

        let Some(id) = window.viewport.take() else {
            return;
        };

        window.target_entity = None;

        if self.viewports.remove(id).is_some() {
            log::verbose!(log::channel!("viewport"), "Closed {id} of {number}.");
        }
    }

    // ----------------------
    // Main viewport state:
    // ----------------------

    pub fn set_saved_view(&mut self) {
        if let Some(viewport) = self.main_viewport() {
            self.saved_view = Some(SavedView {
                centre: viewport.view_centre(),
                zoom: viewport.zoom,
                rotation: self.rotation,
            });
        }
    }

    #[inline]
    pub fn overlay_count(&self, overlay: Overlay) -> u32 {
        self.overlay_counts[overlay as usize]
    }

    pub fn show_overlay(&mut self, overlay: Overlay) {
        if self.overlay_counts[overlay as usize] == 0 {
            self.update_main_viewport_flags(|flags| flags.insert(overlay.flag()));
        }
        self.overlay_counts[overlay as usize] += 1;
    }

    pub fn hide_overlay(&mut self, overlay: Overlay) {
        let count = &mut self.overlay_counts[overlay as usize];
        if *count == 0 {
            log::warn!(log::channel!("viewport"), "Unbalanced hide of {overlay} overlay.");
            return;
        }

        *count -= 1;
        if *count != 0 {
            return;
        }

        if overlay == Overlay::Gridlines && self.configs.always_show_gridlines {
            return;
        }

        self.update_main_viewport_flags(|flags| flags.remove(overlay.flag()));
    }

    #[inline] pub fn show_gridlines(&mut self) { self.show_overlay(Overlay::Gridlines); }
    #[inline] pub fn hide_gridlines(&mut self) { self.hide_overlay(Overlay::Gridlines); }
    #[inline] pub fn show_land_rights(&mut self) { self.show_overlay(Overlay::LandRights); }
    #[inline] pub fn hide_land_rights(&mut self) { self.hide_overlay(Overlay::LandRights); }
    #[inline] pub fn show_construction_rights(&mut self) { self.show_overlay(Overlay::ConstructionRights); }
    #[inline] pub fn hide_construction_rights(&mut self) { self.hide_overlay(Overlay::ConstructionRights); }

    pub fn set_visibility(&mut self, mode: VisibilityMode) {
        self.update_main_viewport_flags(|flags| match mode {
            VisibilityMode::Reset          => flags.remove(ViewportFlags::SEE_THROUGH_AND_HEIGHTS),
            VisibilityMode::UndergroundOn  => flags.insert(ViewportFlags::UndergroundInside),
            VisibilityMode::TrackHeightsOn => flags.insert(ViewportFlags::TrackHeights),
            VisibilityMode::UndergroundOff => flags.remove(ViewportFlags::UndergroundInside),
        });
    }

    // Applies `update` to the main viewport flags and invalidates the main
    // window if anything changed.
    fn update_main_viewport_flags<F>(&mut self, update: F)
        where F: FnOnce(&mut ViewportFlags)
    {
        let Some(main) = self.windows.main().map(|w| w.number) else {
            return;
        };

        let Some(viewport) = self.window_viewport_mut(main) else {
            return;
        };

        let before = viewport.flags;
        update(&mut viewport.flags);

        if viewport.flags != before {
            self.invalidate_window(main);
        }
    }
}

#[cfg(test)]
mod tests;
