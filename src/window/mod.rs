use strum_macros::{Display, EnumCount, EnumIter};

use crate::{
    bitflags_with_display,
    log,
    map::EntityId,
    utils::{Rect, Size, coords::ScreenCoords},
    viewport::{ViewportId, ViewportTable},
};

// ----------------------------------------------
// WindowNumber / WindowClass
// ----------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowNumber(pub u16);

impl std::fmt::Display for WindowNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumCount, EnumIter)]
pub enum WindowClass {
    Main,
    Viewport,
    Ride,
    Guest,
    Staff,
    Map,
    Toolbar,
    Tooltip,
    Dialog,
}

bitflags_with_display! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct WindowFlags: u32 {
        const StickToBack         = 1 << 0;
        const StickToFront        = 1 << 1;
        const NoScrolling         = 1 << 2;
        const ScrollingToLocation = 1 << 3;
        const Transparent         = 1 << 4;
        const NoBackground        = 1 << 5;
        const RedrawOnMove        = 1 << 7;
    }
}

// Cached occlusion state, shared by a window and its viewport.
// Recomputed lazily after any change to the window stack.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display)]
pub enum Visibility {
    #[default]
    Unknown,
    Visible,
    Covered,
}

// ----------------------------------------------
// Window
// ----------------------------------------------

#[derive(Clone, Debug)]
pub struct Window {
    pub number: WindowNumber,
    pub class: WindowClass,
    pub rect: Rect,
    pub flags: WindowFlags,
    pub viewport: Option<ViewportId>,
    // Projected view origin the camera snaps or eases towards.
    pub saved_view: ScreenCoords,
    pub target_entity: Option<EntityId>,
    pub visibility: Visibility,
}

impl Window {
    #[inline]
    pub fn new(number: WindowNumber, class: WindowClass, rect: Rect, flags: WindowFlags) -> Self {
        Self {
            number,
            class,
            rect,
            flags,
            viewport: None,
            saved_view: ScreenCoords::zero(),
            target_entity: None,
            visibility: Visibility::Unknown,
        }
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.rect.size()
    }

    #[inline]
    pub fn is_main(&self) -> bool {
        self.class == WindowClass::Main
    }

    #[inline]
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        self.rect.contains_point(x, y)
    }
}

// ----------------------------------------------
// WindowStack
// ----------------------------------------------

// Windows in paint order: index 0 is the back-most window.
#[derive(Default)]
pub struct WindowStack {
    windows: Vec<Window>,
    next_number: u16,
}

impl WindowStack {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Window> {
        self.windows.iter()
    }

    #[inline]
    pub fn at(&self, index: usize) -> Option<&Window> {
        self.windows.get(index)
    }

    #[inline]
    pub fn index_of(&self, number: WindowNumber) -> Option<usize> {
        self.windows.iter().position(|w| w.number == number)
    }

    #[inline]
    pub fn get(&self, number: WindowNumber) -> Option<&Window> {
        self.windows.iter().find(|w| w.number == number)
    }

    #[inline]
    pub fn get_mut(&mut self, number: WindowNumber) -> Option<&mut Window> {
        self.windows.iter_mut().find(|w| w.number == number)
    }

    #[inline]
    pub fn main(&self) -> Option<&Window> {
        self.windows.iter().find(|w| w.is_main())
    }

    // Stick-to-back windows stay below everything else,
    // stick-to-front windows above everything else.
    fn insert_position(&self, flags: WindowFlags) -> usize {
        if flags.contains(WindowFlags::StickToBack) {
            return self.windows
                .iter()
                .position(|w| !w.flags.contains(WindowFlags::StickToBack))
                .unwrap_or(self.windows.len());
        }

        if flags.contains(WindowFlags::StickToFront) {
            return self.windows.len();
        }

        self.windows
            .iter()
            .position(|w| w.flags.contains(WindowFlags::StickToFront))
            .unwrap_or(self.windows.len())
    }

    pub fn open(&mut self, class: WindowClass, rect: Rect, flags: WindowFlags) -> WindowNumber {
        let number = self.next_free_number();
        self.next_number = number.0.wrapping_add(1);

        let index = self.insert_position(flags);
        self.windows.insert(index, Window::new(number, class, rect, flags));
        number
    }

    // Numbers wrap around, skipping those still held by open windows.
    fn next_free_number(&self) -> WindowNumber {
        let start = self.next_number;
        let free = (0..=u16::MAX)
            .map(|step| WindowNumber(start.wrapping_add(step)))
            .find(|&number| self.get(number).is_none());

        free.unwrap_or_else(|| {
            log::error!(log::channel!("window"), "Every window number is in use, reusing {}.", WindowNumber(start));
            WindowNumber(start)
        })
    }

    pub fn close(&mut self, number: WindowNumber) -> Option<Window> {
        let index = self.index_of(number)?;
        Some(self.windows.remove(index))
    }

    // Returns false if the window was not moved.
    pub fn bring_to_front(&mut self, number: WindowNumber) -> bool {
        let Some(index) = self.index_of(number) else {
            return false;
        };

        let flags = self.windows[index].flags;
        if flags.intersects(WindowFlags::StickToBack | WindowFlags::StickToFront) {
            return false;
        }

        let window = self.windows.remove(index);
        let dest = self.insert_position(flags);
        self.windows.insert(dest, window);
        dest != index
    }

    // Topmost window under the point. Windows without a background only
    // take the point where they draw something, which is never, here.
    pub fn find_from_point(&self, x: i32, y: i32) -> Option<WindowNumber> {
        self.windows
            .iter()
            .rev()
            .find(|w| w.contains_point(x, y) && !w.flags.contains(WindowFlags::NoBackground))
            .map(|w| w.number)
    }

    pub fn reset_visibilities(&mut self, viewports: &mut ViewportTable) {
        for window in &mut self.windows {
            window.visibility = Visibility::Unknown;
        }
        for (_, viewport) in viewports.iter_mut() {
            viewport.visibility = Visibility::Unknown;
        }
    }

    // A window is covered when any single window above it fully contains it.
    // Windows without a viewport and the main window always count as visible.
    pub fn is_visible(&mut self, number: WindowNumber, viewports: &mut ViewportTable) -> bool {
        let Some(index) = self.index_of(number) else {
            return false;
        };

        match self.windows[index].visibility {
            Visibility::Visible => return true,
            Visibility::Covered => return false,
            Visibility::Unknown => {}
        }

        let window = &self.windows[index];
        let viewport_id = match window.viewport {
            Some(id) if !window.is_main() => id,
            _ => {
                self.windows[index].visibility = Visibility::Visible;
                return true;
            }
        };

        let rect = window.rect;
        let covered = self.windows[index + 1..]
            .iter()
            .any(|other| other.rect.contains_rect(&rect));

        let visibility = if covered { Visibility::Covered } else { Visibility::Visible };

        self.windows[index].visibility = visibility;
        if let Some(viewport) = viewports.get_mut(viewport_id) {
            viewport.visibility = visibility;
        }

        !covered
    }
}
