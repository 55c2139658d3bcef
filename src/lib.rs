// NOTE: Allow these for the whole project.
#![allow(clippy::collapsible_if)]
#![allow(clippy::too_many_arguments)]

pub mod log;
pub mod engine;
pub mod map;
pub mod render;
pub mod utils;
pub mod viewport;
pub mod window;

#[cfg(test)]
mod testing;

pub use utils::coords::{
    CoordsXY,
    CoordsXYZ,
    Rotation,
    RotationDirection,
    ScreenCoords,
    ZoomLevel,
};

pub use viewport::{
    Viewport,
    ViewportFlags,
    ViewportId,
    interaction::{InteractionInfo, InteractionKind, InteractionMask, TilePick},
    system::ViewportSystem,
};
