use super::*;
use crate::{
    map::TileElementKind,
    testing::{TestEntities, test_system},
    utils::{
        Size,
        coords::{Rotation, ScreenCoords, ZoomLevel},
    },
    viewport::system::{ViewportFocus, ViewportSystem},
    window::{WindowClass, WindowFlags},
};

const SCREEN: Size = Size::new(640, 480);

// Full screen main viewport, view origin at (-320, 784).
fn system_with_main() -> (ViewportSystem, ViewportId) {
    let mut system = test_system(SCREEN);
    let main = system.open_window(WindowClass::Main, Rect::from_pos_and_size(0, 0, SCREEN), WindowFlags::StickToBack);
    let id = system.create_viewport(
        &TestEntities::default(),
        main,
        ScreenCoords::zero(),
        SCREEN,
        ZoomLevel::default(),
        ViewportFocus::Coordinate(CoordsXYZ::new(1024, 1024, 0))).unwrap();
    system.take_dirty_rects();
    (system, id)
}

// 100x100 zoom 1 viewport at (100, 100) looking at projected (0, 0).
fn open_guest(system: &mut ViewportSystem) -> (WindowNumber, ViewportId) {
    let guest = system.open_window(WindowClass::Guest, Rect::new(100, 100, 200, 200), WindowFlags::empty());
    let id = system.create_viewport(
        &TestEntities::default(),
        guest,
        ScreenCoords::new(100, 100),
        Size::new(100, 100),
        ZoomLevel::default(),
        ViewportFocus::Coordinate(CoordsXYZ::default())).unwrap();

    let viewport = system.viewport_mut(id).unwrap();
    viewport.set_zoom(ZoomLevel::new(1));
    viewport.view_pos = ScreenCoords::zero();

    system.take_dirty_rects();
    (guest, id)
}

#[test]
fn test_projected_rect_maps_to_screen_blocks() {
    let (mut system, id) = system_with_main();

    system.invalidate_viewport(id, Rect::new(-320, 784, -256, 792));
    assert_eq!(system.take_dirty_rects(), [Rect::new(0, 0, 64, 8)]);

    system.invalidate_viewport_full(id);
    assert_eq!(system.take_dirty_rects(), [Rect::new(0, 0, 640, 480)]);
}

#[test]
fn test_rects_are_clipped_to_the_view() {
    let (mut system, id) = system_with_main();

    system.invalidate_viewport(id, Rect::new(-400, 700, -300, 800));
    assert_eq!(system.take_dirty_rects(), [Rect::new(0, 0, 64, 16)]);

    // Beyond each edge of the view.
    system.invalidate_viewport(id, Rect::new(-500, 0, -320, 784));
    system.invalidate_viewport(id, Rect::new(320, 800, 400, 900));
    system.invalidate_viewport(id, Rect::new(0, 1264, 10, 1300));
    assert!(!system.dirty_blocks().has_dirty_blocks());
}

#[test]
fn test_zoomed_rects_are_scaled_down() {
    let (mut system, _) = system_with_main();
    let (_, id) = open_guest(&mut system);

    system.invalidate_viewport(id, Rect::new(64, 16, 128, 32));
    // Screen (132, 108, 164, 116), rounded out to blocks.
    assert_eq!(system.take_dirty_rects(), [Rect::new(128, 104, 192, 120)]);
}

#[test]
fn test_covered_viewports_are_skipped() {
    let (mut system, main_id) = system_with_main();
    let (_, id) = open_guest(&mut system);

    system.open_window(WindowClass::Dialog, Rect::new(0, 0, 640, 480), WindowFlags::empty());
    system.take_dirty_rects();

    system.invalidate_viewport(id, Rect::new(0, 0, 200, 200));
    assert!(!system.dirty_blocks().has_dirty_blocks());
    assert_eq!(system.viewport(id).unwrap().visibility, Visibility::Covered);

    // The main viewport is never skipped.
    system.invalidate_viewport(main_id, Rect::new(-320, 784, -256, 792));
    assert_eq!(system.take_dirty_rects(), [Rect::new(0, 0, 64, 8)]);
}

#[test]
fn test_invalidate_all_viewports() {
    let (mut system, _) = system_with_main();
    open_guest(&mut system);

    // Only the guest view reaches up to projected (0, 0).
    system.invalidate_all_viewports(Rect::new(0, 0, 10, 10));
    assert_eq!(system.take_dirty_rects(), [Rect::new(64, 96, 128, 112)]);

    // Both views.
    system.invalidate_all_viewports(Rect::new(-320, 0, 320, 1264));
    assert_eq!(system.take_dirty_rects(), [Rect::new(0, 0, 640, 480)]);
}

#[test]
fn test_invalidate_tile() {
    let (mut system, _) = system_with_main();

    // Tile centre (1040, 1040, 0) projects to (0, 1040), screen (320, 256).
    system.invalidate_tile(CoordsXY::new(1030, 1050), 0, 16);
    let once = system.take_dirty_rects();
    assert_eq!(once, [Rect::new(256, 208, 384, 288)]);

    system.invalidate_tile(CoordsXY::new(1024, 1024), 0, 16);
    system.invalidate_tile(CoordsXY::new(1024, 1024), 0, 16);
    assert_eq!(system.take_dirty_rects(), once);
}

#[test]
fn test_invalidate_element_spans_its_heights() {
    let (mut system, _) = system_with_main();

    let mut element = TileElement::new(TileElementKind::Surface, 0);
    element.clearance_height = 2;
    system.invalidate_element(CoordsXY::new(1030, 1050), &element);
    assert_eq!(system.take_dirty_rects(), [Rect::new(256, 208, 384, 288)]);
}

#[test]
fn test_null_tiles_invalidate_nothing() {
    let (mut system, id) = system_with_main();
    let element = TileElement::new(TileElementKind::Path, 4);

    for rotation in Rotation::ALL {
        for zoom in -2..=3 {
            let viewport = system.viewport_mut(id).unwrap();
            viewport.rotation = rotation;
            viewport.set_zoom(ZoomLevel::new(zoom));

            system.invalidate_tile(CoordsXY::null(), 0, 16);
            system.invalidate_element(CoordsXY::null(), &element);
            assert!(!system.dirty_blocks().has_dirty_blocks(), "{rotation} zoom {zoom}");
        }
    }
}

#[test]
fn test_invalidate_window_and_stale_ids() {
    let (mut system, id) = system_with_main();
    let (guest, guest_id) = open_guest(&mut system);

    system.invalidate_window(guest);
    assert_eq!(system.take_dirty_rects(), [Rect::new(64, 96, 256, 200)]);

    system.close_window(guest);
    system.take_dirty_rects();
    system.invalidate_viewport(guest_id, Rect::new(0, 0, 200, 200));
    system.invalidate_window(guest);
    assert!(!system.dirty_blocks().has_dirty_blocks());

    assert!(system.viewport(id).is_some());
}
