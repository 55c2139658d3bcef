use super::*;
use crate::testing::{TestEntities, test_system, test_system_with};

const SCREEN: Size = Size::new(640, 480);

fn open_main(system: &mut ViewportSystem) -> WindowNumber {
    system.open_window(WindowClass::Main, Rect::from_pos_and_size(0, 0, SCREEN), WindowFlags::StickToBack)
}

fn main_with_viewport(system: &mut ViewportSystem) -> (WindowNumber, ViewportId) {
    let main = open_main(system);
    let id = system.create_viewport(
        &TestEntities::default(),
        main,
        ScreenCoords::zero(),
        SCREEN,
        ZoomLevel::default(),
        ViewportFocus::Coordinate(CoordsXYZ::new(1024, 1024, 0))).unwrap();
    system.take_dirty_rects();
    (main, id)
}

#[test]
fn test_create_viewport_centres_on_focus() {
    let mut system = test_system(SCREEN);
    let (main, id) = main_with_viewport(&mut system);

    let viewport = system.viewport(id).unwrap();
    assert_eq!(viewport.owner, main);
    // R0: (y - x, (x + y) / 2) = (0, 1024), minus half the view.
    assert_eq!(viewport.view_pos, ScreenCoords::new(-320, 784));
    assert_eq!(system.window(main).unwrap().saved_view, viewport.view_pos);
    assert_eq!(system.main_viewport().map(|vp| vp.owner), Some(main));
}

#[test]
fn test_entity_focus_forces_zoom_0_and_follows() {
    let mut system = test_system(SCREEN);
    let window = system.open_window(WindowClass::Guest, Rect::new(10, 10, 210, 160), WindowFlags::empty());

    let entity = EntityId(7);
    let entities = TestEntities::with(entity, CoordsXYZ::new(320, 320, 16));

    let id = system.create_viewport(
        &entities,
        window,
        ScreenCoords::new(12, 24),
        Size::new(196, 120),
        ZoomLevel::new(2),
        ViewportFocus::Entity(entity)).unwrap();

    let viewport = system.viewport(id).unwrap();
    assert_eq!(viewport.zoom, ZoomLevel::default());
    assert_eq!(viewport.view_size, Size::new(196, 120));
    assert_eq!(system.window(window).unwrap().target_entity, Some(entity));

    // Missing entities centre on the origin instead.
    let id = system.create_viewport(
        &TestEntities::default(),
        window,
        ScreenCoords::new(12, 24),
        Size::new(196, 120),
        ZoomLevel::new(2),
        ViewportFocus::Entity(EntityId(99))).unwrap();
    assert_eq!(system.viewport(id).unwrap().view_pos, ScreenCoords::new(-98, -60));
}

#[test]
fn test_slot_exhaustion_leaves_window_without_viewport() {
    let configs = ViewportConfigs { max_viewports: 1, ..ViewportConfigs::default() };
    let mut system = test_system_with(configs, SCREEN);
    let (_, first) = main_with_viewport(&mut system);

    let other = system.open_window(WindowClass::Viewport, Rect::new(0, 0, 100, 100), WindowFlags::empty());
    let created = system.create_viewport(
        &TestEntities::default(),
        other,
        ScreenCoords::zero(),
        Size::new(100, 100),
        ZoomLevel::default(),
        ViewportFocus::Coordinate(CoordsXYZ::default()));

    assert!(created.is_none());
    assert!(system.window(other).unwrap().viewport.is_none());
    assert!(system.viewport(first).is_some());
}

#[test]
fn test_replacing_a_viewport_with_no_free_slots() {
    let configs = ViewportConfigs { max_viewports: 1, ..ViewportConfigs::default() };
    let mut system = test_system_with(configs, SCREEN);
    let (main, first) = main_with_viewport(&mut system);
    assert!(system.viewports().is_full());

    let second = system.create_viewport(
        &TestEntities::default(),
        main,
        ScreenCoords::zero(),
        SCREEN,
        ZoomLevel::new(1),
        ViewportFocus::Coordinate(CoordsXYZ::default()));

    assert!(second.is_some());
    assert!(system.viewport(first).is_none());
    assert_eq!(system.window(main).unwrap().viewport, second);
    assert_eq!(system.viewports().len(), 1);
}

#[test]
fn test_create_viewport_clamps_zoom() {
    let configs = ViewportConfigs { min_zoom: ZoomLevel::new(1), max_zoom: ZoomLevel::new(2), ..ViewportConfigs::default() };
    let mut system = test_system_with(configs, SCREEN);
    let window = system.open_window(WindowClass::Viewport, Rect::new(0, 0, 100, 100), WindowFlags::empty());

    let create = |system: &mut ViewportSystem, zoom: i8| {
        let id = system.create_viewport(
            &TestEntities::default(),
            window,
            ScreenCoords::zero(),
            Size::new(100, 100),
            ZoomLevel::new(zoom),
            ViewportFocus::Coordinate(CoordsXYZ::default())).unwrap();
        system.viewport(id).unwrap().zoom
    };

    assert_eq!(create(&mut system, 40), ZoomLevel::new(2));
    assert_eq!(create(&mut system, i8::MIN), ZoomLevel::new(1));
    assert_eq!(create(&mut system, 0), ZoomLevel::new(1));

    // Entity views start at 1:1 unless the config forbids it.
    let entity = EntityId(3);
    let id = system.create_viewport(
        &TestEntities::with(entity, CoordsXYZ::new(64, 64, 0)),
        window,
        ScreenCoords::zero(),
        Size::new(100, 100),
        ZoomLevel::new(40),
        ViewportFocus::Entity(entity)).unwrap();
    let viewport = system.viewport(id).unwrap();
    assert_eq!(viewport.zoom, ZoomLevel::new(1));
    assert_eq!(viewport.view_size, Size::new(200, 200));
}

#[test]
fn test_null_focus_centres_on_origin() {
    let mut system = test_system(SCREEN);
    let main = open_main(&mut system);

    let id = system.create_viewport(
        &TestEntities::default(),
        main,
        ScreenCoords::zero(),
        SCREEN,
        ZoomLevel::default(),
        ViewportFocus::Coordinate(CoordsXYZ::null())).unwrap();
    assert_eq!(system.viewport(id).unwrap().view_pos, ScreenCoords::new(-320, -240));

    let entity = EntityId(5);
    let id = system.create_viewport(
        &TestEntities::with(entity, CoordsXYZ::null()),
        main,
        ScreenCoords::zero(),
        SCREEN,
        ZoomLevel::default(),
        ViewportFocus::Entity(entity)).unwrap();
    assert_eq!(system.viewport(id).unwrap().view_pos, ScreenCoords::new(-320, -240));
    assert_eq!(system.window(main).unwrap().saved_view, ScreenCoords::new(-320, -240));
}

#[test]
fn test_replacing_and_closing_viewports() {
    let mut system = test_system(SCREEN);
    let (main, first) = main_with_viewport(&mut system);

    let second = system.create_viewport(
        &TestEntities::default(),
        main,
        ScreenCoords::zero(),
        SCREEN,
        ZoomLevel::default(),
        ViewportFocus::Coordinate(CoordsXYZ::default())).unwrap();

    assert!(system.viewport(first).is_none());
    assert_eq!(system.viewports().len(), 1);
    assert_eq!(system.window(main).unwrap().viewport, Some(second));

    system.close_window(main);
    assert!(system.viewport(second).is_none());
    assert!(system.viewports().is_empty());
    assert!(system.main_window().is_none());
}

#[test]
fn test_gridlines_from_config() {
    let configs = ViewportConfigs { always_show_gridlines: true, ..ViewportConfigs::default() };
    let mut system = test_system_with(configs, SCREEN);
    let (_, id) = main_with_viewport(&mut system);
    assert!(system.viewport(id).unwrap().flags.contains(ViewportFlags::Gridlines));

    // Showing and hiding never takes the always-on gridlines away.
    system.show_gridlines();
    system.hide_gridlines();
    assert!(system.viewport(id).unwrap().flags.contains(ViewportFlags::Gridlines));
}

#[test]
fn test_overlays_are_reference_counted() {
    let mut system = test_system(SCREEN);
    let (_, id) = main_with_viewport(&mut system);

    system.show_land_rights();
    system.show_land_rights();
    assert_eq!(system.overlay_count(Overlay::LandRights), 2);
    assert!(system.viewport(id).unwrap().flags.contains(ViewportFlags::LandOwnership));
    assert!(system.dirty_blocks().has_dirty_blocks());
    system.take_dirty_rects();

    system.hide_land_rights();
    assert!(system.viewport(id).unwrap().flags.contains(ViewportFlags::LandOwnership));
    assert!(!system.dirty_blocks().has_dirty_blocks());

    system.hide_land_rights();
    assert!(!system.viewport(id).unwrap().flags.contains(ViewportFlags::LandOwnership));
    assert!(system.dirty_blocks().has_dirty_blocks());

    // Unbalanced hides are ignored.
    system.hide_land_rights();
    assert_eq!(system.overlay_count(Overlay::LandRights), 0);

    system.show_construction_rights();
    assert!(system.viewport(id).unwrap().flags.contains(ViewportFlags::ConstructionRights));
    system.hide_construction_rights();
    assert!(!system.viewport(id).unwrap().flags.contains(ViewportFlags::ConstructionRights));
}

#[test]
fn test_visibility_modes() {
    let mut system = test_system(SCREEN);
    let (main, id) = main_with_viewport(&mut system);

    system.set_visibility(VisibilityMode::UndergroundOn);
    system.set_visibility(VisibilityMode::TrackHeightsOn);
    system.viewport_mut(id).unwrap().flags |= ViewportFlags::Gridlines | ViewportFlags::SeeThroughRides;
    assert!(system.viewport(id).unwrap().flags.contains(ViewportFlags::UndergroundInside | ViewportFlags::TrackHeights));

    system.set_visibility(VisibilityMode::UndergroundOff);
    let flags = system.viewport(id).unwrap().flags;
    assert!(!flags.contains(ViewportFlags::UndergroundInside));
    assert!(flags.contains(ViewportFlags::TrackHeights));

    system.set_visibility(VisibilityMode::Reset);
    assert_eq!(system.viewport(id).unwrap().flags, ViewportFlags::Gridlines);

    // Raw mode values 4 and 5 are aliases.
    assert_eq!(VisibilityMode::try_from(4u8).ok(), Some(VisibilityMode::UndergroundOn));
    assert_eq!(VisibilityMode::try_from(5u8).ok(), Some(VisibilityMode::UndergroundOff));
    assert!(VisibilityMode::try_from(6u8).is_err());

    // Nothing changes: nothing is invalidated.
    system.take_dirty_rects();
    system.set_visibility(VisibilityMode::UndergroundOff);
    assert!(!system.dirty_blocks().has_dirty_blocks());
    assert!(system.window(main).is_some());
}

#[test]
fn test_set_saved_view() {
    let mut system = test_system(SCREEN);
    assert!(system.saved_view().is_none());

    let (_, id) = main_with_viewport(&mut system);
    system.set_saved_view();

    let saved = system.saved_view().unwrap();
    assert_eq!(saved.centre, system.viewport(id).unwrap().view_centre());
    assert_eq!(saved.zoom, ZoomLevel::default());
    assert_eq!(saved.rotation, system.rotation());
}

#[test]
fn test_open_and_close_mark_window_dirty() {
    let mut system = test_system(SCREEN);
    system.take_dirty_rects();

    let window = system.open_window(WindowClass::Ride, Rect::new(64, 8, 128, 16), WindowFlags::empty());
    assert_eq!(system.take_dirty_rects(), [Rect::new(64, 8, 128, 16)]);

    system.close_window(window);
    assert_eq!(system.take_dirty_rects(), [Rect::new(64, 8, 128, 16)]);
    assert!(system.windows().is_empty());
}

#[test]
fn test_config_file_fallback() {
    let system = ViewportSystem::with_config_file(Path::new("no/such/viewport.json"), SCREEN);
    assert_eq!(system.configs(), &ViewportConfigs::default());
    assert_eq!(system.screen_size(), SCREEN);
}
