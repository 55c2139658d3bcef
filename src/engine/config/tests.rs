use super::*;

#[test]
fn test_missing_fields_use_defaults() {
    let configs = ViewportConfigs::from_json::<ViewportConfigs>(r#"{ "always_show_gridlines": true }"#).unwrap();
    assert!(configs.always_show_gridlines);
    assert_eq!(configs.max_viewports, ViewportConfigs::DEFAULT_MAX_VIEWPORTS);
    assert_eq!(configs.max_zoom, ZoomLevel::MAX);
}

#[test]
fn test_post_load_sanitizes() {
    let json = r#"{ "max_viewports": 0, "min_zoom": 3, "max_zoom": 1 }"#;
    let configs = ViewportConfigs::from_json::<ViewportConfigs>(json).unwrap();
    assert_eq!(configs.max_viewports, ViewportConfigs::DEFAULT_MAX_VIEWPORTS);
    assert_eq!(configs.min_zoom, ZoomLevel::new(1));
    assert_eq!(configs.max_zoom, ZoomLevel::new(3));
    assert_eq!(configs.clamp_zoom(ZoomLevel::new(0)), ZoomLevel::new(1));
}

#[test]
fn test_out_of_range_zooms_are_clamped() {
    let json = r#"{ "min_zoom": -40, "max_zoom": 40 }"#;
    let configs = ViewportConfigs::from_json::<ViewportConfigs>(json).unwrap();
    assert_eq!(configs.min_zoom, ZoomLevel::MIN);
    assert_eq!(configs.max_zoom, ZoomLevel::MAX);
    assert_eq!(configs.clamp_zoom(ZoomLevel::new(100)), ZoomLevel::MAX);
}

#[test]
fn test_bad_json_is_an_error() {
    assert!(ViewportConfigs::from_json::<ViewportConfigs>("{ not json").is_err());
}

#[test]
fn test_save_and_load_file() {
    let dir = std::env::temp_dir().join(format!("park_viewport_cfg_{}", std::process::id()));
    let path = dir.join("viewport.json");

    let configs = ViewportConfigs {
        always_show_gridlines: true,
        zoom_to_cursor: false,
        log_level: log::Level::Warn,
        ..ViewportConfigs::default()
    };

    assert!(configs.save_file(&path));
    let loaded = ViewportConfigs::load_file::<ViewportConfigs>(&path);
    assert_eq!(loaded, configs);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_file_falls_back_to_default() {
    let path = Path::new("this/path/does/not/exist/viewport.json");
    let loaded = ViewportConfigs::load_file::<ViewportConfigs>(path);
    assert_eq!(loaded, ViewportConfigs::default());
}
