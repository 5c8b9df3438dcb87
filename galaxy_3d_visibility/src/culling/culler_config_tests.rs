use super::*;
use crate::error::Error;

#[test]
fn test_default_config() {
    let config = CullerConfig::default();
    assert_eq!((config.screen_width, config.screen_height), (640, 480));
    assert_eq!(config.coverage_mode, CoverageMode::Outline);
    assert!(config.frustum_culling && config.history_culling && config.object_tests);
    assert!(config.write_queue && config.visible_point_tracking);
    assert!(config.insert_inverted_clipper && config.ignore_bad_occluders);
    assert!(!config.clamp_occluders);
    assert!(config.validate().is_ok());
}

#[test]
fn test_bad_screen_size_rejected() {
    let config = CullerConfig { screen_width: 0, ..Default::default() };
    assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

    let config = CullerConfig { screen_height: 100_000, ..Default::default() };
    assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
}

#[test]
fn test_bad_spatial_config_rejected() {
    let mut config = CullerConfig::default();
    config.spatial.flatten_interval = 0;
    assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
}
