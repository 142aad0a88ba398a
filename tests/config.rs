use std::path::PathBuf;
use std::time::Duration;

use gnuplot_viewer::ViewerConfig;

#[test]
fn yaml_round_trip() {
    let mut cfg = ViewerConfig::default();
    cfg.renderer.program = "/opt/gnuplot/bin/gnuplot".into();
    cfg.renderer.terminal = Some("pngcairo".into());
    cfg.watch_interval_ms = 500;
    cfg.window.title = "plots".into();
    let yaml = cfg.to_yaml().unwrap();
    assert_eq!(ViewerConfig::from_yaml(&yaml).unwrap(), cfg);
}

#[test]
fn missing_keys_fall_back_to_defaults() {
    let cfg = ViewerConfig::from_yaml("renderer:\n  output_file: plot.png\n").unwrap();
    assert_eq!(cfg.renderer.output_file, PathBuf::from("plot.png"));
    assert_eq!(cfg.renderer.program, "gnuplot");
    assert_eq!(cfg.watch_interval_ms, 250);
    assert_eq!(cfg.window, ViewerConfig::default().window);
}

#[test]
fn watch_interval_has_a_floor() {
    let cfg = ViewerConfig {
        watch_interval_ms: 0,
        ..ViewerConfig::default()
    };
    assert_eq!(cfg.workflow_options().watch_interval, Duration::from_millis(10));
}

#[test]
fn save_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/config.yaml");
    let cfg = ViewerConfig::default();
    cfg.save_to(&path).unwrap();
    assert_eq!(ViewerConfig::load_from(&path).unwrap(), cfg);
}

#[test]
fn malformed_yaml_is_an_error() {
    assert!(ViewerConfig::from_yaml("watch_interval_ms: [1, 2]").is_err());
}
