use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::{Builder, NamedTempFile};

use gear_watch::config::ScanConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "GEAR_CONFIG",
        "GEAR_DB_PATH",
        "GEAR_VIDEO_DIR",
        "GEAR_PERSON_MODEL",
        "GEAR_GEAR_MODEL",
        "GEAR_STRIDE",
        "GEAR_DEBOUNCE_SECS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "db_path": "site_a.db",
        "video_dir": "/srv/recordings",
        "models": {
            "person_model": "/models/yolov5s.onnx",
            "gear_model": "/models/gear.onnx",
            "person_input_size": 320,
            "gear_threshold": 0.65
        },
        "scan": {
            "stride": 10,
            "debounce_secs": 15.0,
            "extensions": ["mp4"],
            "jpeg_quality": 80
        }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("GEAR_CONFIG", file.path());
    std::env::set_var("GEAR_DB_PATH", "override.db");
    std::env::set_var("GEAR_STRIDE", "3");

    let cfg = ScanConfig::load().expect("load config");

    assert_eq!(cfg.db_path, "override.db");
    assert_eq!(cfg.video_dir, Some(PathBuf::from("/srv/recordings")));
    assert_eq!(
        cfg.models.person_model,
        Some(PathBuf::from("/models/yolov5s.onnx"))
    );
    assert_eq!(cfg.models.gear_model, Some(PathBuf::from("/models/gear.onnx")));
    assert_eq!(cfg.models.person_input_size, 320);
    assert_eq!(cfg.models.person_confidence, 0.5);
    assert_eq!(cfg.models.gear_threshold, 0.65);
    assert_eq!(cfg.pipeline.stride, 3);
    assert_eq!(cfg.pipeline.debounce_interval_s, 15.0);
    assert_eq!(cfg.pipeline.video_extensions, vec!["mp4"]);
    assert_eq!(cfg.pipeline.jpeg_quality, 80);

    clear_env();
}

#[test]
fn loads_toml_config_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
db_path = "site_b.db"

[scan]
debounce_secs = 5.0
default_frame_rate = 25.0
"#;
    file.write_all(toml.as_bytes()).expect("write config");

    let cfg = ScanConfig::load_from(Some(file.path())).expect("load config");
    assert_eq!(cfg.db_path, "site_b.db");
    assert_eq!(cfg.pipeline.debounce_interval_s, 5.0);
    assert_eq!(cfg.pipeline.default_frame_rate, 25.0);
    assert_eq!(cfg.pipeline.stride, 5);
    assert_eq!(cfg.video_dir, None);

    clear_env();
}

#[test]
fn defaults_apply_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("GEAR_VIDEO_DIR", "/data/cams");
    std::env::set_var("GEAR_DEBOUNCE_SECS", "2.5");

    let cfg = ScanConfig::load().expect("load config");
    assert_eq!(cfg.db_path, "gear_watch.db");
    assert_eq!(cfg.video_dir, Some(PathBuf::from("/data/cams")));
    assert_eq!(cfg.pipeline.debounce_interval_s, 2.5);
    assert_eq!(cfg.pipeline.video_extensions, vec!["mp4", "avi", "mov"]);

    clear_env();
}

#[test]
fn rejects_invalid_env_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("GEAR_STRIDE", "0");
    assert!(ScanConfig::load().is_err());

    std::env::set_var("GEAR_STRIDE", "five");
    assert!(ScanConfig::load().is_err());

    std::env::remove_var("GEAR_STRIDE");
    std::env::set_var("GEAR_DEBOUNCE_SECS", "-3");
    assert!(ScanConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_unreadable_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(b"{ not json").expect("write config");
    std::env::set_var("GEAR_CONFIG", file.path());
    assert!(ScanConfig::load().is_err());

    std::env::set_var("GEAR_CONFIG", "/nonexistent/gear.json");
    assert!(ScanConfig::load().is_err());

    clear_env();
}
