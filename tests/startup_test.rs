//! Startup wiring: camera discovery, configuration layering and backend selection

use miyobi::{
    brightness::{create_backend, seed_normal_level, BackendKind, Platform},
    capture::discover,
    cli::Args,
    config::{BackendConfig, Config},
    Error,
};
use std::fs;
#[cfg(target_os = "linux")]
use std::path::Path;
use tempfile::TempDir;

#[cfg(target_os = "linux")]
fn fake_backlight(root: &Path, name: &str, max: u64, current: u64) {
    let device = root.join(name);
    fs::create_dir_all(&device).unwrap();
    fs::write(device.join("max_brightness"), format!("{max}\n")).unwrap();
    fs::write(device.join("actual_brightness"), format!("{current}\n")).unwrap();
    fs::write(device.join("brightness"), format!("{current}\n")).unwrap();
}

#[test]
fn test_no_camera_among_six_indices() {
    let mut tried = Vec::new();
    let result = discover::<(), _>(6, |index| {
        tried.push(index);
        Ok(None)
    });

    assert!(matches!(result, Err(Error::NoCameraFound(_))));
    assert_eq!(tried, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn test_config_file_then_flags() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("miyobi.yaml");
    fs::write(
        &path,
        "policy:\n  threshold_cm: 50.0\n  close_level: 10\nsampling:\n  frame_skip: 4\n",
    )
    .unwrap();

    let mut config = Config::from_file(&path).unwrap();
    let args: Args = "--threshold 40 --cam none".parse().unwrap();
    args.apply_to(&mut config);

    assert_eq!(config.policy.threshold_cm, 40.0);
    assert_eq!(config.policy.close_level, 10);
    assert_eq!(config.sampling.frame_skip, 4);
    assert_eq!(config.camera.index, None);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_round_trips_through_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dump.yaml");

    let mut config = Config::default();
    config.policy.normal_level = Some(70);
    config.display.quit_key = 'x';
    config.to_file(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.policy.normal_level, Some(70));
    assert_eq!(loaded.display.quit_key, 'x');
}

#[test]
fn test_broken_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "policy: [not, a, map]\n").unwrap();

    assert!(matches!(Config::from_file(&path), Err(Error::ConfigError(_))));
    assert!(matches!(Config::from_file(dir.path().join("missing.yaml")), Err(Error::Io(_))));
}

#[test]
fn test_backend_factory_follows_platform() {
    assert_eq!(BackendKind::Auto.resolve(Platform::Linux), BackendKind::CommandLine);
    assert_eq!(BackendKind::Auto.resolve(Platform::Windows), BackendKind::System);
    assert_eq!(BackendKind::Auto.resolve(Platform::Other), BackendKind::System);

    let backend = create_backend(&BackendConfig::default(), Platform::Linux).unwrap();
    assert_eq!(backend.name(), "brightnessctl");

    let config = BackendConfig {
        kind: "ddc".to_string(),
        ..BackendConfig::default()
    };
    assert!(matches!(create_backend(&config, Platform::Linux), Err(Error::ConfigError(_))));
}

#[cfg(target_os = "linux")]
#[test]
fn test_backlight_backend_seeds_and_applies() {
    let dir = TempDir::new().unwrap();
    fake_backlight(dir.path(), "intel_backlight", 48000, 19200);

    let config = BackendConfig {
        kind: "backlight".to_string(),
        backlight_path: dir.path().to_path_buf(),
        ..BackendConfig::default()
    };
    let mut backend = create_backend(&config, Platform::Linux).unwrap();

    assert_eq!(seed_normal_level(backend.as_mut()).percent(), 40);

    backend
        .apply(miyobi::policy::BrightnessLevel::new(1).unwrap())
        .unwrap();
    let written = fs::read_to_string(dir.path().join("intel_backlight/brightness")).unwrap();
    assert_eq!(written.trim(), "480");
}

#[cfg(target_os = "linux")]
#[test]
fn test_unreadable_backend_seeds_full_brightness() {
    let dir = TempDir::new().unwrap();
    let config = BackendConfig {
        kind: "backlight".to_string(),
        backlight_path: dir.path().join("absent"),
        ..BackendConfig::default()
    };
    let mut backend = create_backend(&config, Platform::Linux).unwrap();
    assert_eq!(seed_normal_level(backend.as_mut()).percent(), 100);
}
