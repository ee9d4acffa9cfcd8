//! Integration tests for the config accessor.
//!
//! These go through the public API only: an override file on disk, a
//! `ConfigLoader`, and the `SharedConfig` handles it returns.

use std::path::{Path, PathBuf};

use epr_config::{
    ConfigError, ConfigLoader, FixedProbe, OverrideSource, ParticipationMethod, RuntimeContext,
    Settings, REQUIRED_SECTIONS,
};
use toml::Value;
use uuid::Uuid;

/// Creates a fresh directory holding `config_user.toml` with `content`.
fn write_override(content: &str) -> (PathBuf, PathBuf) {
    let dir = std::env::temp_dir().join(format!("epr_accessor_test_{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("config_user.toml");
    std::fs::write(&path, content).expect("write override");
    (dir, path)
}

fn cleanup(dir: &Path) {
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_repeated_calls_return_identical_instance() {
    let (dir, path) = write_override("");
    let loader = ConfigLoader::new(OverrideSource::File(path), RuntimeContext::new(false));

    let first = loader.get_config().expect("first");
    let second = loader.get_config().expect("second");
    let third = loader.get_config().expect("third");

    assert!(first.ptr_eq(&second));
    assert!(first.ptr_eq(&third));
    cleanup(&dir);
}

#[test]
fn test_override_file_is_read_at_most_once() {
    // Arrange
    let (dir, path) = write_override("[plotting]\ndefault_color_map = 'magma'\n");
    let loader = ConfigLoader::new(OverrideSource::File(path.clone()), RuntimeContext::new(false));
    let first = loader.get_config().expect("first");

    // Act: change, then delete, the file; neither may be noticed
    std::fs::write(&path, "[plotting]\ndefault_color_map = 'cividis'\n").unwrap();
    let second = loader.get_config().expect("second");
    std::fs::remove_file(&path).unwrap();
    let third = loader.get_config().expect("a missing file no longer matters");

    // Assert
    assert_eq!(first.read().plotting.default_color_map, "magma");
    assert_eq!(second.read().plotting.default_color_map, "magma");
    assert!(third.ptr_eq(&first));
    cleanup(&dir);
}

#[test]
fn test_required_sections_exist_and_ipython_is_set_after_first_call() {
    let loader = ConfigLoader::new(OverrideSource::Empty, RuntimeContext::probe(&FixedProbe(false)));

    let cfg = loader.get_config().expect("load");
    let table = cfg.read().to_table().expect("serialize");

    for section in REQUIRED_SECTIONS {
        let value = table.get(section).unwrap_or_else(|| panic!("{section} missing"));
        if let Value::Table(inner) = value {
            assert!(!inner.is_empty(), "{section} is empty");
        }
    }
    assert_eq!(table["internal"]["ipython"], Value::Boolean(false));
    assert_eq!(cfg.read().internal.ipython, Some(false));
    cfg.read().validate().expect("loaded settings are valid");
}

#[test]
fn test_partial_section_override_keeps_sibling_defaults() {
    // Arrange
    let (dir, path) = write_override("[dissipation]\nepsi = 12\n");
    let loader = ConfigLoader::new(OverrideSource::File(path), RuntimeContext::new(false));

    // Act
    let cfg = loader.get_config().expect("load");

    // Assert
    let got = cfg.snapshot();
    let defaults = Settings::default();
    assert_eq!(got.dissipation.epsi, 12.0);
    assert_eq!(got.dissipation.tan_delta_sapp, defaults.dissipation.tan_delta_sapp);
    assert_eq!(got.dissipation.th, defaults.dissipation.th);
    assert_eq!(got.dissipation.eps_r, defaults.dissipation.eps_r);
    assert_eq!(got.dissipation.tan_delta_surf, defaults.dissipation.tan_delta_surf);
    assert_eq!(got.dissipation.surface_rs, defaults.dissipation.surface_rs);
    assert_eq!(got.dissipation.gseam, defaults.dissipation.gseam);
    assert_eq!(got.ansys, defaults.ansys);
    cleanup(&dir);
}

#[test]
fn test_manual_root_dir_change_is_not_reset() {
    // Arrange
    let loader = ConfigLoader::new(OverrideSource::Empty, RuntimeContext::new(false));
    let cfg = loader.get_config().expect("load");

    // Act
    cfg.write().root_dir = PathBuf::from("/data/transmon-run-7");
    let again = loader.get_config().expect("reload");

    // Assert
    assert_eq!(again.read().root_dir, PathBuf::from("/data/transmon-run-7"));
}

#[test]
fn test_extra_keys_in_override_are_added() {
    let (dir, path) = write_override(
        "owner = 'lab-b'\n[ansys]\nmethod_calc_P_mj = 'J_surf_mag'\nsetup = 'Setup1'\n",
    );
    let loader = ConfigLoader::new(OverrideSource::File(path), RuntimeContext::new(false));

    let cfg = loader.get_config().expect("load");
    let got = cfg.read();

    assert_eq!(got.ansys.method_calc_p_mj, ParticipationMethod::JSurfMag);
    assert_eq!(got.ansys.extra.get("setup").and_then(Value::as_str), Some("Setup1"));
    assert_eq!(got.extra.get("owner").and_then(Value::as_str), Some("lab-b"));
    assert!(got.ansys.save_mesh_stats, "unnamed ansys keys keep defaults");
    drop(got);
    cleanup(&dir);
}

#[test]
fn test_missing_required_override_file_propagates_error() {
    let loader = ConfigLoader::new(
        OverrideSource::File(PathBuf::from("/nonexistent/epr/config_user.toml")),
        RuntimeContext::new(false),
    );

    let result = loader.get_config();

    assert!(matches!(result, Err(ConfigError::Io { .. })));
    assert!(!loader.is_initialized());
}

#[test]
fn test_malformed_override_file_propagates_error() {
    let (dir, path) = write_override("[dissipation\nepsi = 12\n");
    let loader = ConfigLoader::new(OverrideSource::File(path), RuntimeContext::new(false));

    let result = loader.get_config();

    assert!(matches!(result, Err(ConfigError::Parse(_))));
    cleanup(&dir);
}

#[test]
fn test_handles_given_to_collaborators_observe_each_other() {
    let loader = ConfigLoader::new(OverrideSource::Empty, RuntimeContext::new(true));
    let plotting_view = loader.get_config().unwrap();
    let analysis_view = loader.get_config().unwrap();

    analysis_view.write().plotting.default_color_map = "inferno".to_string();

    assert_eq!(plotting_view.read().plotting.default_color_map, "inferno");
    assert_eq!(plotting_view.read().internal.ipython, Some(true));
}
