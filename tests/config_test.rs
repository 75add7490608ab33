//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Note: these tests assume no global config is present; local files live in
//! temp directories.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use progtree::application::services::ProgramTreeService;
use progtree::application::ApplicationError;
use progtree::config::Settings;
use progtree::domain::Keywords;
use progtree::util::testing;

#[test]
fn given_local_config_when_load_then_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("progtree.toml");
    fs::write(
        &file,
        r#"
minimum_editable_year = 2023
store_file = "/srv/curriculum/programs.toml"
"#,
    )
    .unwrap();

    let settings = Settings::load(Some(file.as_path())).expect("load settings");

    assert_eq!(settings.minimum_editable_year, Some(2023));
    assert_eq!(
        settings.store_file,
        Some(PathBuf::from("/srv/curriculum/programs.toml"))
    );
    // untouched section keeps its default
    assert_eq!(
        settings.prerequisite,
        progtree::config::PrerequisiteConfig::default()
    );
}

#[test]
fn given_missing_local_config_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();

    let result = Settings::load(Some(dir.path().join("absent.toml").as_path()));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_malformed_local_config_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("progtree.toml");
    fs::write(&file, "minimum_editable_year = \"soon\"").unwrap();

    let result = Settings::load(Some(file.as_path()));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_english_keywords_when_building_service_then_rendered_in_english() {
    let mut settings = Settings::default();
    settings.prerequisite.english_keywords = true;

    let service = testing::service(testing::sample_repository(), settings);

    assert_eq!(service.keywords(), Keywords::English);
}

#[test]
fn given_invalid_course_pattern_when_building_service_then_config_error() {
    let mut settings = Settings::default();
    settings.prerequisite.course_code_pattern = "[A-Z".to_string();

    let result = ProgramTreeService::new(testing::sample_repository(), Arc::new(settings));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_settings_when_rendered_then_reloadable() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("progtree.toml");
    let settings = Settings {
        minimum_editable_year: Some(2025),
        ..Settings::default()
    };
    fs::write(&file, settings.to_toml().unwrap()).unwrap();

    let reloaded = Settings::load(Some(file.as_path())).unwrap();

    assert_eq!(reloaded.minimum_editable_year, Some(2025));
}
