//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/progtree/progtree.toml`
//! 3. Local config: a file passed explicitly (`--config`)
//! 4. Environment variables: `PROGTREE_*` prefix, `__` as section separator

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::prerequisite::DEFAULT_COURSE_CODE_PATTERN;

/// Prerequisite grammar settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PrerequisiteConfig {
    /// Course-code lexical pattern (unanchored regex)
    pub course_code_pattern: String,
    /// Render expressions with AND/OR instead of ET/OU
    pub english_keywords: bool,
}

impl Default for PrerequisiteConfig {
    fn default() -> Self {
        Self {
            course_code_pattern: DEFAULT_COURSE_CODE_PATTERN.to_string(),
            english_keywords: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawPrerequisiteConfig {
    pub course_code_pattern: Option<String>,
    pub english_keywords: Option<bool>,
}

/// Raw settings for intermediate parsing: `None` means "not specified, inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub minimum_editable_year: Option<i32>,
    pub store_file: Option<PathBuf>,
    pub prerequisite: RawPrerequisiteConfig,
}

/// Unified configuration for progtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    /// Trees whose root year is lower are read-only (unset: no cutoff)
    pub minimum_editable_year: Option<i32>,
    /// Default TOML store used by the CLI
    pub store_file: Option<PathBuf>,
    pub prerequisite: PrerequisiteConfig,
}

/// Get the XDG config directory for progtree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "progtree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("progtree.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand `~`, `$VAR` and `${VAR}` in path-like fields.
    fn expand_paths(&mut self) {
        if let Some(store) = &self.store_file {
            let raw = store.to_string_lossy();
            let expanded = shellexpand::full(raw.as_ref())
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| raw.to_string());
            self.store_file = Some(PathBuf::from(expanded));
        }
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            minimum_editable_year: overlay.minimum_editable_year.or(self.minimum_editable_year),
            store_file: overlay
                .store_file
                .clone()
                .or_else(|| self.store_file.clone()),
            prerequisite: PrerequisiteConfig {
                course_code_pattern: overlay
                    .prerequisite
                    .course_code_pattern
                    .clone()
                    .unwrap_or_else(|| self.prerequisite.course_code_pattern.clone()),
                english_keywords: overlay
                    .prerequisite
                    .english_keywords
                    .unwrap_or(self.prerequisite.english_keywords),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_config` - Optional config file layered over the global one
    pub fn load(local_config: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(local) = local_config {
            if !local.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", local.display()),
                });
            }
            let raw = load_raw_settings(local)?;
            current = current.merge_with(&raw);
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply PROGTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(settings: Self) -> Result<Self, ApplicationError> {
        Self::apply_overrides(settings, env_source())
    }

    fn apply_overrides(mut settings: Self, source: Environment) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(source)
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_int("minimum_editable_year") {
            settings.minimum_editable_year =
                Some(i32::try_from(val).map_err(|e| ApplicationError::Config {
                    message: format!("minimum_editable_year: {e}"),
                })?);
        }
        if let Ok(val) = config.get_string("store_file") {
            settings.store_file = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("prerequisite.course_code_pattern") {
            settings.prerequisite.course_code_pattern = val;
        }
        if let Ok(val) = config.get_bool("prerequisite.english_keywords") {
            settings.prerequisite.english_keywords = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# progtree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/progtree/progtree.toml
#   Local:  file passed with --config
#   Env:    PROGTREE_* environment variables (PROGTREE_PREREQUISITE__COURSE_CODE_PATTERN, ...)

# Program trees of earlier years are read-only
# minimum_editable_year = 2024

# Store used when --store is not given
# store_file = "~/curriculum/programs.toml"

[prerequisite]
# Course code pattern accepted in prerequisite expressions
# course_code_pattern = "[BLMWX][A-Z]{2,4}\\d{4}[A-Z0-9]?"

# Display expressions with AND/OR instead of ET/OU
# english_keywords = false
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

/// `PROGTREE_KEY` for top-level keys, `PROGTREE_SECTION__KEY` for nested ones.
fn env_source() -> Environment {
    Environment::with_prefix("PROGTREE")
        .prefix_separator("_")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_created_then_standard_course_pattern() {
        let settings = Settings::default();
        assert_eq!(settings.prerequisite.course_code_pattern, DEFAULT_COURSE_CODE_PATTERN);
        assert_eq!(settings.minimum_editable_year, None);
    }

    #[test]
    fn given_overlay_when_merging_then_only_specified_fields_override() {
        let base = Settings {
            minimum_editable_year: Some(2020),
            store_file: Some(PathBuf::from("/tmp/base.toml")),
            prerequisite: PrerequisiteConfig::default(),
        };
        let overlay = RawSettings {
            minimum_editable_year: Some(2024),
            store_file: None,
            prerequisite: RawPrerequisiteConfig {
                course_code_pattern: None,
                english_keywords: Some(true),
            },
        };

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.minimum_editable_year, Some(2024));
        assert_eq!(merged.store_file, Some(PathBuf::from("/tmp/base.toml")));
        assert!(merged.prerequisite.english_keywords);
        assert_eq!(merged.prerequisite.course_code_pattern, DEFAULT_COURSE_CODE_PATTERN);
    }

    #[test]
    fn given_tilde_in_store_file_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            store_file: Some(PathBuf::from("~/programs.toml")),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let store = settings.store_file.unwrap();
        assert!(store.to_string_lossy().starts_with(&home));
    }

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<config::Map<String, String>>();
        env_source().source(Some(map))
    }

    #[test]
    fn given_single_underscore_prefix_when_overriding_then_top_level_key_applied() {
        let settings = Settings::apply_overrides(
            Settings::default(),
            env(&[("PROGTREE_MINIMUM_EDITABLE_YEAR", "2030")]),
        )
        .unwrap();

        assert_eq!(settings.minimum_editable_year, Some(2030));
    }

    #[test]
    fn given_nested_key_when_overriding_then_section_field_applied() {
        let settings = Settings::apply_overrides(
            Settings::default(),
            env(&[
                ("PROGTREE_PREREQUISITE__ENGLISH_KEYWORDS", "true"),
                ("PROGTREE_PREREQUISITE__COURSE_CODE_PATTERN", "[A-Z]{4}\\d{4}"),
            ]),
        )
        .unwrap();

        assert!(settings.prerequisite.english_keywords);
        assert_eq!(settings.prerequisite.course_code_pattern, "[A-Z]{4}\\d{4}");
    }

    #[test]
    fn given_unprefixed_variable_when_overriding_then_ignored() {
        let settings = Settings::apply_overrides(
            Settings::default(),
            env(&[("MINIMUM_EDITABLE_YEAR", "2030")]),
        )
        .unwrap();

        assert_eq!(settings.minimum_editable_year, None);
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let parsed: Result<RawSettings, _> = toml::from_str(&Settings::template());
        assert!(parsed.is_ok());
    }
}
