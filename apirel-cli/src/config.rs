//! apirel configuration loading from `.apirel.toml`.
//!
//! Configuration is optional. Every setting has a default and command-line
//! flags take precedence over the file.
//!
//! # Example Configuration
//!
//! ```toml
//! [snapshot]
//! path = "api/snapshot.json"
//!
//! [release]
//! tag_prefix = "sub/"
//!
//! [output]
//! format = "json"
//! color = false
//! ```

use serde::Deserialize;
use std::path::Path;

/// Default location of the snapshot document inside the repository.
pub const DEFAULT_SNAPSHOT_PATH: &str = "api.json";

/// Root configuration structure loaded from `.apirel.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct ApirelConfig {
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    #[serde(default)]
    pub release: ReleaseConfig,

    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,
}

/// Where snapshot documents live in the repository.
#[derive(Debug, Deserialize, Default)]
pub struct SnapshotConfig {
    /// Path of the snapshot document relative to the repository root.
    #[serde(default)]
    pub path: Option<String>,
}

/// Release tagging conventions.
#[derive(Debug, Deserialize, Default)]
pub struct ReleaseConfig {
    /// Prefix of release tags, for modules in repository subdirectories.
    #[serde(default)]
    pub tag_prefix: Option<String>,
}

/// Output formatting preferences.
///
/// Command-line flags (e.g. `--format json`) override these settings.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Valid values: `text`, `json`.
    #[serde(default)]
    pub format: Option<String>,

    /// Defaults to `true` when stdout is a TTY.
    #[serde(default)]
    pub color: Option<bool>,
}

impl ApirelConfig {
    /// Load configuration from `.apirel.toml` in the given directory.
    ///
    /// A missing file gives defaults. Read and parse errors are logged as
    /// warnings and also give defaults.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(".apirel.toml");
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse .apirel.toml: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read .apirel.toml: {}", e);
                }
            }
        }
        Self::default()
    }

    pub fn snapshot_path(&self) -> &str {
        self.snapshot
            .path
            .as_deref()
            .unwrap_or(DEFAULT_SNAPSHOT_PATH)
    }

    pub fn tag_prefix(&self) -> &str {
        self.release.tag_prefix.as_deref().unwrap_or_default()
    }

    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    /// The configured value, or `None` to use auto-detection.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ApirelConfig::default();
        assert_eq!(config.snapshot_path(), "api.json");
        assert_eq!(config.tag_prefix(), "");
        assert!(config.default_format().is_none());
        assert!(config.use_color().is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[snapshot]
path = "api/snapshot.json"

[release]
tag_prefix = "sub/"

[output]
format = "json"
color = false
"#;
        let config: ApirelConfig = toml::from_str(toml_content).unwrap();

        assert_eq!(config.snapshot_path(), "api/snapshot.json");
        assert_eq!(config.tag_prefix(), "sub/");
        assert_eq!(config.default_format(), Some("json"));
        assert_eq!(config.use_color(), Some(false));
    }

    #[test]
    fn test_partial_config() {
        let config: ApirelConfig = toml::from_str("[release]\ntag_prefix = \"lib/\"\n").unwrap();
        assert_eq!(config.tag_prefix(), "lib/");
        assert_eq!(config.snapshot_path(), DEFAULT_SNAPSHOT_PATH);
    }

    #[test]
    fn test_load_falls_back_on_bad_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".apirel.toml"), "[snapshot\npath = 3").unwrap();

        let config = ApirelConfig::load(dir.path());
        assert_eq!(config.snapshot_path(), DEFAULT_SNAPSHOT_PATH);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = ApirelConfig::load(dir.path());
        assert!(config.release.tag_prefix.is_none());
    }
}
