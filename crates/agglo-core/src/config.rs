use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ErrorCode;

/// Name of the per-project config file, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "agglo.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub fixtures: FixtureConfig,
    #[serde(default)]
    pub compare: CompareConfig,
    #[serde(default)]
    pub vocab: VocabConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureConfig {
    #[serde(default = "default_fixture_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_fixture_extension")]
    pub extension: String,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            dir: default_fixture_dir(),
            extension: default_fixture_extension(),
        }
    }
}

impl FixtureConfig {
    /// Path of fixture `name`, relative paths resolved against `project_root`.
    #[must_use]
    pub fn path_for(&self, project_root: &Path, name: &str) -> PathBuf {
        project_root
            .join(&self.dir)
            .join(format!("{name}.{}", self.extension))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareConfig {
    #[serde(default = "default_max_pairs")]
    pub max_pairs: usize,
    #[serde(default = "default_true")]
    pub show_tokens: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            max_pairs: default_max_pairs(),
            show_tokens: default_true(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabConfig {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

/// A config file that exists but does not parse.
#[derive(Debug, thiserror::Error)]
#[error("failed to parse {}: {source}", .path.display())]
pub struct ConfigError {
    pub path: PathBuf,
    #[source]
    pub source: toml::de::Error,
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::ConfigParseError
    }
}

fn load_toml<T>(path: &Path) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<T>(&content).map_err(|source| {
        ConfigError {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

/// Load `agglo.toml` from `project_root`, falling back to defaults when absent.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    load_toml(&project_root.join(PROJECT_CONFIG_FILE))
}

/// Load `<config_dir>/agglo/config.toml`, falling back to defaults when absent.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };
    load_toml(&config_dir.join("agglo/config.toml"))
}

/// Map an output mode spelling to its canonical name.
#[must_use]
pub fn normalize_output_mode(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "table" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

fn default_fixture_dir() -> PathBuf {
    PathBuf::from("fixtures")
}

fn default_fixture_extension() -> String {
    "golden".to_string()
}

const fn default_max_pairs() -> usize {
    20
}

const fn default_true() -> bool {
    true
}
