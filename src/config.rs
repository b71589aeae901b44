use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure for lab.
///
/// Holds the default host and token, the update-check bookkeeping and the
/// preferred output format. Files live in the platform config directory
/// (`~/.config/lab/lab.toml` on Linux) unless `--config` points elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Connection defaults
    #[serde(default)]
    pub core: CoreConfig,

    /// Update-check settings and last run
    #[serde(default)]
    pub update: UpdateConfig,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CoreConfig {
    /// Instance base URL
    #[serde(default = "default_host")]
    pub host: String,

    /// Personal access token
    pub token: Option<String>,

    /// Git remote used to detect the project
    #[serde(default = "default_remote")]
    pub remote: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UpdateConfig {
    /// When the last successful update check ran
    pub last_check: Option<DateTime<Utc>>,

    /// Minimum hours between automatic checks
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,

    /// Instance hosting lab's own releases
    #[serde(default = "default_host")]
    pub host: String,

    /// Project publishing lab's releases
    #[serde(default = "default_update_project")]
    pub project: String,

    /// Turn automatic checks off entirely
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Default output format
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            token: None,
            remote: default_remote(),
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            last_check: None,
            interval_hours: default_interval_hours(),
            host: default_host(),
            project: default_update_project(),
            disabled: false,
        }
    }
}

fn default_host() -> String {
    "https://gitlab.com".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_interval_hours() -> u64 {
    24
}

fn default_update_project() -> String {
    "lab-cli/lab".to_string()
}

const CANDIDATES: [&str; 4] = ["lab.toml", "lab.yaml", "lab.yml", "lab.json"];

impl Config {
    /// Resolve which file to read and write.
    ///
    /// An explicit path always wins. Otherwise the first existing candidate in
    /// the `lab` config directory is used, falling back to `lab.toml` there so
    /// a later save has somewhere to go.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let dir = dirs::config_dir()?.join("lab");
        Some(Self::find_in_dir(&dir))
    }

    fn find_in_dir(dir: &Path) -> PathBuf {
        CANDIDATES
            .iter()
            .map(|candidate| dir.join(candidate))
            .find(|path| path.exists())
            .unwrap_or_else(|| dir.join(CANDIDATES[0]))
    }

    /// Load configuration, returning defaults when the file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load_from_path(path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Save configuration to a file, creating its directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config dir: {}", parent.display())
            })?;
        }

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
