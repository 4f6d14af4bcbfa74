//! Configuration file handling for `.dbc2ipynb.toml`

use anyhow::{Context, Result};
use colored::Colorize;
use dbc_convert::ConvertOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the home and current directories
pub const CONFIG_FILE_NAME: &str = ".dbc2ipynb.toml";

/// Configuration file structure for .dbc2ipynb.toml
///
/// Configuration files can be placed in:
/// - User home directory: ~/.dbc2ipynb.toml (user defaults)
/// - Project directory: ./.dbc2ipynb.toml (project defaults)
///
/// Precedence order (highest to lowest):
/// 1. Command-line arguments
/// 2. Project config (./.dbc2ipynb.toml)
/// 3. User config (~/.dbc2ipynb.toml)
/// 4. Built-in defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Default settings for convert command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convert: Option<ConvertConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Output directory (default: `<archive stem>_ipynb` next to the archive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Maximum entry size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_entry_size: Option<u64>,

    /// Split plain-text entries on command separators
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_plain_text: Option<bool>,
}

impl ConvertConfig {
    /// Overlay `other` on top of `self`; set fields in `other` win
    fn overlay(self, other: Self) -> Self {
        Self {
            output_dir: other.output_dir.or(self.output_dir),
            max_entry_size: other.max_entry_size.or(self.max_entry_size),
            split_plain_text: other.split_plain_text.or(self.split_plain_text),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content).map_err(|e| {
            // TOML errors include line/column information, preserve it
            eprintln!(
                "{} Failed to parse config file: {}",
                "Error:".red().bold(),
                path.display()
            );
            eprintln!("{} {}", "Parse error:".yellow().bold(), e);
            eprintln!();
            eprintln!("{} Configuration file syntax:", "Help:".cyan().bold());
            eprintln!("  [convert]");
            eprintln!("  output_dir = \"notebooks\"");
            eprintln!("  max_entry_size = 100000000");
            eprintln!("  split_plain_text = false");
            anyhow::anyhow!("Failed to parse config file: {e}")
        })
    }

    /// Find and load configuration files
    /// Returns (`user_config`, `project_config`)
    pub fn discover_configs() -> (Option<Self>, Option<Self>) {
        let user_config = user_config_path().and_then(|p| Self::load_if_present(&p, "user"));
        let project_config = Self::load_if_present(&project_config_path(), "project");
        (user_config, project_config)
    }

    fn load_if_present(path: &Path, kind: &str) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!(
                    "{} Failed to load {kind} config from {}: {}",
                    "Warning:".yellow().bold(),
                    path.display(),
                    e
                );
                None
            }
        }
    }

    /// Merge configs with precedence: project config > user config > defaults
    pub fn merge(user_config: Option<Self>, project_config: Option<Self>) -> Self {
        let user = user_config.and_then(|c| c.convert);
        let project = project_config.and_then(|c| c.convert);

        let convert = match (user, project) {
            (None, None) => None,
            (Some(u), None) => Some(u),
            (None, Some(p)) => Some(p),
            (Some(u), Some(p)) => Some(u.overlay(p)),
        };

        Self { convert }
    }

    /// Conversion options from this config, with built-in defaults beneath
    pub fn convert_options(&self) -> ConvertOptions {
        let mut options = ConvertOptions::default();
        if let Some(convert) = &self.convert {
            options.output_dir.clone_from(&convert.output_dir);
            if let Some(max) = convert.max_entry_size {
                options.max_entry_size = max;
            }
            if let Some(split) = convert.split_plain_text {
                options.split_plain_text = split;
            }
        }
        options
    }

    /// Default configuration written by `config init`
    pub fn starter() -> Self {
        let defaults = ConvertOptions::default();
        Self {
            convert: Some(ConvertConfig {
                output_dir: None,
                max_entry_size: Some(defaults.max_entry_size),
                split_plain_text: Some(defaults.split_plain_text),
            }),
        }
    }

    /// Serialize as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// ~/.dbc2ipynb.toml, if a home directory is known
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

/// ./.dbc2ipynb.toml
pub fn project_config_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config: Config = toml::from_str(
            r#"
            [convert]
            output_dir = "out"
            split_plain_text = true
            "#,
        )
        .unwrap();
        let convert = config.convert.unwrap();
        assert_eq!(convert.output_dir, Some(PathBuf::from("out")));
        assert_eq!(convert.split_plain_text, Some(true));
        assert_eq!(convert.max_entry_size, None);
    }

    #[test]
    fn test_merge_precedence() {
        let user = Config {
            convert: Some(ConvertConfig {
                output_dir: Some(PathBuf::from("user-out")),
                max_entry_size: Some(10),
                split_plain_text: None,
            }),
        };
        let project = Config {
            convert: Some(ConvertConfig {
                output_dir: Some(PathBuf::from("project-out")),
                max_entry_size: None,
                split_plain_text: Some(true),
            }),
        };

        let merged = Config::merge(Some(user), Some(project));
        let convert = merged.convert.unwrap();
        assert_eq!(convert.output_dir, Some(PathBuf::from("project-out")));
        assert_eq!(convert.max_entry_size, Some(10));
        assert_eq!(convert.split_plain_text, Some(true));
    }

    #[test]
    fn test_merge_empty() {
        assert_eq!(Config::merge(None, None), Config::default());
    }

    #[test]
    fn test_convert_options_defaults() {
        let options = Config::default().convert_options();
        assert_eq!(options, ConvertOptions::default());
    }

    #[test]
    fn test_starter_round_trips() {
        let text = Config::starter().to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, Config::starter());
        assert!(text.contains("[convert]"));
    }
}
