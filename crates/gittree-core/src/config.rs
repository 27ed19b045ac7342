//! Configuration management for gittree
//!
//! Settings live in `~/.config/gittree/config.toml`. Every field has a
//! default, so a partial file (or no file at all) is valid.

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{GitTreeError, Result};

/// Color scheme preference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Auto,
    Light,
    Dark,
}

impl std::str::FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(format!("Invalid style: {}", s)),
        }
    }
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitTreeConfig {
    pub style: Style,
    /// Draw lanes with box-drawing characters
    pub unicode: bool,
    pub no_color: bool,
    /// chrono strftime format for absolute dates
    pub date_format: String,
    /// Show "3 days ago" instead of absolute dates
    pub relative_dates: bool,
    /// Ask before destructive actions (reset --hard)
    pub confirm_dangerous: bool,
    /// Rows materialized past the bottom of the viewport
    pub read_ahead: usize,
    /// Rows per pull when loading to the bottom
    pub batch_size: usize,
    /// Refresh when HEAD or refs change outside gittree
    pub watch: bool,
    pub colors: ColorConfig,
    pub git: GitConfig,
}

/// Color names (ratatui color names: "blue", "magenta", "lightcyan", ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Cycled per lane index
    pub lanes: Vec<String>,
    pub head: String,
    pub hash: String,
    pub branch: String,
    pub tag: String,
}

/// Git-specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Range used when none is given on the command line
    pub default_range: Option<String>,
    /// Appended to every `git log` invocation
    pub extra_args: Vec<String>,
}

fn default_lane_colors() -> Vec<String> {
    ["blue", "magenta", "green", "yellow", "cyan", "red"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

impl Default for GitTreeConfig {
    fn default() -> Self {
        Self {
            style: Style::Auto,
            unicode: false,
            no_color: false,
            date_format: "%Y-%m-%d %H:%M".to_string(),
            relative_dates: true,
            confirm_dangerous: true,
            read_ahead: 64,
            batch_size: 512,
            watch: true,
            colors: ColorConfig::default(),
            git: GitConfig::default(),
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            lanes: default_lane_colors(),
            head: "cyan".to_string(),
            hash: "yellow".to_string(),
            branch: "green".to_string(),
            tag: "magenta".to_string(),
        }
    }
}

impl GitTreeConfig {
    /// Default config location: `~/.config/gittree/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("gittree").join("config.toml"))
    }

    /// Load configuration from `path`, or defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| GitTreeError::Config(format!("Failed to parse config file: {}", e)))?;
        config.normalize();
        Ok(config)
    }

    /// Write this configuration to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| GitTreeError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Replace values that would break the navigator with their defaults
    fn normalize(&mut self) {
        let defaults = Self::default();
        if self.date_format.trim().is_empty() {
            self.date_format = defaults.date_format;
        } else if !is_valid_date_format(&self.date_format) {
            warn!("Invalid date_format {:?}, using {:?}", self.date_format, defaults.date_format);
            self.date_format = defaults.date_format;
        }
        if self.colors.lanes.is_empty() {
            self.colors.lanes = default_lane_colors();
        }
        if self.batch_size == 0 {
            self.batch_size = defaults.batch_size;
        }
    }
}

/// True when every specifier in `pattern` is one chrono understands
pub fn is_valid_date_format(pattern: &str) -> bool {
    StrftimeItems::new(pattern).all(|item| !matches!(item, Item::Error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GitTreeConfig::load_or_default(&dir.path().join("nope.toml")).unwrap();
        assert!(config.confirm_dangerous);
        assert!(!config.unicode);
        assert_eq!(config.colors.lanes.len(), 6);
    }

    #[test]
    fn test_partial_file_merges_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "unicode = true\ndate_format = \"\"\n[colors]\nlanes = []\n[git]\ndefault_range = \"main\"\n",
        )
        .unwrap();

        let config = GitTreeConfig::load_or_default(&path).unwrap();
        assert!(config.unicode);
        assert_eq!(config.date_format, "%Y-%m-%d %H:%M");
        assert_eq!(config.colors.lanes.len(), 6);
        assert_eq!(config.git.default_range.as_deref(), Some("main"));
        assert_eq!(config.read_ahead, 64);
    }

    #[test]
    fn test_bad_date_format_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "date_format = \"%Q\"\n").unwrap();

        let config = GitTreeConfig::load_or_default(&path).unwrap();
        assert_eq!(config.date_format, "%Y-%m-%d %H:%M");

        assert!(is_valid_date_format("%d.%m.%Y %H:%M:%S"));
        assert!(!is_valid_date_format("%Q"));
        assert!(!is_valid_date_format("%Y-%"));
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "unicode = \"maybe\"").unwrap();

        let err = GitTreeConfig::load_or_default(&path).unwrap_err();
        assert!(matches!(err, GitTreeError::Config(_)));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = GitTreeConfig {
            style: Style::Dark,
            confirm_dangerous: false,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = GitTreeConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded.style, Style::Dark);
        assert!(!loaded.confirm_dangerous);
    }

    #[test]
    fn test_style_parsing() {
        assert_eq!("DARK".parse::<Style>(), Ok(Style::Dark));
        assert!("neon".parse::<Style>().is_err());
    }
}
