use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RunboardError;
use crate::logging::LogConfig;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// Where activity data comes from
    #[serde(default)]
    pub data: DataSettings,

    /// Terminal output preferences
    #[serde(default)]
    pub display: DisplaySettings,

    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Activity JSON file used when `--data` is not given
    pub activities_path: PathBuf,

    /// Year shown when `--year` is not given; the latest year in the data otherwise
    pub default_year: Option<i32>,
}

impl Default for DataSettings {
    fn default() -> Self {
        DataSettings {
            activities_path: PathBuf::from("activities.json"),
            default_year: None,
        }
    }
}

/// First day of the week in printed calendars. Grouping and week numbers always
/// start on Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Colored terminal output
    pub color: bool,

    /// Print JSON instead of tables by default
    pub json: bool,

    pub week_start: WeekStart,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            color: true,
            json: false,
            week_start: WeekStart::Sunday,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            data: DataSettings::default(),
            display: DisplaySettings::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".runboard")
            .join("config.toml")
    }

    /// Write a default configuration to `path` unless a file is already there.
    /// Returns whether a new file was created.
    pub fn init_at(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        Self::default()
            .save_to_file(path)
            .with_context(|| format!("Could not initialize {}", path.display()))?;
        Ok(true)
    }

    /// Load the configuration at `path` (or the default location), falling back to
    /// defaults when the file is missing or unreadable.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        if !config_path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                // Logging is configured from this file, so it is not up yet
                eprintln!("Ignoring config file {}: {:#}", config_path.display(), e);
                Self::default()
            }
        }
    }

    /// Reject settings no command could honor
    pub fn validate(&self) -> crate::Result<()> {
        if self.metadata.version.trim().is_empty() {
            return Err(RunboardError::Configuration("missing config version".to_string()));
        }
        if let Some(year) = self.data.default_year {
            if !(1900..=9999).contains(&year) {
                return Err(RunboardError::Configuration(format!(
                    "default_year {} is out of range",
                    year
                )));
            }
        }
        if self.data.activities_path.as_os_str().is_empty() {
            return Err(RunboardError::Configuration(
                "activities_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.metadata.version, deserialized.metadata.version);
        assert_eq!(config.data, deserialized.data);
        assert_eq!(config.display, deserialized.display);
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = AppConfig::default();
        original.data.default_year = Some(2024);
        original.display.week_start = WeekStart::Monday;
        original.logging.level = LogLevel::Debug;

        original.save_to_file(&config_path).unwrap();
        let loaded = AppConfig::load_from_file(&config_path).unwrap();

        assert_eq!(loaded.data.default_year, Some(2024));
        assert_eq!(loaded.display.week_start, WeekStart::Monday);
        assert_eq!(loaded.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_minimal_file_fills_defaults() {
        let toml_str = r#"
            [metadata]
            version = "1.0"
            created_at = "2024-01-01T00:00:00Z"
            updated_at = "2024-01-01T00:00:00Z"

            [data]
            default_year = 2023
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.data.default_year, Some(2023));
        assert_eq!(config.data.activities_path, PathBuf::from("activities.json"));
        assert!(config.display.color);
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.data.default_year = Some(12);
        assert!(matches!(config.validate(), Err(RunboardError::Configuration(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let temp_dir = tempdir().unwrap();
        let config = AppConfig::load_or_default(Some(&temp_dir.path().join("absent.toml")));
        assert_eq!(config.data, DataSettings::default());
    }

    #[test]
    fn test_init_keeps_existing_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("runboard").join("config.toml");

        assert!(AppConfig::init_at(&config_path).unwrap());
        let created = AppConfig::load_from_file(&config_path).unwrap();
        assert_eq!(created.data, DataSettings::default());

        let mut edited = created;
        edited.data.default_year = Some(2022);
        edited.save_to_file(&config_path).unwrap();

        assert!(!AppConfig::init_at(&config_path).unwrap());
        let reloaded = AppConfig::load_from_file(&config_path).unwrap();
        assert_eq!(reloaded.data.default_year, Some(2022));
    }
}
