use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::channel_config::CHANNEL_CONFIG_FILE_NAME;
use super::error::{ConfigError, TrimError};
use super::parser::DEFAULT_DELIMITER;
use super::trimmer::TimeWindow;

/// Structure representing the application configuration. Contains pathing and time window information
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_path: PathBuf,
    pub delimiter: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub channel_config_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
}

impl Default for Config {
    /// Generate a new Config object reading the current directory with no time window
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("."),
            delimiter: DEFAULT_DELIMITER.to_string(),
            start: None,
            end: None,
            channel_config_path: None,
            output_path: None,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Write the configuration to a YAML file
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    /// The field delimiter, which must be a single character
    pub fn get_delimiter(&self) -> Result<char, ConfigError> {
        let mut chars = self.delimiter.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ConfigError::BadDelimiter(self.delimiter.clone())),
        }
    }

    /// Validate the start and end bounds into a TimeWindow
    pub fn time_window(&self) -> Result<TimeWindow, TrimError> {
        TimeWindow::from_bounds(self.start.as_deref(), self.end.as_deref())
    }

    /// Get the path of the channel configuration file, if there is one.
    ///
    /// An explicit path wins; otherwise the reserved file in the data directory is used when it exists.
    pub fn get_channel_config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.channel_config_path {
            return Some(path.clone());
        }
        if !self.data_path.is_dir() {
            return None;
        }
        let default_path = self.data_path.join(CHANNEL_CONFIG_FILE_NAME);
        if default_path.exists() {
            Some(default_path)
        } else {
            None
        }
    }

    pub fn has_output_path(&self) -> bool {
        self.output_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merger.yml");
        let config = Config {
            start: Some(String::from("2024-01-01 00:00")),
            output_path: Some(PathBuf::from("charts")),
            ..Default::default()
        };
        config.write_config_file(&path).unwrap();
        assert_eq!(Config::read_config_file(&path).unwrap(), config);
        assert!(matches!(
            Config::read_config_file(&dir.path().join("missing.yml")),
            Err(ConfigError::BadFilePath(_))
        ));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("data_path: /data/run1\nend: 2024-01-02 00:00\n").unwrap();
        assert_eq!(config.data_path, PathBuf::from("/data/run1"));
        assert_eq!(config.get_delimiter().unwrap(), ';');
        let window = config.time_window().unwrap();
        assert!(window.start.is_none());
        assert!(window.end.is_some());
    }

    #[test]
    fn test_bad_delimiter() {
        let config = Config {
            delimiter: String::from(";;"),
            ..Default::default()
        };
        assert!(matches!(
            config.get_delimiter(),
            Err(ConfigError::BadDelimiter(_))
        ));
    }

    #[test]
    fn test_default_channel_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            data_path: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert_eq!(config.get_channel_config_path(), None);
        std::fs::write(dir.path().join(CHANNEL_CONFIG_FILE_NAME), "name\n").unwrap();
        assert_eq!(
            config.get_channel_config_path(),
            Some(dir.path().join(CHANNEL_CONFIG_FILE_NAME))
        );
        config.channel_config_path = Some(PathBuf::from("elsewhere.csv"));
        assert_eq!(
            config.get_channel_config_path(),
            Some(PathBuf::from("elsewhere.csv"))
        );
    }
}
