// SPDX-License-Identifier: Apache-2.0

//! Configuration for the file source.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::sources::file::error::{Error, Result};

/// Configuration for one file source instance, immutable after construction.
#[derive(Debug, Clone)]
pub struct FileSourceConfig {
    /// Instance name, carried in stats snapshots and timestamp prefixes
    pub name: String,
    /// Path of the file to tail
    pub path: PathBuf,
    /// Keep watching the file past end of input, re-detecting rotation
    pub follow: bool,
    /// How long to wait after end of input before retrying the read
    pub poll_interval: Duration,
    /// Idle pause at the end of every loop iteration
    pub sleep_interval: Duration,
    /// Prefix each delivered line with "[<name> <RFC3339>] "
    pub timestamp: bool,
}

impl Default for FileSourceConfig {
    fn default() -> Self {
        Self {
            name: "tailfeed/file".to_string(),
            path: PathBuf::from("test.txt"),
            follow: false,
            poll_interval: Duration::from_secs(10),
            sleep_interval: Duration::from_millis(1),
            timestamp: false,
        }
    }
}

impl FileSourceConfig {
    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.is_empty() {
            return Err("Source name must not be empty".to_string());
        }

        if self.path.as_os_str().is_empty() {
            return Err("Source file path must not be empty".to_string());
        }

        Ok(())
    }
}

/// JSON descriptor for a file source, the shape a host system hands us when
/// constructing instances dynamically. Duration fields are humantime strings
/// ("10s", "1ms") and fail construction when invalid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileSourceDescriptor {
    pub name: String,
    pub file: PathBuf,
    pub follow: bool,
    pub poll: String,
    pub sleep_duration: String,
    pub timestamp: bool,
}

impl Default for FileSourceDescriptor {
    fn default() -> Self {
        Self {
            name: "tailfeed/file".to_string(),
            file: PathBuf::from("test.txt"),
            follow: false,
            poll: "10s".to_string(),
            sleep_duration: "1ms".to_string(),
            timestamp: false,
        }
    }
}

impl FileSourceDescriptor {
    /// Load a descriptor from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Resolve the descriptor into a validated config.
    pub fn into_config(self) -> Result<FileSourceConfig> {
        let poll_interval = parse_duration("poll", &self.poll)?;
        let sleep_interval = parse_duration("sleep_duration", &self.sleep_duration)?;

        let config = FileSourceConfig {
            name: self.name,
            path: self.file,
            follow: self.follow,
            poll_interval,
            sleep_interval,
            timestamp: self.timestamp,
        };
        config.validate().map_err(Error::Config)?;

        Ok(config)
    }
}

fn parse_duration(field: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| Error::Duration(format!("{} '{}': {}", field, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_descriptor_resolves_to_default_config() {
        let config = FileSourceDescriptor::default().into_config().unwrap();
        let defaults = FileSourceConfig::default();

        assert_eq!(config.name, defaults.name);
        assert_eq!(config.path, defaults.path);
        assert_eq!(config.follow, defaults.follow);
        assert_eq!(config.poll_interval, defaults.poll_interval);
        assert_eq!(config.sleep_interval, defaults.sleep_interval);
        assert_eq!(config.timestamp, defaults.timestamp);
    }

    #[test]
    fn descriptor_parses_from_json() {
        let json = r#"{
            "name": "app-log",
            "file": "/var/log/app.log",
            "follow": true,
            "poll": "250ms",
            "sleep_duration": "5ms",
            "timestamp": true
        }"#;

        let descriptor: FileSourceDescriptor = serde_json::from_str(json).unwrap();
        let config = descriptor.into_config().unwrap();

        assert_eq!(config.name, "app-log");
        assert_eq!(config.path, PathBuf::from("/var/log/app.log"));
        assert!(config.follow);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.sleep_interval, Duration::from_millis(5));
        assert!(config.timestamp);
    }

    #[test]
    fn invalid_duration_fails_construction() {
        let descriptor = FileSourceDescriptor {
            poll: "not-a-duration".to_string(),
            ..Default::default()
        };

        let err = descriptor.into_config().unwrap_err();
        assert!(matches!(err, Error::Duration(_)));
    }

    #[test]
    fn empty_name_fails_validation() {
        let descriptor = FileSourceDescriptor {
            name: String::new(),
            ..Default::default()
        };

        let err = descriptor.into_config().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
