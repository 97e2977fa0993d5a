// SPDX-License-Identifier: Apache-2.0

use clap::Args;
use std::path::PathBuf;

use crate::sources::file::{Error, FileSourceConfig, FileSourceDescriptor, Result};

#[derive(Debug, Args, Clone)]
pub struct FileSourceArgs {
    /// Source instance name, carried in stats and timestamp prefixes
    #[arg(long, env = "TAILFEED_SOURCE_NAME", default_value = "tailfeed/file")]
    pub source_name: String,

    /// Path of the file to tail
    #[arg(long, env = "TAILFEED_FILE", default_value = "test.txt")]
    pub file: PathBuf,

    /// Keep watching the file for growth and rotation
    #[arg(long, env = "TAILFEED_FOLLOW", default_value = "false")]
    pub follow: bool,

    /// How long to wait after end of input before retrying the read
    #[arg(long, env = "TAILFEED_POLL_INTERVAL", default_value = "10s")]
    pub poll_interval: humantime::Duration,

    /// Idle pause at the end of every loop iteration
    #[arg(long, env = "TAILFEED_SLEEP_INTERVAL", default_value = "1ms")]
    pub sleep_interval: humantime::Duration,

    /// Prefix each line with "[<name> <RFC3339 timestamp>] "
    #[arg(long, env = "TAILFEED_TIMESTAMP", default_value = "false")]
    pub timestamp: bool,

    /// JSON descriptor file; when set it overrides the flags above
    #[arg(long, env = "TAILFEED_CONFIG")]
    pub config: Option<PathBuf>,
}

impl FileSourceArgs {
    pub fn build_config(&self) -> Result<FileSourceConfig> {
        if let Some(path) = &self.config {
            return FileSourceDescriptor::from_file(path)?.into_config();
        }

        let config = FileSourceConfig {
            name: self.source_name.clone(),
            path: self.file.clone(),
            follow: self.follow,
            poll_interval: self.poll_interval.into(),
            sleep_interval: self.sleep_interval.into(),
            timestamp: self.timestamp,
        };
        config.validate().map_err(Error::Config)?;

        Ok(config)
    }
}
