//!
//! Configuration module
//!

use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Result};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Walk the manifest from its last entry to its first.
    pub process_from_oldest: bool,
    /// Parallel range fetches per file.
    pub connection_count: usize,
    /// Parallel file downloads per post.
    pub parallel_files: usize,
    pub retry_times: usize,
    /// Wait between posts, bounding the request rate.
    pub pacing_secs: u64,
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&data)?;

        Ok(config)
    }

    /// A missing config file means defaults, matching first-run usage.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validated once at startup; the engine receives plain values.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.connection_count >= 1, "connection_count must be >= 1");
        ensure!(self.parallel_files >= 1, "parallel_files must be >= 1");
        ensure!(self.retry_times >= 1, "retry_times must be >= 1");

        Ok(())
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            process_from_oldest: true,
            connection_count: 20,
            parallel_files: 3,
            retry_times: 3,
            pacing_secs: 2,
        }
    }
}
