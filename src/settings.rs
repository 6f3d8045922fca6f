use std::path::PathBuf;

use anyhow::{Context, Result};
use config::Config;
use serde::Deserialize;

/// Environment prefix: `CATALOG_FORMAT`, `CATALOG_DB`, `CATALOG_LOG`.
const ENV_PREFIX: &str = "CATALOG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub format: OutputFormat,
    /// SQLite file to store the courses in.
    #[serde(default)]
    pub db: Option<PathBuf>,
    /// Filter directive used when neither `--quiet` nor `--verbose` is given.
    #[serde(default = "default_log")]
    pub log: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            db: None,
            log: default_log(),
        }
    }
}

fn default_log() -> String {
    "info".to_string()
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_config(
            Config::builder()
                .add_source(config::Environment::with_prefix(ENV_PREFIX))
                .build()
                .context("Failed to read settings from environment")?,
        )
    }

    fn from_config(config: Config) -> Result<Self> {
        config
            .try_deserialize()
            .context("Invalid CATALOG_* settings")
    }
}
