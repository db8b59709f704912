pub mod analyze;
pub mod config;
pub mod info;
pub mod list;
pub mod show;
pub mod status;
pub mod summary;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use centaur_core::config::CentaurConfig;
use centaur_core::sink::JsonDirSink;

/// Load the configuration file, or defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<CentaurConfig> {
    let Some(path) = path else {
        return Ok(CentaurConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: CentaurConfig = toml::from_str(&contents)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Open the report directory given on the command line, or the configured one.
pub fn open_reports(output: Option<&PathBuf>, config: &CentaurConfig) -> Result<JsonDirSink> {
    let dir = output.unwrap_or(&config.watch.output);
    JsonDirSink::open(dir)
        .with_context(|| format!("Failed to open report directory {}", dir.display()))
}
