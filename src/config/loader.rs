// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV: &str = "PIPEDAG_CONFIG";

/// Read and deserialize a pipeline file without semantic checks.
///
/// Link targets, duplicate ids and cycles are left to
/// [`ConfigFile::try_from`]; [`load_and_validate`] does both.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    debug!(path = ?path, bytes = contents.len(), "read pipeline config");
    load_from_str(&contents)
}

/// Deserialize pipeline TOML held in memory.
pub fn load_from_str(contents: &str) -> Result<RawConfigFile> {
    Ok(toml::from_str(contents)?)
}

/// Read, deserialize and validate in one go.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    ConfigFile::try_from(load_from_path(path)?)
}

/// `$PIPEDAG_CONFIG` when set and non-empty, else `Pipedag.toml` in the
/// working directory.
pub fn default_config_path() -> PathBuf {
    config_path_from(std::env::var(CONFIG_ENV).ok().as_deref())
}

fn config_path_from(env: Option<&str>) -> PathBuf {
    match env.map(str::trim) {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => PathBuf::from("Pipedag.toml"),
    }
}
