// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Load the config the CLI asked for.
///
/// An explicit `--config` path must exist. Without one, `Sitewright.toml` in
/// the current directory is used when present and the built-in defaults
/// otherwise.
pub fn load_for_cli(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        return load_and_validate(path);
    }

    let path = default_config_path();
    if path.is_file() {
        load_and_validate(&path)
    } else {
        info!(path = %path.display(), "no config file found; using defaults");
        ConfigFile::try_from(RawConfigFile::default())
    }
}

/// Default config file name, resolved against the current directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Sitewright.toml")
}
