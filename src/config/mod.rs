// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate bounds and resolve defaulted paths (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_for_cli, load_from_path};
pub use model::{
    AssetKind, AssetPaths, ConfigFile, ConfigSection, PathsSection, RawConfigFile, ServeSection,
    ToolsSection, WatchConfig,
};
