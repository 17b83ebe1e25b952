// src/config/validate.rs

use std::collections::{BTreeMap, HashSet};

use crate::config::model::{resolve_asset, AssetKind, ConfigFile, PathsSection, RawConfigFile};
use crate::errors::{Result, SiteError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SiteError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_global_config(&raw)?;
        let paths = validate_paths(&raw)?;
        validate_watch(&raw)?;
        Ok(ConfigFile::new_unchecked(raw, paths))
    }
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    // failure_policy and reload are strongly typed and rejected during
    // deserialization, so only numeric and string bounds are left here.

    if cfg.config.queue_length == 0 {
        return Err(SiteError::ConfigError(
            "[config].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.config.default.trim().is_empty() {
        return Err(SiteError::ConfigError(
            "[config].default must name a task".to_string(),
        ));
    }

    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<PathsSection> {
    let mut assets = BTreeMap::new();

    for kind in AssetKind::ALL {
        let resolved = resolve_asset(&cfg.paths, kind);

        if resolved.src.trim().is_empty() {
            return Err(SiteError::ConfigError(format!(
                "[paths.{}].src must not be empty",
                kind.key()
            )));
        }
        if resolved.dest.is_empty() || resolved.dest.len() > 2 {
            return Err(SiteError::ConfigError(format!(
                "[paths.{}].dest must list one or two directories (got {})",
                kind.key(),
                resolved.dest.len()
            )));
        }

        assets.insert(kind, resolved);
    }

    Ok(PathsSection::new(
        cfg.paths.site_dir.clone(),
        cfg.paths.staging_dir.clone(),
        assets,
    ))
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    let mut names = HashSet::new();

    for binding in &cfg.watch {
        if binding.name.trim().is_empty() {
            return Err(SiteError::ConfigError(
                "[[watch]] entries need a name".to_string(),
            ));
        }
        if !names.insert(binding.name.as_str()) {
            return Err(SiteError::ConfigError(format!(
                "watch binding '{}' is defined more than once",
                binding.name
            )));
        }
        if binding.tasks.is_empty() {
            return Err(SiteError::ConfigError(format!(
                "watch binding '{}' must name at least one task",
                binding.name
            )));
        }
        if binding.patterns.is_empty() {
            return Err(SiteError::ConfigError(format!(
                "watch binding '{}' has no patterns",
                binding.name
            )));
        }
    }

    Ok(())
}
