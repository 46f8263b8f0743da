// src/config/validate.rs

use crate::build::project::build_globset;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SpecwatchError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SpecwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_watch_section(cfg)?;
    validate_build_section(cfg)?;
    validate_globs("[build].project_markers", &cfg.build.project_markers)?;
    validate_globs("[dependencies].globs", &cfg.dependencies.globs)?;
    Ok(())
}

fn validate_watch_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.debounce_ms == 0 {
        return Err(SpecwatchError::ConfigError(
            "[watch].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.watch.spec_suffix.trim().is_empty() {
        return Err(SpecwatchError::ConfigError(
            "[watch].spec_suffix must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_build_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.build.command.trim().is_empty() {
        return Err(SpecwatchError::ConfigError(
            "[build].command must not be empty".to_string(),
        ));
    }
    if cfg.build.project_markers.is_empty() {
        return Err(SpecwatchError::ConfigError(
            "[build].project_markers must contain at least one pattern".to_string(),
        ));
    }
    Ok(())
}

fn validate_globs(field: &str, patterns: &[String]) -> Result<()> {
    build_globset(patterns)
        .map(|_| ())
        .map_err(|e| SpecwatchError::ConfigError(format!("{field}: {e:#}")))
}
