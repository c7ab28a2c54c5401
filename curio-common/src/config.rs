//! Configuration file resolution
//!
//! Services resolve their settings with the priority order:
//! 1. Environment variables (highest)
//! 2. TOML config file
//! 3. Compiled defaults (fallback)
//!
//! This module locates and parses the TOML layer; typed config structs and
//! the environment overrides live in each service crate.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Locate the config file for a service, or `None` if no file exists.
///
/// Search order:
/// 1. `$CURIO_CONFIG_DIR/<service>.toml` (explicit override)
/// 2. `<user config dir>/curio/<service>.toml` (e.g. `~/.config/curio/`)
/// 3. `/etc/curio/<service>.toml` (unix system-wide)
pub fn config_file_path(service: &str) -> Option<PathBuf> {
    let file_name = format!("{}.toml", service);

    if let Ok(dir) = std::env::var("CURIO_CONFIG_DIR") {
        let path = PathBuf::from(dir).join(&file_name);
        if path.exists() {
            return Some(path);
        }
    }

    if let Some(dir) = dirs::config_dir() {
        let path = dir.join("curio").join(&file_name);
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let path = PathBuf::from("/etc/curio").join(&file_name);
        if path.exists() {
            return Some(path);
        }
    }

    None
}

/// Read and parse a TOML config file into a typed struct
pub fn read_toml<T: DeserializeOwned>(path: &std::path::Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
}

/// Load a service's TOML config layer if a file is present
///
/// Missing file is not an error; a present-but-invalid file is.
pub fn load_service_config<T: DeserializeOwned>(service: &str) -> Result<Option<T>> {
    match config_file_path(service) {
        Some(path) => {
            tracing::info!(config = %path.display(), "Loading TOML config");
            read_toml(&path).map(Some)
        }
        None => Ok(None),
    }
}
