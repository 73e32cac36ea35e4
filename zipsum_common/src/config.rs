use crate::{ChecksumAlgorithm, ZipsumError};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "zipsum.toml";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Digest used for entry checksums
    #[serde(default)]
    pub algorithm: ChecksumAlgorithm,

    /// Worker threads for hashing (global pool when unset)
    #[serde(default)]
    pub threads: Option<usize>,

    /// Directory reports are written to when no explicit output file is given
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Leave `MATCH` rows out of comparison output
    #[serde(default)]
    pub diff_only: bool,

    /// Enable portable mode (config alongside binary)
    #[serde(default)]
    pub portable_mode: bool,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ZipsumError> {
        if self.threads == Some(0) {
            return Err(ZipsumError::Config("threads must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    pub exists: bool,
    pub portable: bool,
}

pub fn load_config(prefer_portable: bool) -> Result<LoadedConfig, ZipsumError> {
    let (path, portable) = resolve_config_path(prefer_portable)?;
    load_config_from(path, portable)
}

/// Load configuration from an explicit file, falling back to defaults when it is missing
pub fn load_config_from(path: PathBuf, portable: bool) -> Result<LoadedConfig, ZipsumError> {
    let exists = path.exists();

    let mut config = if exists {
        let data = fs::read_to_string(&path)?;
        toml::from_str(&data).map_err(|e| ZipsumError::Serialization(e.to_string()))?
    } else {
        AppConfig::default()
    };

    config.portable_mode = portable;
    config.validate()?;

    Ok(LoadedConfig {
        config,
        path,
        exists,
        portable,
    })
}

pub fn ensure_config(prefer_portable: bool) -> Result<LoadedConfig, ZipsumError> {
    let loaded = load_config(prefer_portable)?;
    if !loaded.exists {
        save_config(&loaded.path, &loaded.config)?;
    }
    Ok(loaded)
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ZipsumError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data = toml::to_string_pretty(config)
        .map_err(|e| ZipsumError::Serialization(e.to_string()))?;
    fs::write(path, data)?;
    Ok(())
}

fn resolve_config_path(prefer_portable: bool) -> Result<(PathBuf, bool), ZipsumError> {
    if let Some(portable_path) = portable_config_path() {
        if prefer_portable || portable_path.exists() {
            return Ok((portable_path, true));
        }
    }

    let dirs = ProjectDirs::from("", "aecs4u", "zipsum")
        .ok_or_else(|| ZipsumError::Config("Unable to determine config directory".to_string()))?;
    Ok((dirs.config_dir().join(CONFIG_FILE_NAME), false))
}

fn portable_config_path() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
}
