// src/profile.rs
//
// `.ptc` profile files: a JSON object keyed by channel name holding a full
// configuration for each of the seven channels.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::model::ChannelConfigs;

pub const PROFILE_EXTENSION: &str = "ptc";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: not a valid profile: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Write `configs` to `path` as pretty-printed JSON.
pub fn save_profile(path: &Path, configs: &ChannelConfigs) -> Result<(), ProfileError> {
    let json = serde_json::to_string_pretty(configs).map_err(|source| ProfileError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ProfileError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, json).map_err(|source| ProfileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!("profile saved to {}", path.display());
    Ok(())
}

/// Read a profile. All seven channels must be present.
pub fn load_profile(path: &Path) -> Result<ChannelConfigs, ProfileError> {
    let text = fs::read_to_string(path).map_err(|source| ProfileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let configs = serde_json::from_str(&text).map_err(|source| ProfileError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    info!("profile loaded from {}", path.display());
    Ok(configs)
}

/// Append `.ptc` when `path` has no extension.
pub fn with_profile_extension(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(PROFILE_EXTENSION)
    }
}
