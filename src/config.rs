use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::protocol::MAX_PAYLOAD_SIZE;

/// Optional server settings file, loaded from TOML.
///
/// Every field can also be given on the command line; command-line values
/// win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Shared secret clients must prove during the handshake.
    pub auth_key: Option<String>,
    /// Close sessions idle for this many seconds.
    pub idle_timeout_secs: Option<u64>,
    /// Largest accepted frame payload.
    pub max_frame_bytes: Option<u32>,
}

impl Settings {
    /// Load settings from a TOML file path. Returns defaults if the file
    /// doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        let settings: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?;

        // Only worth a warning when the file holds a secret.
        if settings.auth_key.is_some() {
            check_config_permissions(path);
        }
        Ok(settings)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn max_frame_bytes(&self) -> u32 {
        self.max_frame_bytes.unwrap_or(MAX_PAYLOAD_SIZE)
    }
}

/// Errors that can occur when loading settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {1}", path = .0.display())]
    ReadFailed(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config {path}: {1}", path = .0.display())]
    ParseFailed(PathBuf, #[source] toml::de::Error),
}

/// Warn if a settings file is world-readable.
#[cfg(unix)]
pub fn check_config_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(_) => return,
    };

    let mode = metadata.permissions().mode();
    if is_world_readable(mode) {
        tracing::warn!(
            "Config file {} is world-readable (mode {:o}). \
             It contains an auth key -- consider restricting permissions to 600.",
            path.display(),
            mode & 0o7777,
        );
    }
}

#[cfg(not(unix))]
pub fn check_config_permissions(_path: &Path) {}

pub fn is_world_readable(mode: u32) -> bool {
    mode & 0o004 != 0
}
