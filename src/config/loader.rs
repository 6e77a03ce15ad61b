//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::error::ConfigError;
use crate::config::schema::ReloadConfig;

/// Load configuration from a TOML file.
///
/// Only syntax is checked here; values are validated when the file is turned
/// into [`ServerOptions`](crate::config::ServerOptions), after CLI overrides.
pub fn load_config(path: &Path) -> Result<ReloadConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
