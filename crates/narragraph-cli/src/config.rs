//! Configuration file loading for the CLI
//!
//! This module handles finding and loading TOML configuration files
//! from various locations (explicit path, local directory, system directory).

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use thiserror::Error;

use narragraph::{NarragraphError, config::AppConfig};

/// Location of the project-local configuration file
pub const LOCAL_CONFIG: &str = "narragraph/config.toml";

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Failed to parse TOML configuration {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),
}

impl From<ConfigFileError> for NarragraphError {
    fn from(err: ConfigFileError) -> Self {
        let kind = match err {
            ConfigFileError::Parse { .. } => io::ErrorKind::InvalidData,
            ConfigFileError::MissingFile(_) => io::ErrorKind::NotFound,
        };
        NarragraphError::Io(io::Error::new(kind, err.to_string()))
    }
}

/// Find and load configuration
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Local project directory (`narragraph/config.toml`)
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// The loaded values are not range-checked here; the pipeline does that
/// when it is constructed.
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be read or parsed
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, NarragraphError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new(LOCAL_CONFIG);
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "narragraph", "narragraph") {
        let system_config = proj_dirs.config_dir().join("config.toml");

        if system_config.exists() {
            info!(path = system_config.display().to_string(); "Loading configuration from system path");
            return load_config_file(system_config);
        }

        debug!(path = system_config.display().to_string(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    debug!("No configuration file found, using default configuration");
    Ok(AppConfig::default())
}

fn load_config_file(path: impl AsRef<Path>) -> Result<AppConfig, NarragraphError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigFileError::MissingFile(path.to_path_buf()).into());
    }

    let content = fs::read_to_string(path)?;

    let config: AppConfig = toml::from_str(&content).map_err(|err| ConfigFileError::Parse {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;

    Ok(config)
}
