//! Configuration parser for loading configuration files.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::client::Credentials;
use crate::error::{ConfigError, FortiSyncError, Result};
use std::path::Path;
use tracing::{debug, info};

use super::spec::SyncConfig;

/// Environment variable holding the FortiManager API token.
pub const TOKEN_ENV: &str = "FORTIMANAGER_TOKEN";
/// Environment variable holding the administrator name.
pub const USERNAME_ENV: &str = "FORTIMANAGER_USERNAME";
/// Environment variable holding the administrator password.
pub const PASSWORD_ENV: &str = "FORTIMANAGER_PASSWORD";

/// Configuration parser for loading sync configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// Relative schema paths are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<SyncConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(FortiSyncError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            FortiSyncError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        let mut config = self.parse_yaml(&content, Some(path))?;

        if let Some(dir) = path.parent() {
            for schema in &mut config.schemas {
                if schema.is_relative() {
                    *schema = dir.join(&*schema);
                }
            }
        }

        Ok(config)
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<SyncConfig> {
        debug!("Parsing YAML configuration");

        let config: SyncConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            FortiSyncError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed configuration with {} resources for {}",
            config.resources.len(),
            config.provider.url
        );
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Recognized variables: `FORTISYNC_URL`, `FORTISYNC_DEVICE`,
    /// `FORTISYNC_VDOM`, `FORTISYNC_ADOM`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<SyncConfig> {
        let mut config = self.load_file(path)?;
        apply_env_overrides(&mut config, |name| std::env::var(name).ok());
        Ok(config)
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                FortiSyncError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Gets FortiManager credentials from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if neither a token nor a username and password are set.
    pub fn credentials() -> Result<Credentials> {
        credentials_from(|name| std::env::var(name).ok())
    }
}

/// Applies overrides from a variable lookup to the configuration.
pub fn apply_env_overrides(config: &mut SyncConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup("FORTISYNC_URL") {
        debug!("Overriding provider.url from environment");
        config.provider.url = url;
    }

    if let Some(device) = lookup("FORTISYNC_DEVICE") {
        debug!("Overriding defaults.device from environment");
        config.defaults.device = Some(device);
    }

    if let Some(vdom) = lookup("FORTISYNC_VDOM") {
        debug!("Overriding defaults.vdom from environment");
        config.defaults.vdom = Some(vdom);
    }

    if let Some(adom) = lookup("FORTISYNC_ADOM") {
        debug!("Overriding defaults.adom from environment");
        config.defaults.adom = Some(adom);
    }
}

/// Builds credentials from a variable lookup. A token wins over a password.
///
/// # Errors
///
/// Returns an error if no usable credentials are set.
pub fn credentials_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Credentials> {
    let set = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(token) = set(TOKEN_ENV) {
        return Ok(Credentials::Token(token));
    }

    match (set(USERNAME_ENV), set(PASSWORD_ENV)) {
        (Some(username), Some(password)) => Ok(Credentials::Password { username, password }),
        (Some(_), None) => Err(ConfigError::MissingEnvVar {
            name: PASSWORD_ENV.to_string(),
        }
        .into()),
        _ => Err(ConfigError::MissingEnvVar {
            name: TOKEN_ENV.to_string(),
        }
        .into()),
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["fortisync.yaml", "fortisync.yml"];

/// Finds the configuration file in the current directory or parent directories.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(FortiSyncError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}
