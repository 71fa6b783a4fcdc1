//! Run configuration loaded from a JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::secrets::{resolve_secret, resolve_secret_optional, SecretError};
use crate::store::StoreCredentials;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Credential resolution failed: {0}")]
    Credentials(#[from] SecretError),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Where a credential comes from: a direct value, a file, or an env var.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CredentialSource {
    /// Direct value. Not recommended outside local testing.
    pub value_insecure: Option<String>,
    /// Path to a file holding the value.
    pub file: Option<String>,
    /// Name of an environment variable holding the value.
    pub env_var: Option<String>,
}

impl CredentialSource {
    fn resolve(&self) -> Result<secrecy::SecretString, SecretError> {
        resolve_secret(
            self.value_insecure.as_deref(),
            self.file.as_deref(),
            self.env_var.as_deref(),
        )
    }

    fn resolve_optional(&self) -> Result<Option<secrecy::SecretString>, SecretError> {
        resolve_secret_optional(
            self.value_insecure.as_deref(),
            self.file.as_deref(),
            self.env_var.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Login endpoint of the document store.
    pub login_url: String,

    /// REST API version used for store calls.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Acting user name.
    pub username: String,

    pub client_id: CredentialSource,
    pub client_secret: CredentialSource,
    pub password: CredentialSource,

    /// Optional security token appended to the password at login.
    #[serde(default)]
    pub security_token: CredentialSource,

    /// File extension identifying message documents.
    #[serde(default = "default_message_extension")]
    pub message_extension: String,

    /// Maximum documents per bounded run.
    #[serde(default = "default_batch_cap")]
    pub batch_cap: usize,

    /// Root directory for staged binaries and extractions.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Parent directory for per-run log directories.
    #[serde(default = "default_log_root")]
    pub log_root: PathBuf,
}

fn default_api_version() -> String {
    "58.0".to_string()
}

fn default_message_extension() -> String {
    "msg".to_string()
}

fn default_batch_cap() -> usize {
    30
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("files")
}

fn default_log_root() -> PathBuf {
    PathBuf::from("logs")
}

impl Config {
    /// Resolves the configured credential sources into login credentials.
    pub fn store_credentials(&self) -> Result<StoreCredentials, ConfigError> {
        if self.username.is_empty() {
            return Err(ConfigError::Validation {
                message: "username must not be empty".to_string(),
            });
        }
        Ok(StoreCredentials {
            login_url: self.login_url.clone(),
            username: self.username.clone(),
            client_id: self.client_id.resolve()?,
            client_secret: self.client_secret.resolve()?,
            password: self.password.resolve()?,
            security_token: self.security_token.resolve_optional()?,
        })
    }
}

/// Loads and validates a config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: Config = serde_json::from_str(&content)?;

    if config.login_url.is_empty() {
        return Err(ConfigError::Validation {
            message: "loginUrl must not be empty".to_string(),
        });
    }
    if config.message_extension.is_empty() {
        return Err(ConfigError::Validation {
            message: "messageExtension must not be empty".to_string(),
        });
    }
    if config.batch_cap == 0 {
        return Err(ConfigError::Validation {
            message: "batchCap must be at least 1".to_string(),
        });
    }

    Ok(config)
}
