//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::net::SocketAddr;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::mcp::server::DEFAULT_PROTOCOL_VERSIONS;
use crate::mcp::session::LogLevel;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Server identity and protocol negotiation.
    #[serde(default)]
    pub server: ServerConfig,

    /// Optional capabilities advertised during `initialize`.
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,

    /// List pagination.
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.name.trim().is_empty() {
            return Err(validation("server.name must not be empty"));
        }

        if self.server.supported_protocol_versions.is_empty() {
            return Err(validation(
                "server.supported_protocol_versions must list at least one version",
            ));
        }

        let pagination = &self.pagination;
        if pagination.default_per_page == 0 || pagination.max_per_page == 0 {
            return Err(validation("pagination sizes must be at least 1"));
        }
        if pagination.default_per_page > pagination.max_per_page {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "pagination.default_per_page ({}) exceeds pagination.max_per_page ({})",
                    pagination.default_per_page, pagination.max_per_page
                ),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            });
        }

        if !self.http.path.starts_with('/') {
            return Err(ConfigError::ValidationError {
                message: format!("http.path '{}' must start with '/'", self.http.path),
            });
        }

        Ok(())
    }
}

fn validation(message: &str) -> ConfigError {
    ConfigError::ValidationError {
        message: message.to_string(),
    }
}

/// Server identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Name reported in `serverInfo`.
    #[serde(default = "default_server_name")]
    pub name: String,

    /// Version reported in `serverInfo`.
    #[serde(default = "default_server_version")]
    pub version: String,

    /// Free-form usage hints returned from `initialize`.
    #[serde(default)]
    pub instructions: Option<String>,

    /// Protocol versions accepted, newest first.
    #[serde(default = "default_protocol_versions")]
    pub supported_protocol_versions: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            version: default_server_version(),
            instructions: None,
            supported_protocol_versions: default_protocol_versions(),
        }
    }
}

fn default_server_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_protocol_versions() -> Vec<String> {
    DEFAULT_PROTOCOL_VERSIONS
        .iter()
        .map(|v| (*v).to_string())
        .collect()
}

/// Optional server capabilities.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapabilitiesConfig {
    /// Advertise `logging` and accept `logging/setLevel`.
    #[serde(default = "default_true")]
    pub logging: bool,

    /// Advertise `completions` and accept `completion/complete`.
    #[serde(default = "default_true")]
    pub completions: bool,
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self {
            logging: true,
            completions: true,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Page sizes for the list methods.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaginationConfig {
    /// Items per page when the client does not ask.
    #[serde(default = "default_per_page")]
    pub default_per_page: usize,

    /// Upper bound on any requested page size.
    #[serde(default = "default_max_per_page")]
    pub max_per_page: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
        }
    }
}

const fn default_per_page() -> usize {
    15
}

const fn default_max_per_page() -> usize {
    50
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Process log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// MCP log level a new session starts with.
    #[serde(default)]
    pub default_client_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            default_client_level: LogLevel::Info,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Socket address to listen on.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Endpoint path.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            path: default_path(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_path() -> String {
    "/mcp".to_string()
}
