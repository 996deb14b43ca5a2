//! Error types for mcp-engine.
//!
//! # Error Classes
//!
//! - [`ConfigError`]: loading and validating the configuration file
//! - [`McpError`]: protocol-level failures that become JSON-RPC error objects
//! - [`InvalidArgument`]: construction-time misuse of engine types (URI
//!   templates, content items, completion lists, method registration)
//!
//! Error messages returned to clients never include internal paths or
//! handler state; details are logged through `tracing` instead.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::mcp::protocol::{ErrorCode, JsonRpcError, RequestId};

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// A protocol-level failure, mapped onto a JSON-RPC error code.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum McpError {
    /// The inbound bytes were not valid JSON.
    #[error("Parse error")]
    Parse,

    /// The message violates the JSON-RPC 2.0 envelope rules.
    #[error("{0}")]
    InvalidRequest(String),

    /// Unknown method, or a method whose capability was not declared.
    #[error("{0}")]
    MethodNotFound(String),

    /// Missing or invalid method-specific parameters.
    #[error("{message}")]
    InvalidParams {
        /// Human-readable description.
        message: String,
        /// Optional structured detail.
        data: Option<Value>,
    },

    /// The authorization gate refused access to a named primitive.
    ///
    /// Shares the invalid-params code but is kept apart from not-found.
    #[error("{0}")]
    Unauthorized(String),

    /// Unexpected server-side failure.
    #[error("{0}")]
    Internal(String),
}

impl McpError {
    /// Creates an invalid params error without data.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
            data: None,
        }
    }

    /// Creates a method not found error for the given method name.
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::MethodNotFound(format!("Method not found: {method}"))
    }

    /// Returns the JSON-RPC error code class for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Parse => ErrorCode::ParseError,
            Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
            Self::MethodNotFound(_) => ErrorCode::MethodNotFound,
            Self::InvalidParams { .. } | Self::Unauthorized(_) => ErrorCode::InvalidParams,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Returns the numeric JSON-RPC code.
    #[must_use]
    pub const fn code(&self) -> i32 {
        self.error_code().code()
    }

    /// Builds the wire error object answering request `id`.
    #[must_use]
    pub fn into_response(self, id: Option<RequestId>) -> JsonRpcError {
        JsonRpcError::from_mcp(id, self)
    }

    /// Returns the structured data attached to this error, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        match self {
            Self::InvalidParams { data, .. } => data.as_ref(),
            _ => None,
        }
    }
}

/// A value was supplied that the engine refuses to construct from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid argument: {0}")]
pub struct InvalidArgument(pub String);

impl InvalidArgument {
    /// Creates a new invalid argument error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
