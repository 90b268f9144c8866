//! Error types for the asgkit crate

use crate::types::ActionKind;
use thiserror::Error;

/// Errors that can occur while loading, collecting or reconciling
#[derive(Error, Debug)]
pub enum Error {
    /// A declarative source is unreadable, cannot be decoded or lacks a required field
    #[error("malformed input in {source_name}: {message}")]
    MalformedInput {
        source_name: String,
        message: String,
    },

    /// The same group was declared in two sources (strict mode only)
    #[error("security group '{name}' declared in both {first} and {second}")]
    DuplicateGroup {
        name: String,
        first: String,
        second: String,
    },

    /// The live snapshot could not be taken
    #[error("platform unavailable: {0}")]
    PlatformUnavailable(#[source] PlatformError),

    /// A single mutation failed during apply
    #[error("{action} '{group}' failed: {source}")]
    PlatformAction {
        action: ActionKind,
        group: String,
        #[source]
        source: PlatformError,
    },

    /// A network, address or range in a scan policy could not be parsed
    #[error("invalid network '{0}'")]
    InvalidNetwork(String),

    /// A skip pattern is not a valid regular expression
    #[error("invalid skip pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl Error {
    pub(crate) fn malformed(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// Error reported by a [`Platform`](crate::Platform) implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}{}", .status.map(|code| format!(" (HTTP {code})")).unwrap_or_default())]
pub struct PlatformError {
    /// Human-readable reason
    pub message: String,
    /// HTTP status code if the platform is reached over HTTP
    pub status: Option<u16>,
}

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }
}

/// Result type for asgkit operations
pub type Result<T> = std::result::Result<T, Error>;
