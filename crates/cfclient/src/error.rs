//! Error types for Cloud Foundry API operations.

use asgkit::PlatformError;
use std::io;
use std::path::PathBuf;

/// Result type alias for cfclient operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the Cloud Controller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The cf CLI configuration could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The cf CLI configuration is not valid JSON or lacks a field.
    #[error("invalid cf config {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    /// No home directory to look for `.cf/config.json` in.
    #[error("cannot locate cf config: neither CF_HOME nor a home directory is set")]
    NoHome,

    /// The config exists but no session is present.
    #[error("not logged in ({0} is empty), run `cf login` first")]
    NotLoggedIn(&'static str),

    /// The refresh token was rejected.
    #[error("token refresh failed: {0}")]
    Auth(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        message: String,
        status: Option<u16>,
    },

    /// Response body did not have the expected shape.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// A security group name has no GUID on the platform.
    #[error("security group '{0}' not found")]
    GroupNotFound(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Prefix an HTTP error with the request it came from.
    pub fn during(self, request: &str) -> Self {
        match self {
            Self::Http { message, status } => Self::Http {
                message: format!("{request}: {message}"),
                status,
            },
            other => other,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::http("unexpected status", Some(code)),
            ureq::Error::Json(err) => Self::InvalidResponse(err.to_string()),
            other => Self::http(other.to_string(), None),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

impl From<Error> for PlatformError {
    fn from(err: Error) -> Self {
        match err {
            Error::Http {
                message,
                status: Some(status),
            } => Self::with_status(message, status),
            other => Self::new(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_conversion() {
        let err = Error::from(ureq::Error::StatusCode(403)).during("GET /v2/security_groups");
        assert!(matches!(err, Error::Http { status: Some(403), .. }));
        assert_eq!(
            err.to_string(),
            "HTTP request failed: GET /v2/security_groups: unexpected status"
        );
    }

    #[test]
    fn test_into_platform_error() {
        let platform: PlatformError = Error::http("DELETE /v2/security_groups/abc", Some(422)).into();
        assert_eq!(platform.status, Some(422));
        assert_eq!(
            platform.to_string(),
            "DELETE /v2/security_groups/abc (HTTP 422)"
        );

        let platform: PlatformError = Error::GroupNotFound("web".into()).into();
        assert_eq!(platform.to_string(), "security group 'web' not found");
        assert_eq!(platform.status, None);
    }

    #[test]
    fn test_not_logged_in_message() {
        let err = Error::NotLoggedIn("RefreshToken");
        assert!(err.to_string().contains("cf login"));
    }

    #[test]
    fn test_io_constructor() {
        let err = Error::io(
            "/home/me/.cf/config.json",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().contains(".cf/config.json"));
    }
}
