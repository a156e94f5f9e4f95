//! Error types for the investment dashboard.

use thiserror::Error;

/// Result type alias using the dashboard error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for local (non-remote) failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an error with additional context.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if this is an authentication error.
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Auth(_) => true,
            Self::WithContext { source, .. } => source.is_auth(),
            _ => false,
        }
    }

    /// Check if the underlying cause is a missing file.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            Self::WithContext { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to any error type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_context() {
        let err = Error::Auth("token expired".into());
        let with_ctx = err.with_context("restoring session");
        assert!(matches!(with_ctx, Error::WithContext { .. }));
        assert!(with_ctx.is_auth());
        assert_eq!(
            with_ctx.to_string(),
            "restoring session: Authentication error: token expired"
        );
    }

    #[test]
    fn test_local_error_kinds() {
        let config = Error::Config("bad timeout".into());
        assert_eq!(config.to_string(), "Configuration error: bad timeout");
        assert!(!config.is_auth());
        assert!(!config.is_not_found());

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(Error::from(json), Error::Json(_)));
    }

    #[test]
    fn test_result_ext_wraps_io() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = res.context("reading session").unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_auth());
    }
}
