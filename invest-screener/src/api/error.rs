//! Normalized API errors.
//!
//! Every failure of a backend call is mapped onto [`ApiError`], which carries
//! the HTTP status (when there was one) and a message fit for display.

use serde::Deserialize;
use thiserror::Error;

const MSG_NETWORK: &str = "Connection error. Check your internet connection.";
const MSG_TIMEOUT: &str = "The request took too long. Try again.";
const MSG_INVALID_CREDENTIALS: &str = "Incorrect email or password.";
const MSG_EMAIL_EXISTS: &str = "This email is already registered.";
const MSG_USERNAME_EXISTS: &str = "This username is already taken.";
const MSG_UNAUTHORIZED: &str = "Your session has expired. Please sign in again.";
const MSG_SERVER: &str = "Server error. Try again later.";
const MSG_UNKNOWN: &str = "An unexpected error occurred.";
const MSG_DECODE: &str = "The server returned an unexpected response.";
const MSG_CANCELLED: &str = "The request was cancelled.";

/// Error body returned by the backend (`{"detail": "..."}`).
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}

/// Failure of a backend call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No response was received
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    /// 401 response
    #[error("unauthorized: {}", .detail.as_deref().unwrap_or("no detail"))]
    Unauthorized { detail: Option<String> },

    /// 409 response
    #[error("conflict: {}", .detail.as_deref().unwrap_or("no detail"))]
    Conflict { detail: Option<String> },

    /// 500, 502, 503, or 504 response
    #[error("server error (HTTP {status})")]
    Server {
        status: u16,
        detail: Option<String>,
    },

    /// Any other non-success response
    #[error("HTTP {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status {
        status: u16,
        detail: Option<String>,
    },

    /// Success response with a body that could not be decoded
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The caller abandoned the request
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    /// Map a non-success status and its optional `detail` field.
    pub fn from_status(status: u16, detail: Option<String>) -> Self {
        match status {
            401 => Self::Unauthorized { detail },
            409 => Self::Conflict { detail },
            500 | 502 | 503 | 504 => Self::Server { status, detail },
            _ => Self::Status { status, detail },
        }
    }

    /// HTTP status, or 0 when no response was received.
    pub fn status(&self) -> u16 {
        match self {
            Self::Unauthorized { .. } => 401,
            Self::Conflict { .. } => 409,
            Self::Server { status, .. } | Self::Status { status, .. } => *status,
            Self::Network(_) | Self::Timeout | Self::Decode(_) | Self::Cancelled => 0,
        }
    }

    /// Backend `detail` string, if the response carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { detail }
            | Self::Conflict { detail }
            | Self::Server { detail, .. }
            | Self::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => MSG_NETWORK.to_string(),
            Self::Timeout => MSG_TIMEOUT.to_string(),
            Self::Unauthorized { detail } => detail
                .as_deref()
                .map(map_detail)
                .unwrap_or_else(|| MSG_UNAUTHORIZED.to_string()),
            Self::Conflict { detail } => detail
                .as_deref()
                .map(map_detail)
                .unwrap_or_else(|| MSG_EMAIL_EXISTS.to_string()),
            Self::Server { .. } => MSG_SERVER.to_string(),
            Self::Status { detail, .. } => detail
                .as_deref()
                .map(map_detail)
                .unwrap_or_else(|| MSG_UNKNOWN.to_string()),
            Self::Decode(_) => MSG_DECODE.to_string(),
            Self::Cancelled => MSG_CANCELLED.to_string(),
        }
    }
}

/// Translate well-known backend details, passing others through.
fn map_detail(detail: &str) -> String {
    let lower = detail.to_lowercase();
    if lower.contains("incorrect email or password") {
        MSG_INVALID_CREDENTIALS.to_string()
    } else if lower.contains("email already registered") {
        MSG_EMAIL_EXISTS.to_string()
    } else if lower.contains("username already taken") {
        MSG_USERNAME_EXISTS.to_string()
    } else {
        detail.to_string()
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), None)
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(401, "Unauthorized" ; "unauthorized")]
    #[test_case(409, "Conflict" ; "conflict")]
    #[test_case(500, "Server" ; "internal")]
    #[test_case(503, "Server" ; "unavailable")]
    #[test_case(404, "Status" ; "not found")]
    fn test_from_status(status: u16, variant: &str) {
        let err = ApiError::from_status(status, None);
        assert!(format!("{:?}", err).starts_with(variant));
        assert_eq!(err.status(), status);
    }

    #[test]
    fn test_messages_without_detail() {
        assert_eq!(ApiError::Timeout.user_message(), MSG_TIMEOUT);
        assert_eq!(ApiError::Network("refused".into()).user_message(), MSG_NETWORK);
        assert_eq!(ApiError::from_status(401, None).user_message(), MSG_UNAUTHORIZED);
        assert_eq!(ApiError::from_status(409, None).user_message(), MSG_EMAIL_EXISTS);
        assert_eq!(ApiError::from_status(418, None).user_message(), MSG_UNKNOWN);
    }

    #[test]
    fn test_known_details_are_translated() {
        let err = ApiError::from_status(401, Some("Incorrect email or password".into()));
        assert_eq!(err.user_message(), MSG_INVALID_CREDENTIALS);

        let err = ApiError::from_status(400, Some("Username already taken".into()));
        assert_eq!(err.user_message(), MSG_USERNAME_EXISTS);
    }

    #[test]
    fn test_unknown_detail_passes_through() {
        let err = ApiError::from_status(422, Some("limit must be <= 200".into()));
        assert_eq!(err.user_message(), "limit must be <= 200");
        assert_eq!(err.detail(), Some("limit must be <= 200"));
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let err = ApiError::from_status(502, Some("upstream exploded".into()));
        assert_eq!(err.user_message(), MSG_SERVER);
    }
}
