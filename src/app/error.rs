use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComiciError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Server returned code {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Unexpected page markup: {0}")]
    Markup(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Cannot descramble page: {0}")]
    Scramble(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Episode {0} is not available for this account")]
    EpisodeUnavailable(String),

    #[error("Episode not found: {0}")]
    EpisodeNotFound(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Image URL for page {sort} expired")]
    ContentExpired { sort: u32 },

    #[error("Invalid cookie file {path}: {reason}")]
    InvalidCookieFile { path: PathBuf, reason: String },

    #[error("Cookies {names:?} expired at {earliest}, please update your cookies")]
    CookiesExpired { names: Vec<String>, earliest: i64 },

    #[error("Cookie domain mismatch: {domain} != {host}")]
    CookieDomainMismatch { domain: String, host: String },

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("{0}")]
    Other(String),
}

impl ComiciError {
    /// Transport failures worth another attempt with the same request.
    pub fn is_retryable(&self) -> bool {
        match self {
            ComiciError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ComiciError::Status { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Entitlement failures, reported apart from transport errors.
    pub fn is_access_error(&self) -> bool {
        matches!(
            self,
            ComiciError::AccessDenied(_) | ComiciError::EpisodeUnavailable(_)
        )
    }
}

pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

pub type Result<T> = std::result::Result<T, ComiciError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err = ComiciError::Status {
            url: "https://example.com".into(),
            status: 503,
        };
        assert!(err.is_retryable());

        let err = ComiciError::Status {
            url: "https://example.com".into(),
            status: 404,
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_protocol_errors_not_retryable() {
        let err = ComiciError::Api {
            code: 1001,
            message: "invalid id".into(),
        };
        assert!(!err.is_retryable());
        assert!(!err.is_access_error());
        assert_eq!(err.to_string(), "Server returned code 1001: invalid id");
    }

    #[test]
    fn test_access_errors() {
        assert!(ComiciError::AccessDenied("ep".into()).is_access_error());
        assert!(ComiciError::EpisodeUnavailable("ep".into()).is_access_error());
        assert!(!ComiciError::Scramble("bad".into()).is_access_error());
    }
}
