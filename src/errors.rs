//! Domain error taxonomy
//!
//! Every user-visible failure maps to one of these variants. The binary
//! prints the message to stderr and exits non-zero; infrastructure code
//! uses anyhow internally and converts at module boundaries.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShaiError {
    /// Invalid or conflicting command-line options. No remote call is
    /// attempted once this is raised.
    #[error("{0}")]
    Configuration(String),

    /// A named role or chat id that was required does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A role with the same name already exists and overwrite was not
    /// confirmed.
    #[error("{0}")]
    Conflict(String),

    /// The remote completion boundary failed: transport error, non-2xx
    /// status, or a malformed response body.
    #[error("generation failed: {0}")]
    Generation(String),

    /// Durable storage is unreadable or unwritable. Fatal for session
    /// and role storage; the cache degrades to a miss instead.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ShaiError {
    /// Map an HTTP error status from the completion endpoint into a
    /// generation error that keeps the status visible to the user.
    pub fn from_http_status(status: reqwest::StatusCode, body: String) -> Self {
        let body = body.trim();
        if body.is_empty() {
            ShaiError::Generation(format!("HTTP {status}"))
        } else {
            ShaiError::Generation(format!("HTTP {status}: {body}"))
        }
    }

    pub fn from_network_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ShaiError::Generation(format!("request timed out: {e}"))
        } else if e.is_connect() {
            ShaiError::Generation(format!("connection failed: {e}"))
        } else {
            ShaiError::Generation(e.to_string())
        }
    }
}

impl From<std::io::Error> for ShaiError {
    fn from(err: std::io::Error) -> Self {
        ShaiError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_keeps_body() {
        let err = ShaiError::from_http_status(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "quota exceeded".to_string(),
        );
        assert_eq!(
            err.to_string(),
            "generation failed: HTTP 429 Too Many Requests: quota exceeded"
        );
    }

    #[test]
    fn http_status_without_body() {
        let err =
            ShaiError::from_http_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "  ".into());
        assert_eq!(
            err.to_string(),
            "generation failed: HTTP 500 Internal Server Error"
        );
    }
}
