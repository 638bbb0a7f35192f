use thiserror::Error;

/// Maximum number of error body characters surfaced to the user.
pub const MAX_ERROR_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum Error {
    /// A gated action was attempted without a valid session.
    #[error("please sign in first")]
    AuthRequired,
    /// The backend answered 403: signed in, but not allowed.
    #[error("not authorized for this operation")]
    Forbidden,
    #[error("request failed ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("unable to reach the server: {0}")]
    Network(String),
    #[error("response error: {0}")]
    Parse(String),
    /// The backend answered 2xx with `ok: false`.
    #[error("rejected by server: {0}")]
    Rejected(String),
    #[error("{0}")]
    Validation(String),
    #[error("missing login verifier, please sign in again")]
    MissingVerifier,
    #[error("sign-in failed: {0}")]
    Authorization(String),
    #[error("session storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Builds an HTTP error from a status and raw body, trimming the body for display.
    pub fn http(status: u16, body: &str) -> Self {
        Self::Http {
            status,
            message: sanitize_body(body),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network("request timed out, please try again".to_string())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Sanitizes HTTP error bodies for user-facing messages by trimming and truncating.
pub fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
