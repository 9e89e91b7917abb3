use axum::http::StatusCode;
use thiserror::Error;

use crate::access::Destination;

/// Failures talking to the identity service.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Network failure or a 5xx from the service.
    #[error("identity service unreachable: {0}")]
    Transport(String),
    /// The service refused the credentials or token (401/403).
    #[error("identity service rejected the credentials")]
    Unauthorized,
    /// The service refused the request for another reason (other 4xx).
    #[error("identity service rejected the request: {0}")]
    Rejected(String),
    #[error("unexpected identity service payload: {0}")]
    Decode(String),
    #[error("identity service did not answer in time")]
    Timeout,
}

impl IdentityError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, IdentityError::Transport(_) | IdentityError::Timeout)
    }

    /// Status code used by the JSON API. Never carries the underlying message.
    pub fn status_code(&self) -> StatusCode {
        match self {
            IdentityError::Unauthorized => StatusCode::UNAUTHORIZED,
            IdentityError::Rejected(_) => StatusCode::BAD_REQUEST,
            IdentityError::Transport(_) | IdentityError::Decode(_) => StatusCode::BAD_GATEWAY,
            IdentityError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IdentityError::Timeout
        } else if err.is_decode() {
            IdentityError::Decode(err.to_string())
        } else {
            IdentityError::Transport(err.to_string())
        }
    }
}

/// Why the Render Guard refused to render a page.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("no active session")]
    NoSession,
    #[error("could not resolve the principal: {0}")]
    PrincipalFetchFailed(#[source] IdentityError),
    #[error("authenticated with an insufficient role")]
    RoleMismatch(Destination),
}

impl GateError {
    /// Every gate failure ends in a redirect; this is where it goes.
    pub fn destination(&self) -> Destination {
        match self {
            GateError::NoSession | GateError::PrincipalFetchFailed(_) => Destination::SignIn,
            GateError::RoleMismatch(destination) => *destination,
        }
    }
}

/// Failures talking to the calendar API.
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar API unreachable: {0}")]
    Transport(String),
    #[error("calendar API returned status {0}")]
    Status(u16),
    #[error("unexpected calendar payload: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for CalendarError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CalendarError::Decode(err.to_string())
        } else {
            CalendarError::Transport(err.to_string())
        }
    }
}
