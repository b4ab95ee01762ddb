//! Client error type.

use std::fmt;

use stepwise_core::store::LoadError;

/// A failed backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// No HTTP response (connection refused, DNS, broken body stream).
    Transport(String),
    /// Non-success status. `message` is the body's `error` field, `None`
    /// when the body was not JSON.
    Status { status: u16, message: Option<String> },
    /// Success status with a body that does not decode.
    Decode { status: u16, message: String },
}

impl ClientError {
    /// HTTP status, if a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(_) => None,
            Self::Status { status, .. } | Self::Decode { status, .. } => Some(*status),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "request failed: {msg}"),
            Self::Status { status, message } => write!(
                f,
                "backend returned {status}: {}",
                message
                    .as_deref()
                    .unwrap_or(stepwise_core::store::UNPARSEABLE_ERROR_BODY)
            ),
            Self::Decode { status, message } => {
                write!(f, "undecodable response ({status}): {message}")
            }
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<ClientError> for LoadError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Transport(msg) => LoadError::transport(msg),
            ClientError::Status { status, message } => LoadError::status(status, message),
            ClientError::Decode { status, message } => LoadError::decode(status, message),
        }
    }
}
