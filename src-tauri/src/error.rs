use std::fmt;

use serde::Serialize;

use crate::models::ResourceKey;

/// Why a remote call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "status", rename_all = "camelCase")]
pub enum FetchErrorKind {
    /// 404 from the control plane.
    NotFound,
    /// Any other non-2xx response.
    Status(u16),
    /// Connection refused, reset, DNS failure and the like.
    Transport,
    /// No response within the configured request timeout.
    Timeout,
    /// Body was not a JSON object of the expected shape.
    Decode,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::NotFound => f.write_str("not found"),
            FetchErrorKind::Status(code) => write!(f, "HTTP {code}"),
            FetchErrorKind::Transport => f.write_str("transport error"),
            FetchErrorKind::Timeout => f.write_str("timed out"),
            FetchErrorKind::Decode => f.write_str("decode error"),
        }
    }
}

/// A failed remote call, carrying the path it was made against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{path}: {kind}: {message}")]
pub struct FetchError {
    pub path: String,
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(path: impl Into<String>, kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn for_key(key: &ResourceKey, kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self::new(key.path(), kind, message)
    }

    pub fn decode(path: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::new(path, FetchErrorKind::Decode, err.to_string())
    }

    /// Maps a reqwest failure onto the taxonomy, keeping timeouts distinct.
    pub fn from_reqwest(path: impl Into<String>, err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FetchErrorKind::Timeout
        } else if err.is_decode() {
            FetchErrorKind::Decode
        } else if let Some(status) = err.status() {
            status_kind(status)
        } else {
            FetchErrorKind::Transport
        };
        Self::new(path, kind, err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == FetchErrorKind::NotFound
    }
}

pub(crate) fn status_kind(status: http::StatusCode) -> FetchErrorKind {
    if status == http::StatusCode::NOT_FOUND {
        FetchErrorKind::NotFound
    } else {
        FetchErrorKind::Status(status.as_u16())
    }
}

/// Failure of a state-changing action such as deploy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// The same action is already running for this resource; no call was made.
    #[error("action already in flight")]
    InFlight,
    #[error("deploy request failed: {0}")]
    Remote(#[from] FetchError),
    /// 2xx response without a deployment id.
    #[error("deploy response did not include a deployment id")]
    MissingIdentifier,
}
