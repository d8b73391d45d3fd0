//! Error taxonomy for the request façade.
//!
//! # Design
//! Every failure a caller can observe is one `ErrorKind` value, delivered
//! through `Outcome<T>`. Network failures keep the raw `(domain, code)` pair
//! reported by the transport, so one lookup table classifies both errors from
//! the bundled transport and errors a host platform forwards over FFI.
//!
//! `Display` is the diagnostic rendering used in logs. User-facing copy comes
//! from `locale::describe`, which is localized.

use std::path::PathBuf;

use thiserror::Error;

/// Result of a single request: exactly one of success or a classified failure.
pub type Outcome<T> = std::result::Result<T, ErrorKind>;

/// Error domain for URL-loading failures.
pub const URL_ERROR_DOMAIN: &str = "NSURLErrorDomain";

/// Error domain for raw POSIX socket failures.
pub const POSIX_ERROR_DOMAIN: &str = "NSPOSIXErrorDomain";

/// Codes within [`URL_ERROR_DOMAIN`] and [`POSIX_ERROR_DOMAIN`].
///
/// The values match the platform constants so a host can pass its native
/// error codes through unchanged.
pub mod codes {
    pub const UNKNOWN: i64 = -1;
    pub const CANCELLED: i64 = -999;
    pub const BAD_URL: i64 = -1000;
    pub const TIMED_OUT: i64 = -1001;
    pub const CANNOT_FIND_HOST: i64 = -1003;
    pub const CANNOT_CONNECT_TO_HOST: i64 = -1004;
    pub const NETWORK_CONNECTION_LOST: i64 = -1005;
    pub const NOT_CONNECTED_TO_INTERNET: i64 = -1009;
    pub const SECURE_CONNECTION_FAILED: i64 = -1200;

    /// `ENETDOWN`. Reported when cellular data is switched off for the app.
    pub const POSIX_NETWORK_DOWN: i64 = 50;
}

/// Sub-classification of a [`NetworkCause`] by its `(domain, code)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkFailureKind {
    TimedOut,
    NotConnected,
    ConnectionLost,
    DnsFailed,
    HostUnreachable,
    CellularDataDisabled,
    /// Any pair missing from the lookup table.
    Other,
}

/// Opaque underlying cause of a transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{domain}-{code}{}", detail(.message))]
pub struct NetworkCause {
    pub domain: String,
    pub code: i64,
    pub message: String,
}

impl NetworkCause {
    pub fn new(domain: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            code,
            message: message.into(),
        }
    }

    pub fn url(code: i64, message: impl Into<String>) -> Self {
        Self::new(URL_ERROR_DOMAIN, code, message)
    }

    pub fn posix(code: i64, message: impl Into<String>) -> Self {
        Self::new(POSIX_ERROR_DOMAIN, code, message)
    }

    /// Look the `(domain, code)` pair up in the sub-classification table.
    pub fn kind(&self) -> NetworkFailureKind {
        match (self.domain.as_str(), self.code) {
            (URL_ERROR_DOMAIN, codes::TIMED_OUT) => NetworkFailureKind::TimedOut,
            (URL_ERROR_DOMAIN, codes::NOT_CONNECTED_TO_INTERNET) => NetworkFailureKind::NotConnected,
            (URL_ERROR_DOMAIN, codes::NETWORK_CONNECTION_LOST) => NetworkFailureKind::ConnectionLost,
            (URL_ERROR_DOMAIN, codes::CANNOT_FIND_HOST) => NetworkFailureKind::DnsFailed,
            (URL_ERROR_DOMAIN, codes::CANNOT_CONNECT_TO_HOST) => NetworkFailureKind::HostUnreachable,
            (POSIX_ERROR_DOMAIN, codes::POSIX_NETWORK_DOWN) => NetworkFailureKind::CellularDataDisabled,
            _ => NetworkFailureKind::Other,
        }
    }

    /// `domain-code`, the compact form shown to users in fallbacks and alerts.
    pub fn tag(&self) -> String {
        format!("{}-{}", self.domain, self.code)
    }
}

fn detail(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(" ({message})")
    }
}

/// Why a request could not be encoded before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingCause {
    /// Parameters that are not a key/value mapping were paired with an
    /// encoding that needs one.
    #[error("parameters that are not a key/value mapping cannot be encoded as {encoding}")]
    UnsupportedParameters { encoding: &'static str },

    #[error("JSON serialization failed: {0}")]
    Json(String),

    #[error("multipart form data encoding failed: {0}")]
    Multipart(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Every failure a request can end in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// Status 200 but no body bytes.
    #[error("status 200 response carried no body")]
    EmptyBody,

    /// The transport reported neither a response nor an error.
    #[error("transport produced neither a response nor an error")]
    EmptyResponse,

    /// Status 200 but the body is not JSON. Carries the bytes unchanged.
    #[error("response body is not JSON ({} bytes)", .0.len())]
    BodyNotJson(Vec<u8>),

    /// Any status other than 200.
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("network failure: {0}")]
    NetworkFailure(#[source] NetworkCause),

    #[error("request encoding failed: {0}")]
    EncodingFailure(#[source] EncodingCause),

    /// A download finished but could not be placed at its destination.
    #[error("cannot place download at {}: {message}", path.display())]
    Destination { path: PathBuf, message: String },
}

impl ErrorKind {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ErrorKind::HttpStatus(code) => Some(*code),
            _ => None,
        }
    }

    pub fn network_kind(&self) -> Option<NetworkFailureKind> {
        match self {
            ErrorKind::NetworkFailure(cause) => Some(cause.kind()),
            _ => None,
        }
    }

    /// Whether this kind routes to a blocking alert when the caller asks for
    /// escalation.
    pub fn should_escalate(&self) -> bool {
        matches!(
            self.network_kind(),
            Some(
                NetworkFailureKind::NotConnected
                    | NetworkFailureKind::CellularDataDisabled
                    | NetworkFailureKind::ConnectionLost
            )
        )
    }
}
