//! Error types for downstream.

use derive_more::{Display, Error, From};

/// Main error type for downstream operations.
///
/// Transport-level failures ([`Error::Connection`], [`Error::Tls`],
/// [`Error::Timeout`], [`Error::Cancelled`]) are re-raised to the caller
/// unchanged after being logged. Protocol-level failures surface as
/// [`Error::Response`] carrying the status code and the raw response body.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Invalid client configuration, detected at construction time.
    #[display("configuration error: {_0}")]
    #[from(skip)]
    Configuration(#[error(not(source))] String),

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// The per-call deadline expired before the response arrived.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The per-call cancellation token fired while the request was in flight.
    #[display("request cancelled")]
    #[from(skip)]
    Cancelled,

    /// Non-success status code after at most one token-refresh retry.
    #[display("{message}")]
    #[from(skip)]
    Response {
        /// HTTP status code of the final response.
        status: u16,
        /// Message embedding elapsed time and request/response bodies.
        message: String,
        /// Raw response body text.
        #[error(not(source))]
        body: String,
    },

    /// The token refresh handler reported an explicit error.
    #[display("security token error: {_0}")]
    #[from(skip)]
    Token(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "items.0.name").
        path: String,
        /// Error message.
        message: String,
    },

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// Invalid request construction.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create a protocol error from the final response.
    #[must_use]
    pub fn response(status: u16, message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Response {
            status,
            message: message.into(),
            body: body.into(),
        }
    }

    /// Create a security token error.
    #[must_use]
    pub fn token(message: impl Into<String>) -> Self {
        Self::Token(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if this failure happened below the HTTP protocol:
    /// network, TLS, deadline expiry, or cancellation.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Tls(_) | Self::Timeout | Self::Cancelled
        )
    }

    /// Returns the HTTP status code if this is a protocol error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this is a protocol error.
    #[must_use]
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::Response { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}
