use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Transport-level failure reported by an [`HttpTransport`](crate::api::HttpTransport)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request or the whole resource load exceeded its timeout
    #[error("request timed out")]
    Timeout,

    /// Could not connect to the remote host
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other failure while sending the request or reading the body
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Replace every occurrence of `secret` in the message with `mask`
    pub fn redacted(self, secret: &str, mask: &str) -> Self {
        if secret.is_empty() {
            return self;
        }
        match self {
            TransportError::Timeout => TransportError::Timeout,
            TransportError::Connect(msg) => TransportError::Connect(msg.replace(secret, mask)),
            TransportError::Other(msg) => TransportError::Other(msg.replace(secret, mask)),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the API key in its query string
        let err = err.without_url();
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// Structural detail about a response body that did not match the expected shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// Endpoint the body came from (e.g. "search", "findByIngredients")
    pub endpoint: &'static str,
    /// Path of the offending value inside the body, when known (e.g. `results[2]`)
    pub path: Option<String>,
    /// Parser message, including expected vs. actual type where available
    pub message: String,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} response at `{}`: {}", self.endpoint, path, self.message),
            None => write!(f, "{} response: {}", self.endpoint, self.message),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Classification of non-2xx responses used for diagnostic messaging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorKind {
    /// 401: the API key is invalid or expired
    InvalidCredentials,
    /// 402: the daily quota of the API plan is used up
    QuotaExceeded,
    /// 429: too many requests in a short period
    RateLimited,
    Other,
}

impl ServerErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ServerErrorKind::InvalidCredentials,
            402 => ServerErrorKind::QuotaExceeded,
            429 => ServerErrorKind::RateLimited,
            _ => ServerErrorKind::Other,
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            ServerErrorKind::InvalidCredentials => "API key may be invalid or expired",
            ServerErrorKind::QuotaExceeded => "API quota may be exceeded",
            ServerErrorKind::RateLimited => "too many requests in a short period",
            ServerErrorKind::Other => "server returned an error status",
        }
    }
}

fn server_hint(status: &u16) -> &'static str {
    ServerErrorKind::from_status(*status).hint()
}

/// Errors returned by the recipe API client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecipeApiError {
    /// The request could not be constructed (malformed base URL, bad parameters)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Transport failure, including timeouts
    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    /// Non-2xx response
    #[error("Server error ({status}, {}): {body}", server_hint(.status))]
    Server { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("Failed to decode {0}")]
    Decode(#[from] DecodeError),

    /// 2xx response without a body
    #[error("No data received")]
    NoData,
}

impl RecipeApiError {
    /// Diagnostic class of a server error, `None` for every other variant
    pub fn server_kind(&self) -> Option<ServerErrorKind> {
        match self {
            RecipeApiError::Server { status, .. } => Some(ServerErrorKind::from_status(*status)),
            _ => None,
        }
    }
}

/// Failure of the local key-value store
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Local store I/O error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Local store unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(Arc::new(err))
    }
}

/// Failure of the remote document store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Store could not be reached (offline, timeout)
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// Store refused the operation (permissions, invalid batch)
    #[error("remote store rejected the operation: {0}")]
    Rejected(String),
}

/// Errors surfaced by the favorites synchronization engine.
///
/// Cloneable so one persist result can be handed to every waiting caller.
#[derive(Error, Debug, Clone)]
pub enum FavoritesError {
    #[error("Error saving favorites locally: {0}")]
    Local(#[from] StoreError),

    #[error("Error syncing favorites: {0}")]
    Remote(#[from] RemoteError),

    #[error("Failed to encode favorites: {0}")]
    Encode(Arc<serde_json::Error>),

    /// The persist worker is gone; the engine was dropped
    #[error("Favorites engine stopped")]
    EngineStopped,
}

impl From<serde_json::Error> for FavoritesError {
    fn from(err: serde_json::Error) -> Self {
        FavoritesError::Encode(Arc::new(err))
    }
}

/// Identity provider failure; the message is the provider's own
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    Provider(String),
}

/// Top-level error for the binary and the convenience functions
#[derive(Error, Debug)]
pub enum ForklyError {
    #[error(transparent)]
    Api(#[from] RecipeApiError),

    #[error(transparent)]
    Favorites(#[from] FavoritesError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    /// Required setting is missing after all sources were merged
    #[error("Missing configuration: {0}")]
    MissingConfig(String),
}
