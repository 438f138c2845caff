//! Error types for webhook provisioning and ingestion.

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Result type alias for crate operations.
pub type GitHubResult<T> = Result<T, GitHubError>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// What went wrong, independent of the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitHubErrorKind {
    // Configuration
    /// No token was configured.
    MissingAuth,
    /// Configuration values are unusable.
    InvalidConfiguration,

    // Remote call, by response status
    /// 400.
    BadRequest,
    /// 401.
    BadCredentials,
    /// 403.
    Forbidden,
    /// 404.
    NotFound,
    /// 422, GitHub's validation failure.
    UnprocessableEntity,
    /// 429.
    RateLimited,
    /// Any 5xx.
    ServerError,
    /// A status the operation does not accept, including other 2xx codes.
    UnexpectedStatus,

    // Transport
    /// The connection could not be established.
    ConnectionFailed,
    /// The request timed out.
    Timeout,
    /// A response body could not be decoded.
    DeserializationError,

    // Reconciliation
    /// Declared properties failed validation.
    InvalidInputs,
    /// A recorded value (such as a hook id) is malformed.
    InvalidParameter,
    /// The shared secret was read before it was generated.
    SecretUnresolved,

    // Delivery
    /// An authenticated delivery carried a malformed payload.
    PayloadParseError,
    /// The application event handler failed.
    HandlerFailed,

    /// Anything else.
    Unknown,
}

impl GitHubErrorKind {
    /// Stable snake_case name, used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingAuth => "missing_auth",
            Self::InvalidConfiguration => "invalid_configuration",
            Self::BadRequest => "bad_request",
            Self::BadCredentials => "bad_credentials",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::UnprocessableEntity => "unprocessable_entity",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::UnexpectedStatus => "unexpected_status",
            Self::ConnectionFailed => "connection_failed",
            Self::Timeout => "timeout",
            Self::DeserializationError => "deserialization_error",
            Self::InvalidInputs => "invalid_inputs",
            Self::InvalidParameter => "invalid_parameter",
            Self::SecretUnresolved => "secret_unresolved",
            Self::PayloadParseError => "payload_parse_error",
            Self::HandlerFailed => "handler_failed",
            Self::Unknown => "unknown",
        }
    }

    /// Classifies a response status.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::BadCredentials,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            422 => Self::UnprocessableEntity,
            429 => Self::RateLimited,
            500..=599 => Self::ServerError,
            _ => Self::UnexpectedStatus,
        }
    }
}

impl fmt::Display for GitHubErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What GitHub sent back with a failed call.
#[derive(Debug, Clone, Default)]
struct ResponseContext {
    status: Option<u16>,
    request_id: Option<String>,
    documentation_url: Option<String>,
    body: Option<String>,
}

/// Crate error: a kind, a message, optional response context and a cause.
#[derive(Error, Debug)]
pub struct GitHubError {
    kind: GitHubErrorKind,
    message: String,
    response: ResponseContext,
    #[source]
    cause: Option<BoxError>,
}

impl fmt::Display for GitHubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        match (self.response.status, self.response.request_id.as_deref()) {
            (Some(status), Some(id)) => write!(f, " (HTTP {}, request {})", status, id),
            (Some(status), None) => write!(f, " (HTTP {})", status),
            (None, Some(id)) => write!(f, " (request {})", id),
            (None, None) => Ok(()),
        }
    }
}

impl GitHubError {
    /// Creates an error without response context.
    pub fn new(kind: GitHubErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            response: ResponseContext::default(),
            cause: None,
        }
    }

    /// Creates an error for a rejected remote call.
    pub fn from_response(
        status: u16,
        message: impl Into<String>,
        documentation_url: Option<String>,
        request_id: Option<String>,
    ) -> Self {
        let mut error = Self::new(GitHubErrorKind::from_status(status), message);
        error.response = ResponseContext {
            status: Some(status),
            request_id,
            documentation_url,
            body: None,
        };
        error
    }

    /// Records the response status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.response.status = Some(status);
        self
    }

    /// Records the full response body.
    pub fn with_response_body(mut self, body: impl Into<String>) -> Self {
        self.response.body = Some(body.into());
        self
    }

    /// Sets the underlying cause.
    pub fn with_cause(self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.with_boxed_cause(Box::new(cause))
    }

    /// Sets an already boxed cause.
    pub fn with_boxed_cause(mut self, cause: BoxError) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Appends a note to the message.
    pub(crate) fn annotate(mut self, note: impl AsRef<str>) -> Self {
        self.message = format!("{}; {}", self.message, note.as_ref());
        self
    }

    /// Gets the error kind.
    pub fn kind(&self) -> &GitHubErrorKind {
        &self.kind
    }

    /// Gets the message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the response status, if a response was received.
    pub fn status_code(&self) -> Option<u16> {
        self.response.status
    }

    /// Gets GitHub's request id.
    pub fn request_id(&self) -> Option<&str> {
        self.response.request_id.as_deref()
    }

    /// Gets GitHub's documentation link.
    pub fn documentation_url(&self) -> Option<&str> {
        self.response.documentation_url.as_deref()
    }

    /// Gets the full response body.
    pub fn response_body(&self) -> Option<&str> {
        self.response.body.as_deref()
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::InvalidConfiguration, message)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::Timeout, message)
    }

    /// Creates a validation error for declared properties.
    pub fn invalid_inputs(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::InvalidInputs, message)
    }

    /// Creates a response decoding error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::DeserializationError, message)
    }
}
