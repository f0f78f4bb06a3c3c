//! Error types for completion calls and controller operations

use crate::state::FormField;

/// Shown for every failed completion. Details go to the log only.
pub const GENERIC_FAILURE_NOTICE: &str = "Ein Fehler ist aufgetreten. Bitte versuche es später erneut.";

/// Shown when a required form field is empty.
pub const VALIDATION_NOTICE: &str = "Bitte fülle alle Felder aus.";

/// Errors produced by a completion service call.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// No API key was found in the environment or the config file.
    #[error("missing API key for {provider}")]
    MissingApiKey { provider: String },

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The HTTP request did not complete (network, timeout, TLS).
    #[error("API request failed: {0}")]
    Request(String),

    /// The provider answered with a non-success status.
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("API response parse failed: {0}")]
    Parse(String),

    /// The provider answered, but without any assistant text.
    #[error("API returned an empty reply")]
    EmptyReply,
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            CompletionError::Parse(e.to_string())
        } else {
            CompletionError::Request(e.to_string())
        }
    }
}

/// Errors returned by the conversation controller operations.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// A required form field is empty; no request was sent.
    #[error("required field '{field}' is empty")]
    Validation { field: FormField },

    /// Another completion request is still outstanding.
    #[error("a request is already in flight")]
    Busy,

    /// Follow-up attempted before the first inspiration arrived.
    #[error("conversation has not started yet")]
    NotStarted,

    /// The completion service did not yield a usable reply.
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

impl ControllerError {
    /// Generic, non-diagnostic text for the blocking user notification
    pub fn notice(&self) -> &'static str {
        match self {
            ControllerError::Validation { .. } => VALIDATION_NOTICE,
            ControllerError::Busy => "Bitte warte, bis die aktuelle Antwort da ist.",
            ControllerError::NotStarted => "Bitte hole dir zuerst deine Berufsinspirationen.",
            ControllerError::Completion(_) => GENERIC_FAILURE_NOTICE,
        }
    }
}
