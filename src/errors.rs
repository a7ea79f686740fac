//! Typed error hierarchy for the back-office console.
//!
//! Three top-level enums cover the three subsystems:
//! - `FormError`: field engine and form state machine failures
//! - `ClientError`: REST API transport and response failures
//! - `ConsoleError`: HTTP surface failures (rendered as responses)

use thiserror::Error;

/// Errors from the field engine and the per-form state machine.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("{field} is required")]
    MissingRequired { field: String },

    #[error("Field name must not be empty (row {index})")]
    EmptyFieldName { index: usize },

    #[error("Duplicate field name '{name}'")]
    DuplicateFieldName { name: String },

    #[error("Select field '{name}' needs at least one option")]
    SelectWithoutOptions { name: String },

    #[error("Template {id} not found")]
    UnknownTemplate { id: i64 },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("A submission is already in flight")]
    SubmissionInFlight,

    #[error("Form is not open")]
    NotOpen,
}

/// Errors from the REST API client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid API base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("HTTP {status} from {path}: {body}")]
    Status {
        status: u16,
        path: String,
        body: String,
    },

    #[error("Request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ClientError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors from the console HTTP surface.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Upstream(#[from] ClientError),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error("Failed to render page: {0}")]
    Render(#[from] handlebars::RenderError),
}
