//! Error types
//!
//! Every fallible operation in the query engine returns [`Result`]. Provider
//! failures keep their service, operation and error code so callers can tell
//! a missing entity from a throttled or unauthorised call.

use thiserror::Error;

/// Result type for query operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for query operations
#[derive(Error, Debug)]
pub enum Error {
    /// A key column the retrieval strategy needs was not qualified
    #[error("table '{table}' requires an equality qualifier on column '{column}'")]
    MissingRequiredFilter { table: String, column: String },

    /// A keyed lookup found no matching entity
    #[error("no matching entity in '{table}' ({code})")]
    NotFound { table: String, code: String },

    /// The provider call failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A column value could not be converted
    #[error("column '{column}': {message}")]
    Transform { column: String, message: String },

    /// Query named a table the registry does not know
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// Query named a column the table does not declare
    #[error("unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// A table declaration is inconsistent
    #[error("schema error: {0}")]
    Schema(String),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn transform(column: &str, message: impl Into<String>) -> Self {
        Error::Transform {
            column: column.to_string(),
            message: message.into(),
        }
    }
}

/// Failure reported by the provider transport.
///
/// `code` carries the provider's error type (e.g. `NoSuchDistribution`) when
/// the response included one; `status` is the HTTP status when one was seen.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "{service}.{operation} failed{}{}: {message}",
    status_suffix(.status),
    code_suffix(.code)
)]
pub struct TransportError {
    pub service: String,
    pub operation: String,
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl TransportError {
    pub fn new(service: &str, operation: &str, message: impl Into<String>) -> Self {
        Self {
            service: service.to_string(),
            operation: operation.to_string(),
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// True when the provider error code is one of `codes`
    pub fn is_any_of(&self, codes: &[&str]) -> bool {
        self.code
            .as_deref()
            .map(|code| codes.contains(&code))
            .unwrap_or(false)
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_ref().map(|c| format!(" [{}]", c)).unwrap_or_default()
}
