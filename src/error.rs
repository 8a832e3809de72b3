//! Error types for the runner.
//!
//! `RunnerError` is the top-level error surfaced to the CLI. Compile-time
//! failures of the filter compiler have their own enum so callers can match
//! on the offending operator, and per-statement execution failures are kept
//! in-band as `StatementError` rather than aborting a batch.

use thiserror::Error;

/// Main error type for runner operations.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors outside of a batch (e.g. a one-off select).
    #[error("Query error: {0}")]
    Query(String),

    /// Configuration errors (invalid config file, unknown dialect, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed filter or selection request.
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// Reading input buffers or spec files failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RunnerError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Config(_) => "Configuration Error",
            Self::Compile(_) => "Compile Error",
            Self::Io(_) => "I/O Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using RunnerError.
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Failure to turn a filter/selection request into SQL.
///
/// These are hard failures: no partial fragment is ever returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("unknown filter operator `{0}`")]
    InvalidOperator(String),

    #[error("operator `{operator}` expects {expected} value(s), got {actual}")]
    InvalidFilterArity {
        operator: String,
        expected: &'static str,
        actual: usize,
    },

    #[error("{0} name cannot be empty")]
    EmptyIdentifier(&'static str),

    #[error("unknown SQL dialect `{0}`")]
    UnknownDialect(String),
}

/// Failure of a single statement inside a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatementError {
    /// The database (or driver) rejected the statement.
    #[error("{0}")]
    Execution(String),

    /// The statement was interrupted by the batch cancellation token.
    #[error("Query was cancelled")]
    Cancelled,
}

impl StatementError {
    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Returns true if this error marks a cancelled statement.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
