//! Error types for the churn report.
//!
//! Errors fall into three families that callers handle differently:
//! configuration problems (fail before any connection is attempted),
//! connectivity problems (the database could not be reached or queried),
//! and data-quality problems (the table came back but cannot be reported on).
//!
//! Errors are serializable so the `--json` output can carry them.

use crate::config::ConfigValidationError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the churn report.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Configuration was missing or malformed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigValidationError),

    /// Could not open a connection to the database.
    #[error("Failed to connect to database: {0}")]
    Connection(String),

    /// The query was rejected or failed while streaming rows.
    #[error("Query failed: {0}")]
    Query(String),

    /// The source returned no rows.
    #[error("Table '{0}' returned no rows")]
    EmptyTable(String),

    /// Column was not found in the table.
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),

    /// No non-missing values in a column that needs a statistic.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// A fetched value could not be decoded into its column type.
    #[error("Failed to decode value: {0}")]
    Decode(String),

    /// The database returned a column type the table builder cannot hold.
    #[error("Column '{column}' has unsupported type {type_name}")]
    UnsupportedColumnType { column: String, type_name: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ReportError>,
    },
}

impl ReportError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ReportError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "INVALID_CONFIG",
            Self::Connection(_) => "CONNECTION_FAILED",
            Self::Query(_) => "QUERY_FAILED",
            Self::EmptyTable(_) => "EMPTY_TABLE",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::Decode(_) => "DECODE_FAILED",
            Self::UnsupportedColumnType { .. } => "UNSUPPORTED_COLUMN_TYPE",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error means the database could not be reached or queried.
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Query(_) => true,
            Self::WithContext { source, .. } => source.is_connectivity(),
            _ => false,
        }
    }

    /// Check if this error is about the contents of the table rather than
    /// the environment it was fetched from.
    pub fn is_data_quality(&self) -> bool {
        match self {
            Self::EmptyTable(_)
            | Self::ColumnNotFound(_)
            | Self::NoValidValues(_)
            | Self::Decode(_)
            | Self::UnsupportedColumnType { .. } => true,
            Self::WithContext { source, .. } => source.is_data_quality(),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for ReportError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(_)
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => ReportError::Connection(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                ReportError::Decode(err.to_string())
            }
            other => ReportError::Query(other.to_string()),
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ReportError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ReportError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ReportError::Polars(e).with_context(context))
    }
}
