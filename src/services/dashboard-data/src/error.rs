//! Error handling module for the dashboard data core
//!
//! Every failure in this crate is local to a single request: a rejected
//! generation parameter, a malformed query, a lookup that found nothing, or an
//! export that could not be written. None of them poison a [`Session`].
//!
//! [`Session`]: crate::session::Session

use thiserror::Error;

/// Result type alias for dashboard data operations
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Error types for generation, querying and export
#[derive(Error, Debug)]
pub enum DashboardError {
    /// A generation or query parameter was rejected before any work was done
    #[error("Invalid parameter: {field} - {message}")]
    InvalidParameter { field: String, message: String },

    /// A keyed lookup found no matching record
    #[error("Not found: {entity} '{key}'")]
    NotFound { entity: String, key: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// CSV encoding and decoding errors
    #[error("CSV error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    /// File system errors while exporting
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Serialization errors outside of CSV
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl DashboardError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether the caller can fix this by re-issuing a corrected request
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. } | Self::NotFound { .. } | Self::Configuration { .. }
        )
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::NotFound { .. } => "not_found",
            Self::Configuration { .. } => "configuration",
            Self::Csv { .. } => "csv",
            Self::Io { .. } => "io",
            Self::Serialization { .. } => "serialization",
        }
    }
}

impl From<config::ConfigError> for DashboardError {
    fn from(err: config::ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}
