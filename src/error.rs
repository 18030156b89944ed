//! Unified error hierarchy for runboard
//!
//! Aggregation never fails: bad paces, empty inputs and missing optional fields are
//! turned into sentinel values. Errors only exist at the edges, when activity data is
//! loaded or derived views are written out.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all runboard operations
#[derive(Debug, Error)]
pub enum RunboardError {
    /// Activity data could not be loaded
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// A derived view could not be exported
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while reading the activity file
#[derive(Debug, Error)]
pub enum LoadError {
    /// File not found at specified path
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// The file is not a valid activity document
    #[error("Parse error: {reason}")]
    Parse { reason: String },

    /// A single record violates the data model
    #[error("Invalid activity {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
}

/// Errors raised while writing derived views
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Unsupported view for {format}: {view}")]
    UnsupportedView { format: String, view: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for runboard operations
pub type Result<T> = std::result::Result<T, RunboardError>;

impl RunboardError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RunboardError::Load(LoadError::FileNotFound { .. }) => ErrorSeverity::Warning,
            RunboardError::Load(LoadError::InvalidRecord { .. }) => ErrorSeverity::Warning,
            RunboardError::Validation(_) => ErrorSeverity::Warning,
            RunboardError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            RunboardError::Load(LoadError::FileNotFound { path }) => {
                format!("Could not find activity file: {}", path.display())
            }
            RunboardError::Load(LoadError::Parse { reason }) => {
                format!("Activity file is not valid JSON: {}", reason)
            }
            RunboardError::Load(LoadError::InvalidRecord { id, reason }) => {
                format!("Activity '{}' is invalid: {}", id, reason)
            }
            RunboardError::Export(ExportError::UnsupportedFormat(format)) => {
                format!("Cannot export as '{}'. Use json, csv or text.", format)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
