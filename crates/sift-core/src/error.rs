//! Error types shared by every Sift crate.

use std::fmt;

/// Broad classification of an [`Error`].
///
/// Callers use the class to decide what to do with a failure: configuration
/// errors are reported and never retried, transient errors end the current
/// run, recoverable errors are counted and skipped, and conflicts mean
/// "try again later".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad field, search-config, or name configuration.
    Configuration,
    /// Database or search-engine failure; fatal to the current run.
    Transient,
    /// A single row, document, or batch failed; counted and skipped.
    Recoverable,
    /// Another index job holds the lock.
    Conflict,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Configuration => write!(f, "configuration"),
            ErrorClass::Transient => write!(f, "transient"),
            ErrorClass::Recoverable => write!(f, "recoverable"),
            ErrorClass::Conflict => write!(f, "conflict"),
        }
    }
}

/// Errors that can occur while building or maintaining the search index.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid field or search-config configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong with the configuration
        message: String,
    },

    /// A name or parameter failed validation.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What failed validation
        message: String,
    },

    /// The named resource is locked by another job.
    #[error("Resource '{resource}' is already locked")]
    Conflict {
        /// Lock resource name
        resource: String,
    },

    /// A looked-up entity does not exist.
    #[error("Not found: {what}")]
    NotFound {
        /// Description of the missing entity
        what: String,
    },

    /// Relational store failure.
    #[error("Database error: {message}")]
    Database {
        /// Human-readable error message
        message: String,
        /// Driver error if available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Search-engine request failure.
    #[error("Search engine error: {message}")]
    SearchEngine {
        /// Human-readable error message
        message: String,
        /// HTTP status code, when the engine answered
        status: Option<u16>,
        /// Transport error if available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// One item could not be rendered into a document.
    #[error("Failed to build document for item '{item_id}': {message}")]
    DocumentBuild {
        /// Item whose document failed
        item_id: String,
        /// What went wrong
        message: String,
    },

    /// Every row of an indexing run failed to scan.
    #[error("All {rows} rows failed to scan")]
    AllRowsFailed {
        /// Number of rows seen
        rows: usize,
    },

    /// The run was cancelled before it completed.
    #[error("Operation cancelled")]
    Cancelled,

    /// A background job task ended abnormally.
    #[error("Background task failed: {message}")]
    Task {
        /// What happened to the task
        message: String,
    },

    /// I/O error (configuration files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML configuration parse error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Convenience `Result` type alias for Sift operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the taxonomy class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Config { .. } | Error::InvalidArgument { .. } | Error::Toml(_) => {
                ErrorClass::Configuration
            }
            Error::Conflict { .. } => ErrorClass::Conflict,
            Error::DocumentBuild { .. } => ErrorClass::Recoverable,
            Error::NotFound { .. }
            | Error::Database { .. }
            | Error::SearchEngine { .. }
            | Error::AllRowsFailed { .. }
            | Error::Cancelled
            | Error::Task { .. }
            | Error::Io(_)
            | Error::Serialization(_) => ErrorClass::Transient,
        }
    }

    /// Returns whether rerunning the failed operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::Transient | ErrorClass::Conflict)
    }

    /// Returns `true` for lock conflicts.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates a new invalid-argument error.
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a new lock conflict error.
    pub fn conflict<S: Into<String>>(resource: S) -> Self {
        Error::Conflict {
            resource: resource.into(),
        }
    }

    /// Creates a new not-found error.
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Error::NotFound { what: what.into() }
    }

    /// Creates a new database error.
    pub fn database<S: Into<String>>(message: S) -> Self {
        Error::Database {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new database error wrapping a driver error.
    pub fn database_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Database {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new search-engine error.
    pub fn search_engine<S: Into<String>>(message: S) -> Self {
        Error::SearchEngine {
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Creates a search-engine error for a non-success HTTP status.
    pub fn search_engine_status<S: Into<String>>(status: u16, message: S) -> Self {
        Error::SearchEngine {
            message: message.into(),
            status: Some(status),
            source: None,
        }
    }

    /// Creates a new search-engine error wrapping a transport error.
    pub fn search_engine_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::SearchEngine {
            message: message.into(),
            status: None,
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new background-task error.
    pub fn task<S: Into<String>>(message: S) -> Self {
        Error::Task {
            message: message.into(),
        }
    }

    /// Creates a new document-build error.
    pub fn document_build<I, M>(item_id: I, message: M) -> Self
    where
        I: Into<String>,
        M: Into<String>,
    {
        Error::DocumentBuild {
            item_id: item_id.into(),
            message: message.into(),
        }
    }
}
