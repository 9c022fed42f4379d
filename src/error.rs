//! Error types for query-part lookup, editing and rendering

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// No part definition is registered for the requested category and type
    #[error("Could not find query part {part_type} (category: {})", .category.as_deref().unwrap_or("none"))]
    PartNotFound {
        /// Type name that failed to resolve
        part_type: String,
        /// Category label the lookup used, if any
        category: Option<String>,
    },

    /// Group-by expression does not match `name(arg)`
    #[error("Parse error: {0}")]
    Parse(String),

    /// Interval literal could not be converted to seconds
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    /// A part parameter holds a value its renderer cannot use
    #[error("Invalid parameter {index} for part {part_type}: {value:?}")]
    InvalidParam {
        /// Type name of the part
        part_type: String,
        /// Parameter position
        index: usize,
        /// Offending value
        value: String,
    },

    /// Edit addressed a pipeline, part or clause that does not exist
    #[error("{what} index {index} out of range (len {len})")]
    InvalidIndex {
        /// What was being indexed
        what: &'static str,
        /// Requested index
        index: usize,
        /// Length of the indexed list
        len: usize,
    },

    /// Query shape rejected by the configured render policy
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    /// JSON round-trip through template substitution failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short, stable label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Error::PartNotFound { .. } => "part_not_found",
            Error::Parse(_) => "parse",
            Error::InvalidInterval(_) => "invalid_interval",
            Error::InvalidParam { .. } => "invalid_param",
            Error::InvalidIndex { .. } => "invalid_index",
            Error::UnsupportedQuery(_) => "unsupported_query",
            Error::Serialization(_) => "serialization",
            Error::Configuration(_) => "configuration",
            Error::Io(_) => "io",
        }
    }

    pub(crate) fn part_not_found(part_type: &str, category: Option<&str>) -> Self {
        Error::PartNotFound {
            part_type: part_type.to_string(),
            category: category.map(str::to_string),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
