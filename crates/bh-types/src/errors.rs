use std::path::PathBuf;

use thiserror::Error;

/// Main error type for bhsat
#[derive(Error, Debug)]
pub enum BhError {
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while reading the function descriptor file
#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("Cannot read descriptor file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed descriptor on line {line}: {content:?} (expected `name,dimensionality`)")]
    Malformed { line: usize, content: String },

    #[error("Empty function name on line {line}")]
    EmptyName { line: usize },

    #[error("Invalid dimensionality {value:?} for {name} on line {line}: {message}")]
    InvalidDimension {
        line: usize,
        name: String,
        value: String,
        message: String,
    },
}

/// Errors raised while binding descriptors to native entry points
#[derive(Error, Debug)]
pub enum BindingError {
    #[error("Failed to load objective library {path}: {message}")]
    LibraryLoad { path: PathBuf, message: String },

    #[error("Missing symbol in objective library: {symbol}")]
    MissingSymbol { symbol: String },

    #[error("Dimensionality {dim} of {symbol} does not fit the native call signature")]
    DimensionOverflow { symbol: String, dim: usize },
}

/// Per-function search failures; these are recorded as outcomes, not propagated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("Search timeout: did not finish within {timeout_seconds} seconds")]
    Timeout { timeout_seconds: f64 },

    #[error("Optimizer failed: {message}")]
    Optimizer { message: String },

    #[error("Search worker panicked: {message}")]
    Panicked { message: String },
}

/// Result type alias for bhsat operations
pub type BhResult<T> = Result<T, BhError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::BhError::Config(format!($($arg)*))
    };
}
