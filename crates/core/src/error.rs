//! Error types for conversion operations

use thiserror::Error;

/// Error types for conversion operations
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The source document could not be decoded into its typed tree.
    ///
    /// Covers malformed fields and unknown union discriminators; both are
    /// terminal for the conversion.
    #[error("failed to decode {format} document at `{path}`: {message}")]
    Decode {
        format: &'static str,
        path: String,
        message: String,
    },

    /// YAML/JSON serialization of the converted pipeline failed
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// No converter is registered for the requested source format
    #[error("Unknown format '{format}'. Available: {available}")]
    UnknownFormat { format: String, available: String },
}

/// Result type for conversion operations
pub type ConvertResult<T> = std::result::Result<T, ConvertError>;
