//! Keybox validation error types

use thiserror::Error;

/// Result type for keybox operations
pub type KeyboxResult<T> = Result<T, KeyboxError>;

/// Errors that can occur while validating a keybox document
#[derive(Debug, Error)]
pub enum KeyboxError {
    /// Bytes are not well-formed XML (or not UTF-8)
    #[error("XML is invalid: {cause}")]
    MalformedXml { cause: String },

    /// A declared count element is present but not a non-negative integer
    #[error("invalid {field} value: {value:?}")]
    InvalidCountField { field: &'static str, value: String },

    /// A Key element lacks one of its required children
    #[error("Key entry is missing its {component} element")]
    MissingKeyComponent { component: &'static str },

    /// The keybox file could not be read
    #[error("failed to read keybox file: {0}")]
    Io(#[from] std::io::Error),
}
