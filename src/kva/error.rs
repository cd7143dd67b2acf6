//! Error types for KVA serialization.

use thiserror::Error;

/// Errors that can occur while reading or writing KVA documents.
#[derive(Error, Debug)]
pub enum KvaError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing or serialization error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Invalid document structure or content
    #[error("Invalid KVA document: {message}")]
    InvalidDocument {
        /// Description of the structural problem
        message: String,
    },

    /// Required element or attribute is missing
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing element/attribute
        field: String,
    },

    /// The file declares a format version below the supported minimum
    #[error("Unsupported KVA format version: {found} (minimum {minimum})")]
    UnsupportedVersion {
        /// Version string found in the file
        found: String,
        /// Oldest version still accepted
        minimum: String,
    },

    /// Drawing element name has no registered factory
    #[error("Unknown drawing type: {name}")]
    UnknownDrawingType {
        /// The XML element name that was not recognized
        name: String,
    },
}

impl KvaError {
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

/// Outcome classification for save operations, surfaced to the UI layer.
///
/// Cancellation is explicit and silent; every other non-success variant maps
/// to a user-facing error dialog category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    Success,
    FileError,
    EncoderError,
    MuxerError,
    Cancelled,
    UnknownError,
}

impl SaveResult {
    /// Classify a serialization error.
    pub fn from_error(err: &KvaError) -> Self {
        match err {
            KvaError::Io(_) => SaveResult::FileError,
            KvaError::Xml(_) => SaveResult::FileError,
            _ => SaveResult::UnknownError,
        }
    }

    pub fn is_success(self) -> bool {
        self == SaveResult::Success
    }

    /// Whether the outcome should raise an error dialog.
    pub fn is_error(self) -> bool {
        !matches!(self, SaveResult::Success | SaveResult::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_silent() {
        assert!(!SaveResult::Cancelled.is_error());
        assert!(!SaveResult::Cancelled.is_success());
        assert!(SaveResult::FileError.is_error());
    }

    #[test]
    fn test_classification() {
        let err = KvaError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(SaveResult::from_error(&err), SaveResult::FileError);

        let err = KvaError::missing_field("Position");
        assert_eq!(SaveResult::from_error(&err), SaveResult::UnknownError);
    }
}
