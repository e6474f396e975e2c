//! Error types for the unwatermark library.

use std::io;
use thiserror::Error;

/// Result type alias for unwatermark operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while editing a PDF.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing or traversing the PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// A required PDF object is missing.
    #[error("Missing required object: {0}")]
    MissingObject(String),

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// The removal pattern is not a valid regular expression.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// An image size argument could not be parsed.
    #[error("Invalid image size '{0}', expected WIDTH,HEIGHT")]
    InvalidImageSize(String),

    /// The image stream uses an encoding that cannot be decoded.
    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    /// Error decoding or encoding image data.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Encrypted;
        assert_eq!(err.to_string(), "Document is encrypted");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );

        let err = Error::InvalidImageSize("480x201".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid image size '480x201', expected WIDTH,HEIGHT"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_lopdf_error_conversion() {
        let err: Error = lopdf::Error::ObjectNotFound.into();
        assert!(matches!(err, Error::PdfParse(_)));
    }

    #[test]
    fn test_regex_error_conversion() {
        let err: Error = regex::Regex::new("(unclosed").unwrap_err().into();
        assert!(matches!(err, Error::InvalidPattern(_)));
    }
}
