//! PDF header sniffing.
//!
//! Files are checked before they reach `lopdf` so that obviously wrong inputs
//! (HTML error pages, truncated downloads) fail with [`Error::UnknownFormat`]
//! instead of an opaque parser error.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// PDF header information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfHeader {
    /// PDF version (e.g., "1.7", "2.0")
    pub version: String,
    /// Byte offset of the `%PDF-` marker in the file
    pub offset: usize,
}

impl std::fmt::Display for PdfHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// Readers accept junk before the header as long as it starts in the first KB.
const HEADER_SEARCH_LIMIT: usize = 1024;

/// Read the PDF header of a file.
///
/// # Example
/// ```no_run
/// use unwatermark::detect::detect_header_from_path;
///
/// let header = detect_header_from_path("document.pdf").unwrap();
/// println!("PDF version: {}", header.version);
/// ```
pub fn detect_header_from_path<P: AsRef<Path>>(path: P) -> Result<PdfHeader> {
    let file = File::open(path)?;
    let mut head = Vec::with_capacity(HEADER_SEARCH_LIMIT + PDF_MAGIC.len() + VERSION_LEN);
    file.take((HEADER_SEARCH_LIMIT + PDF_MAGIC.len() + VERSION_LEN) as u64)
        .read_to_end(&mut head)?;
    detect_header_from_bytes(&head)
}

/// Read the PDF header from the start of a buffer.
pub fn detect_header_from_bytes(data: &[u8]) -> Result<PdfHeader> {
    let window = &data[..data.len().min(HEADER_SEARCH_LIMIT + PDF_MAGIC.len() + VERSION_LEN)];

    let offset = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .filter(|&pos| pos <= HEADER_SEARCH_LIMIT)
        .ok_or(Error::UnknownFormat)?;

    let start = offset + PDF_MAGIC.len();
    let version_bytes = window
        .get(start..start + VERSION_LEN)
        .ok_or(Error::UnknownFormat)?;
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if !is_valid_version(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    Ok(PdfHeader { version, offset })
}

/// Check if a version string looks like `N.N`.
fn is_valid_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    bytes.len() == 3 && bytes[0].is_ascii_digit() && bytes[1] == b'.' && bytes[2].is_ascii_digit()
}

/// Check if a file starts like a PDF.
pub fn is_pdf<P: AsRef<Path>>(path: P) -> bool {
    detect_header_from_path(path).is_ok()
}

/// Check if bytes start like a PDF.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect_header_from_bytes(data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_valid_pdf() {
        let header = detect_header_from_bytes(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3").unwrap();
        assert_eq!(header.version, "1.7");
        assert_eq!(header.offset, 0);
    }

    #[test]
    fn test_detect_leading_garbage() {
        let mut data = vec![b' '; 100];
        data.extend_from_slice(b"%PDF-1.4\n");
        let header = detect_header_from_bytes(&data).unwrap();
        assert_eq!(header.version, "1.4");
        assert_eq!(header.offset, 100);
    }

    #[test]
    fn test_detect_header_too_far() {
        let mut data = vec![b'x'; HEADER_SEARCH_LIMIT + 10];
        data.extend_from_slice(b"%PDF-1.4\n");
        assert!(matches!(
            detect_header_from_bytes(&data),
            Err(Error::UnknownFormat)
        ));
    }

    #[test]
    fn test_detect_invalid_format() {
        let result = detect_header_from_bytes(b"<!DOCTYPE html>");
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_detect_too_short() {
        assert!(matches!(
            detect_header_from_bytes(b"%PDF"),
            Err(Error::UnknownFormat)
        ));
        assert!(matches!(
            detect_header_from_bytes(b"%PDF-1"),
            Err(Error::UnknownFormat)
        ));
    }

    #[test]
    fn test_detect_bad_version() {
        assert!(matches!(
            detect_header_from_bytes(b"%PDF-abc\n"),
            Err(Error::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_is_pdf_bytes() {
        assert!(is_pdf_bytes(b"%PDF-1.4\n"));
        assert!(!is_pdf_bytes(b"Not a PDF"));
        assert!(!is_pdf_bytes(b""));
    }
}
