//! # unwatermark
//!
//! Remove watermark links, images and text from PDF documents.
//!
//! Watermarks injected by download sites are usually a hyperlink, a small
//! banner image or a line of text repeated on every page. This library finds
//! them by URL, by image size or name, or by a regular expression, and
//! redacts them from the page content. Pages carrying a watermark can also
//! be dropped entirely.
//!
//! ## Quick Start
//!
//! ```no_run
//! use unwatermark::{remove_watermark, RemovalRequest};
//!
//! fn main() -> unwatermark::Result<()> {
//!     let requests = [
//!         RemovalRequest::link("https://ads.example.com/"),
//!         RemovalRequest::image_size(480, 201),
//!         RemovalRequest::pattern(r"Downloaded from \S+"),
//!     ];
//!     let report = remove_watermark("book.pdf", "book_new.pdf", &requests)?;
//!     println!("{} item(s) removed", report.total());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Link removal**: annotations matched by exact URI, with their area redacted
//! - **Image removal**: by pixel size or XObject name
//! - **Text removal**: regular expressions over reconstructed text lines
//! - **Page removal**: drop every page where a criterion matches
//! - **Image export**: every image XObject written as PNG
//! - **Batch mode**: recursive directory processing

pub mod batch;
pub mod content;
pub mod detect;
pub mod editor;
pub mod error;
pub mod export;
pub mod model;
pub mod page;

// Re-export commonly used types
pub use batch::{collect_pdf_files, output_path_for, BatchJob};
pub use detect::{detect_header_from_bytes, detect_header_from_path, is_pdf, PdfHeader};
pub use editor::{EditOptions, PdfEditor, Redaction, Rgb, SaveOptions, WHITE};
pub use error::{Error, Result};
pub use export::ImageExporter;
pub use model::{
    ExportReport, Filter, ImageFilter, ImageSize, Inventory, JsonFormat, Link, Matrix, PageImage,
    Rect, RemovalReport, RemovalRequest,
};

use std::path::Path;

/// Apply removal requests to a PDF file and save the result.
///
/// # Example
///
/// ```no_run
/// use unwatermark::{remove_watermark, RemovalRequest};
///
/// let requests = [RemovalRequest::link("https://ads.example.com/").remove_page(true)];
/// let report = remove_watermark("in.pdf", "out.pdf", &requests).unwrap();
/// println!("{} page(s) removed", report.pages_removed);
/// ```
pub fn remove_watermark<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    requests: &[RemovalRequest],
) -> Result<RemovalReport> {
    let mut editor = PdfEditor::open(input)?;
    let mut report = RemovalReport::default();
    for request in requests {
        report.merge(&editor.apply(request)?);
    }
    editor.save(output)?;
    Ok(report)
}

/// Export every image of a PDF file as PNG into `dir`.
///
/// # Example
///
/// ```no_run
/// use unwatermark::export_images;
///
/// let report = export_images("book.pdf", "images").unwrap();
/// println!("{} image(s) written", report.exported.len());
/// ```
pub fn export_images<P: AsRef<Path>, Q: AsRef<Path>>(input: P, dir: Q) -> Result<ExportReport> {
    PdfEditor::open(input)?.export_images(dir)
}

/// Builder for one-shot watermark removal.
///
/// # Example
///
/// ```no_run
/// use unwatermark::Unwatermark;
///
/// let report = Unwatermark::new()
///     .with_link("https://ads.example.com/")
///     .with_image_size(480, 201)
///     .with_pattern(r"Downloaded from \S+")
///     .process("book.pdf", "book_new.pdf")?;
/// # Ok::<(), unwatermark::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Unwatermark {
    requests: Vec<RemovalRequest>,
    remove_page: bool,
    edit_options: EditOptions,
    save_options: SaveOptions,
}

impl Unwatermark {
    /// Create a new builder with no removal criteria.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove links pointing at `url`.
    pub fn with_link(mut self, url: impl Into<String>) -> Self {
        self.requests.push(RemovalRequest::link(url));
        self
    }

    /// Remove images of the given pixel size.
    pub fn with_image_size(mut self, width: u32, height: u32) -> Self {
        self.requests.push(RemovalRequest::image_size(width, height));
        self
    }

    /// Remove images with the given XObject name.
    pub fn with_image_name(mut self, name: impl Into<String>) -> Self {
        self.requests.push(RemovalRequest::image_name(name));
        self
    }

    /// Remove text matching a regular expression.
    pub fn with_pattern(mut self, regex: impl Into<String>) -> Self {
        self.requests.push(RemovalRequest::pattern(regex));
        self
    }

    /// Remove whole pages instead of single elements.
    pub fn remove_page(mut self, remove_page: bool) -> Self {
        self.remove_page = remove_page;
        self
    }

    pub fn edit_options(mut self, options: EditOptions) -> Self {
        self.edit_options = options;
        self
    }

    pub fn save_options(mut self, options: SaveOptions) -> Self {
        self.save_options = options;
        self
    }

    /// The requests this builder will apply, in order.
    pub fn requests(&self) -> Vec<RemovalRequest> {
        self.requests
            .iter()
            .cloned()
            .map(|r| r.remove_page(self.remove_page))
            .collect()
    }

    /// Process a file and save the result to `output`.
    pub fn process<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<RemovalReport> {
        let mut editor = PdfEditor::open_with_options(input, self.edit_options.clone())?;
        let report = self.apply_all(&mut editor)?;
        editor.save_with_options(output, &self.save_options)?;
        Ok(report)
    }

    /// Process an in-memory PDF and return the cleaned bytes.
    pub fn process_bytes(&self, data: &[u8]) -> Result<(Vec<u8>, RemovalReport)> {
        let mut editor = PdfEditor::from_bytes_with_options(data, self.edit_options.clone())?;
        let report = self.apply_all(&mut editor)?;
        let bytes = editor.to_bytes(&self.save_options)?;
        Ok((bytes, report))
    }

    fn apply_all(&self, editor: &mut PdfEditor) -> Result<RemovalReport> {
        let mut report = RemovalReport::default();
        for request in self.requests() {
            report.merge(&editor.apply(&request)?);
        }
        Ok(report)
    }
}
