//! Document editing: the [`PdfEditor`] façade, redaction and options.

mod document;
mod options;
pub mod redact;

pub use document::PdfEditor;
pub use options::{EditOptions, Rgb, SaveOptions, WHITE};
pub use redact::{apply_redactions, Redaction, RedactionOutcome};
