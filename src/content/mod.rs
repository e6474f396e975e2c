//! Content stream interpretation: glyph and XObject placement, text lines,
//! pattern search.

pub mod font;
pub mod interpreter;
pub mod text;

pub use interpreter::{
    ContentStream, GlyphBox, PageContent, StreamSource, TextRun, XObjectDraw, XObjectKind, PAGE_STREAM,
};
pub use text::{build_lines, find_matches, GlyphRef, TextLine, TextMatch};
