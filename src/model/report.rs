use std::path::PathBuf;

use serde::Serialize;

use crate::error::{Error, Result};

use super::{Link, PageImage};

/// Counters accumulated while processing one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemovalReport {
    pub links_removed: usize,
    pub images_removed: usize,
    pub text_removed: usize,
    pub pages_removed: usize,
}

impl RemovalReport {
    pub fn total(&self) -> usize {
        self.links_removed + self.images_removed + self.text_removed + self.pages_removed
    }

    /// Add another report's counters to this one.
    pub fn merge(&mut self, other: &RemovalReport) {
        self.links_removed += other.links_removed;
        self.images_removed += other.images_removed;
        self.text_removed += other.text_removed;
        self.pages_removed += other.pages_removed;
    }
}

/// Outcome of an image export run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    /// Files written.
    pub exported: Vec<PathBuf>,
    /// Images whose target file already existed.
    pub duplicates: usize,
    /// Images that could not be decoded, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// What a document contains that can be removed.
#[derive(Debug, Clone, Serialize)]
pub struct Inventory {
    pub version: String,
    pub pages: u32,
    pub links: Vec<Link>,
    pub images: Vec<PageImage>,
}

impl Inventory {
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        let result = match format {
            JsonFormat::Pretty => serde_json::to_string_pretty(self),
            JsonFormat::Compact => serde_json::to_string(self),
        };
        result.map_err(|e| Error::Other(format!("JSON serialization error: {}", e)))
    }
}
