use serde::Serialize;

use super::Rect;

/// A link annotation on a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    /// 1-based page number.
    pub page: u32,
    /// Position in the page's `/Annots` array.
    pub index: usize,
    /// Target URI for `/URI` actions; `None` for internal or other actions.
    pub uri: Option<String>,
    /// Clickable area in page space.
    pub rect: Rect,
}

impl Link {
    /// Exact URI comparison.
    pub fn points_to(&self, url: &str) -> bool {
        self.uri.as_deref() == Some(url)
    }
}
