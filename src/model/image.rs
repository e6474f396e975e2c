//! Image XObjects referenced from a page.

use lopdf::ObjectId;
use serde::Serialize;

use super::Rect;

/// An image XObject listed in a page's resources.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageImage {
    /// 1-based page number.
    pub page: u32,
    /// Resource name under `/XObject` (e.g. "Im0").
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bits per component (1 for masks).
    pub bits_per_component: u8,
    /// Color space family (e.g. "DeviceRGB", "ICCBased", "Indexed").
    pub color_space: Option<String>,
    /// Last filter in the stream's `/Filter` chain.
    pub filter: Option<String>,
    /// Where the page content draws this image.
    pub placements: Vec<Rect>,

    #[serde(skip)]
    pub(crate) id: ObjectId,
}

impl PageImage {
    /// Object id of the image stream.
    pub fn object_id(&self) -> ObjectId {
        self.id
    }

    /// Bounding box of all placements, if the image is drawn at all.
    pub fn bbox(&self) -> Option<Rect> {
        let mut iter = self.placements.iter();
        let first = *iter.next()?;
        Some(iter.fold(first, |acc, r| acc.union(r)))
    }

    /// File name used when exporting: `pg_<index>_<w>x<h>_<name>.png`.
    ///
    /// The page part is the 0-based page index.
    pub fn export_file_name(&self) -> String {
        format!(
            "pg_{}_{}x{}_{}.png",
            self.page.saturating_sub(1),
            self.width,
            self.height,
            sanitize_name(&self.name)
        )
    }
}

/// Keep resource names usable as file name components.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}
