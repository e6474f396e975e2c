//! Removal requests: what to look for and what to do with a match.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::PageImage;

/// Exact pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FromStr for ImageSize {
    type Err = Error;

    /// Parse `WIDTH,HEIGHT` (whitespace around the numbers is ignored).
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidImageSize(s.to_string());
        let (w, h) = s.split_once(',').ok_or_else(invalid)?;
        let width = w.trim().parse().map_err(|_| invalid())?;
        let height = h.trim().parse().map_err(|_| invalid())?;
        Ok(Self { width, height })
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.width, self.height)
    }
}

/// Image selection by exact size, by resource name, or either.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageFilter {
    pub size: Option<ImageSize>,
    pub name: Option<String>,
}

impl ImageFilter {
    pub fn by_size(width: u32, height: u32) -> Self {
        Self {
            size: Some(ImageSize::new(width, height)),
            name: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            size: None,
            name: Some(name.into()),
        }
    }

    /// An image matches when its size equals `size` or its name equals `name`.
    /// An empty filter matches nothing.
    pub fn matches(&self, image: &PageImage) -> bool {
        let size_hit = self
            .size
            .is_some_and(|s| s.width == image.width && s.height == image.height);
        let name_hit = self.name.as_deref().is_some_and(|n| n == image.name);
        size_hit || name_hit
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_none() && self.name.is_none()
    }
}

/// What a request looks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Link annotations whose URI equals this string exactly.
    Link(String),
    /// Image XObjects.
    Image(ImageFilter),
    /// Text matching this regular expression.
    Pattern(String),
}

/// A filter plus the action taken on a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalRequest {
    pub filter: Filter,
    /// Remove the whole page instead of only the matched element.
    pub remove_page: bool,
}

impl RemovalRequest {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            remove_page: false,
        }
    }

    pub fn link(url: impl Into<String>) -> Self {
        Self::new(Filter::Link(url.into()))
    }

    pub fn image_size(width: u32, height: u32) -> Self {
        Self::new(Filter::Image(ImageFilter::by_size(width, height)))
    }

    pub fn image_name(name: impl Into<String>) -> Self {
        Self::new(Filter::Image(ImageFilter::by_name(name)))
    }

    pub fn pattern(regex: impl Into<String>) -> Self {
        Self::new(Filter::Pattern(regex.into()))
    }

    /// Set whether a match removes its page.
    pub fn remove_page(mut self, remove_page: bool) -> Self {
        self.remove_page = remove_page;
        self
    }
}
