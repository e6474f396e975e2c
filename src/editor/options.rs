//! Editing and saving options.

/// RGB color with components in `0.0..=1.0`.
pub type Rgb = [f32; 3];

pub const WHITE: Rgb = [1.0, 1.0, 1.0];

/// Options controlling how removals are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOptions {
    /// Fill painted over removed links
    pub link_fill: Option<Rgb>,

    /// Fill painted over removed images
    pub image_fill: Option<Rgb>,

    /// Fill painted over removed text
    pub text_fill: Option<Rgb>,

    /// Password for encrypted documents
    pub password: Option<String>,
}

impl EditOptions {
    /// Create new edit options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fill for removed link areas (`None` leaves them transparent).
    pub fn with_link_fill(mut self, fill: Option<Rgb>) -> Self {
        self.link_fill = fill;
        self
    }

    /// Set the fill for removed image areas.
    pub fn with_image_fill(mut self, fill: Option<Rgb>) -> Self {
        self.image_fill = fill;
        self
    }

    /// Set the fill for removed text areas.
    pub fn with_text_fill(mut self, fill: Option<Rgb>) -> Self {
        self.text_fill = fill;
        self
    }

    /// Set password for encrypted documents.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            link_fill: Some(WHITE),
            image_fill: None,
            text_fill: None,
            password: None,
        }
    }
}

/// Options for writing the edited document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Drop unreferenced objects and empty streams, then renumber
    pub garbage: bool,

    /// Flate-compress uncompressed streams
    pub deflate: bool,

    /// Stamp `/ModDate` in the document info dictionary
    pub update_metadata: bool,
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_garbage(mut self, garbage: bool) -> Self {
        self.garbage = garbage;
        self
    }

    pub fn with_deflate(mut self, deflate: bool) -> Self {
        self.deflate = deflate;
        self
    }

    pub fn with_metadata(mut self, update: bool) -> Self {
        self.update_metadata = update;
        self
    }

    /// Write objects as they are.
    pub fn raw() -> Self {
        Self {
            garbage: false,
            deflate: false,
            update_metadata: false,
        }
    }
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            garbage: true,
            deflate: true,
            update_metadata: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_defaults() {
        let opts = EditOptions::default();
        assert_eq!(opts.link_fill, Some(WHITE));
        assert_eq!(opts.image_fill, None);
        assert_eq!(opts.text_fill, None);
    }

    #[test]
    fn test_edit_builder() {
        let opts = EditOptions::new()
            .with_link_fill(None)
            .with_text_fill(Some([0.0, 0.0, 0.0]))
            .with_password("secret");
        assert!(opts.link_fill.is_none());
        assert_eq!(opts.text_fill, Some([0.0, 0.0, 0.0]));
        assert_eq!(opts.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_save_options() {
        let opts = SaveOptions::default();
        assert!(opts.garbage && opts.deflate && opts.update_metadata);
        let opts = SaveOptions::new().with_deflate(false);
        assert!(!opts.deflate);
        assert_eq!(SaveOptions::raw().with_garbage(true).garbage, true);
    }
}
