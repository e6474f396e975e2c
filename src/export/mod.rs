//! Image export to PNG files.

pub mod filters;
pub mod pixmap;

use std::fs;
use std::path::Path;

use image::{DynamicImage, ImageFormat};
use log::{debug, info, warn};
use lopdf::{Document, Object};

use crate::error::{Error, Result};
use crate::model::{ExportReport, PageImage};

pub use pixmap::{cmyk_to_rgb, ColorSpace};

/// Writes image XObjects of a document as PNG files.
pub struct ImageExporter<'a> {
    doc: &'a Document,
}

impl<'a> ImageExporter<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self { doc }
    }

    /// Decode one image to gray or RGB pixels.
    pub fn decode(&self, image: &PageImage) -> Result<DynamicImage> {
        let stream = self
            .doc
            .get_object(image.object_id())
            .and_then(Object::as_stream)
            .map_err(|_| Error::MissingObject(format!("image stream {:?}", image.object_id())))?;
        pixmap::decode_image(self.doc, stream)
    }

    /// Export every image into `dir`, named by [`PageImage::export_file_name`].
    ///
    /// Existing files are never overwritten; images that cannot be decoded
    /// are reported in [`ExportReport::skipped`].
    pub fn export_all<P: AsRef<Path>>(&self, images: &[PageImage], dir: P) -> Result<ExportReport> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let mut report = ExportReport::default();
        for image in images {
            debug!(
                "Page {} image {}: {}x{} {:?} {:?}",
                image.page, image.name, image.width, image.height, image.color_space, image.filter
            );
            let path = dir.join(image.export_file_name());
            if path.exists() {
                info!("Duplicate image {}", path.display());
                report.duplicates += 1;
                continue;
            }

            let pixels = match self.decode(image) {
                Ok(pixels) => pixels,
                Err(e @ (Error::UnsupportedImage(_) | Error::Image(_) | Error::PdfParse(_))) => {
                    warn!("Skipping image {} on page {}: {}", image.name, image.page, e);
                    report.skipped.push((image.export_file_name(), e.to_string()));
                    continue;
                }
                Err(e) => return Err(e),
            };

            pixels.save_with_format(&path, ImageFormat::Png)?;
            info!("{} is saved", path.display());
            report.exported.push(path);
        }

        info!("{} image(s) exported", report.exported.len());
        Ok(report)
    }
}
