//! The document editing façade.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use lopdf::{Document, Object, ObjectId};
use regex::Regex;

use crate::content::{build_lines, find_matches, PageContent, TextMatch};
use crate::detect;
use crate::error::{Error, Result};
use crate::export::ImageExporter;
use crate::model::{
    ExportReport, Filter, ImageFilter, Inventory, Link, PageImage, RemovalReport, RemovalRequest,
};
use crate::page::{page_images, page_links, remove_annotations};

use super::options::{EditOptions, SaveOptions};
use super::redact::{apply_redactions, Redaction};

/// An open PDF document with removal operations.
///
/// Page numbers are 1-based. Every removal operation scans all pages first
/// and removes marked pages last, so page numbers stay valid while scanning.
///
/// # Example
///
/// ```no_run
/// use unwatermark::{ImageFilter, PdfEditor};
///
/// let mut editor = PdfEditor::open("report.pdf")?;
/// editor.remove_link("https://ads.example.com/", false)?;
/// editor.remove_image(&ImageFilter::by_size(480, 201), false)?;
/// editor.remove_pattern(r"Downloaded from \S+", false)?;
/// editor.save("report_new.pdf")?;
/// # Ok::<(), unwatermark::Error>(())
/// ```
#[derive(Debug)]
pub struct PdfEditor {
    doc: Document,
    options: EditOptions,
    source: Option<PathBuf>,
}

impl PdfEditor {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, EditOptions::default())
    }

    /// Open a PDF file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: EditOptions) -> Result<Self> {
        let path = path.as_ref();
        let header = detect::detect_header_from_path(path)?;
        debug!("Opening {} ({})", path.display(), header);

        let doc = Document::load(path)?;
        let mut editor = Self::prepare(doc, options)?;
        editor.source = Some(path.to_path_buf());
        Ok(editor)
    }

    /// Load a PDF from memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, EditOptions::default())
    }

    /// Load a PDF from memory with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: EditOptions) -> Result<Self> {
        detect::detect_header_from_bytes(data)?;
        let doc = Document::load_mem(data)?;
        Self::prepare(doc, options)
    }

    /// Wrap an already loaded document.
    pub fn from_document(doc: Document) -> Result<Self> {
        Self::prepare(doc, EditOptions::default())
    }

    fn prepare(mut doc: Document, options: EditOptions) -> Result<Self> {
        if doc.is_encrypted() {
            let password = options.password.as_deref().unwrap_or("");
            doc.decrypt(password).map_err(|_| Error::Encrypted)?;
            doc.trailer.remove(b"Encrypt");
            debug!("Decrypted document");
        }
        Ok(Self {
            doc,
            options,
            source: None,
        })
    }

    pub fn options(&self) -> &EditOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: EditOptions) {
        self.options = options;
    }

    /// Path the document was opened from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.doc
            .get_pages()
            .get(&page)
            .copied()
            .ok_or(Error::PageOutOfRange(page, self.page_count()))
    }

    // ---------------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------------

    /// All link annotations, page by page.
    pub fn links(&self) -> Vec<Link> {
        self.doc
            .get_pages()
            .into_iter()
            .flat_map(|(num, id)| page_links(&self.doc, num, id))
            .collect()
    }

    /// All image XObjects, page by page, with their placements.
    pub fn images(&self) -> Result<Vec<PageImage>> {
        let mut images = Vec::new();
        for (num, id) in self.doc.get_pages() {
            let content = PageContent::load(&self.doc, id)?;
            images.extend(page_images(&self.doc, num, id, Some(&content)));
        }
        Ok(images)
    }

    /// Links and images of the whole document.
    pub fn inventory(&self) -> Result<Inventory> {
        Ok(Inventory {
            version: self.version(),
            pages: self.page_count(),
            links: self.links(),
            images: self.images()?,
        })
    }

    /// Text lines of a page in content order.
    pub fn page_text_lines(&self, page: u32) -> Result<Vec<String>> {
        let content = PageContent::load(&self.doc, self.page_id(page)?)?;
        Ok(build_lines(&content).into_iter().map(|l| l.text).collect())
    }

    /// Occurrences of a pattern on a page.
    pub fn search(&self, page: u32, pattern: &Regex) -> Result<Vec<TextMatch>> {
        let content = PageContent::load(&self.doc, self.page_id(page)?)?;
        Ok(find_matches(&build_lines(&content), pattern))
    }

    // ---------------------------------------------------------------------
    // Removal
    // ---------------------------------------------------------------------

    /// Remove links whose URI equals `url`.
    ///
    /// Returns the number of links removed, or the number of pages removed
    /// when `remove_page` is set.
    pub fn remove_link(&mut self, url: &str, remove_page: bool) -> Result<usize> {
        let mut count = 0;
        let mut marked = BTreeSet::new();

        for (num, page_id) in self.doc.get_pages() {
            let links = page_links(&self.doc, num, page_id);
            for link in &links {
                debug!("Page {} link {:?}", num, link.uri);
            }
            let matched: Vec<&Link> = links.iter().filter(|l| l.points_to(url)).collect();
            if matched.is_empty() {
                continue;
            }
            if remove_page {
                marked.insert(num);
                continue;
            }

            let redactions: Vec<Redaction> = matched
                .iter()
                .map(|l| Redaction::new(l.rect, self.options.link_fill))
                .collect();
            apply_redactions(&mut self.doc, page_id, &redactions, &HashSet::new())?;
            let indices: Vec<usize> = matched.iter().map(|l| l.index).collect();
            remove_annotations(&mut self.doc, page_id, &indices)?;
            count += matched.len();
        }

        if remove_page {
            let pages = self.remove_pages(&marked)?;
            info!("{} page(s) with link {} removed", pages, url);
            return Ok(pages);
        }
        info!("{} link(s) removed", count);
        Ok(count)
    }

    /// Remove images matching `filter` (by size or by name).
    ///
    /// Every draw of a matched image on its page is dropped and the areas
    /// it covered are redacted. Returns the number of matched images, or
    /// the number of pages removed when `remove_page` is set.
    pub fn remove_image(&mut self, filter: &ImageFilter, remove_page: bool) -> Result<usize> {
        let mut count = 0;
        let mut marked = BTreeSet::new();

        for (num, page_id) in self.doc.get_pages() {
            let content = PageContent::load(&self.doc, page_id)?;
            let matched: Vec<PageImage> = page_images(&self.doc, num, page_id, Some(&content))
                .into_iter()
                .filter(|img| filter.matches(img))
                .collect();
            if matched.is_empty() {
                continue;
            }
            if remove_page {
                marked.insert(num);
                continue;
            }

            let mut redactions = Vec::new();
            let mut streams = HashSet::new();
            for image in &matched {
                debug!("Page {} removing image {} ({}x{})", num, image.name, image.width, image.height);
                redactions.extend(
                    image
                        .placements
                        .iter()
                        .map(|rect| Redaction::new(*rect, self.options.image_fill)),
                );
                streams.insert(image.object_id());
            }
            apply_redactions(&mut self.doc, page_id, &redactions, &streams)?;
            count += matched.len();
        }

        if remove_page {
            let pages = self.remove_pages(&marked)?;
            info!("{} page(s) with matching images removed", pages);
            return Ok(pages);
        }
        info!("{} image(s) removed", count);
        Ok(count)
    }

    /// Remove text matching a regular expression.
    ///
    /// Returns the number of occurrences redacted, or the number of pages
    /// removed when `remove_page` is set.
    pub fn remove_pattern(&mut self, regex: &str, remove_page: bool) -> Result<usize> {
        let pattern = Regex::new(regex)?;
        let mut count = 0;
        let mut marked = BTreeSet::new();

        for (num, page_id) in self.doc.get_pages() {
            let content = PageContent::load(&self.doc, page_id)?;
            let matches = find_matches(&build_lines(&content), &pattern);
            if matches.is_empty() {
                continue;
            }
            if remove_page {
                marked.insert(num);
                continue;
            }

            for m in &matches {
                debug!("Page {} match {:?} at {}", num, m.text, m.rect);
            }
            let redactions: Vec<Redaction> = matches
                .iter()
                .map(|m| Redaction::new(m.rect, self.options.text_fill))
                .collect();
            apply_redactions(&mut self.doc, page_id, &redactions, &HashSet::new())?;
            count += matches.len();
        }

        if remove_page {
            let pages = self.remove_pages(&marked)?;
            info!("{} page(s) matching pattern removed", pages);
            return Ok(pages);
        }
        info!("{} item(s) matching pattern removed", count);
        Ok(count)
    }

    /// Remove the given pages. Returns how many were removed.
    pub fn remove_pages(&mut self, pages: &BTreeSet<u32>) -> Result<usize> {
        if pages.is_empty() {
            return Ok(0);
        }
        let total = self.page_count();
        if let Some(&bad) = pages.iter().find(|&&p| p == 0 || p > total) {
            return Err(Error::PageOutOfRange(bad, total));
        }
        let keep: Vec<u32> = (1..=total).filter(|p| !pages.contains(p)).collect();
        self.select_pages(&keep)?;
        Ok(pages.len())
    }

    /// Keep only the listed pages, in document order.
    pub fn select_pages(&mut self, keep: &[u32]) -> Result<()> {
        let total = self.page_count();
        if let Some(&bad) = keep.iter().find(|&&p| p == 0 || p > total) {
            return Err(Error::PageOutOfRange(bad, total));
        }
        let keep: BTreeSet<u32> = keep.iter().copied().collect();
        let delete: Vec<u32> = (1..=total).filter(|p| !keep.contains(p)).collect();
        debug!("Keeping pages {:?}, deleting {:?}", keep, delete);
        self.doc.delete_pages(&delete);
        Ok(())
    }

    /// Apply one removal request.
    pub fn apply(&mut self, request: &RemovalRequest) -> Result<RemovalReport> {
        let mut report = RemovalReport::default();
        let (count, slot) = match &request.filter {
            Filter::Link(url) => (
                self.remove_link(url, request.remove_page)?,
                &mut report.links_removed,
            ),
            Filter::Image(filter) => (
                self.remove_image(filter, request.remove_page)?,
                &mut report.images_removed,
            ),
            Filter::Pattern(regex) => (
                self.remove_pattern(regex, request.remove_page)?,
                &mut report.text_removed,
            ),
        };
        if request.remove_page {
            report.pages_removed = count;
        } else {
            *slot = count;
        }
        Ok(report)
    }

    // ---------------------------------------------------------------------
    // Output
    // ---------------------------------------------------------------------

    /// Export all images as PNG files into `dir`.
    pub fn export_images<P: AsRef<Path>>(&self, dir: P) -> Result<ExportReport> {
        let images = self.images()?;
        ImageExporter::new(&self.doc).export_all(&images, dir)
    }

    /// Save with garbage collection and deflation.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.save_with_options(path, &SaveOptions::default())
    }

    /// Save with explicit options. Missing parent directories are created.
    pub fn save_with_options<P: AsRef<Path>>(&mut self, path: P, options: &SaveOptions) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        self.finish(options)?;
        self.doc.save(path)?;
        info!("Saved {}", path.display());
        Ok(())
    }

    /// Write the document to any writer.
    pub fn save_to<W: Write>(&mut self, writer: &mut W, options: &SaveOptions) -> Result<()> {
        self.finish(options)?;
        self.doc.save_to(writer)?;
        Ok(())
    }

    /// Serialize the document into memory.
    pub fn to_bytes(&mut self, options: &SaveOptions) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.save_to(&mut buf, options)?;
        Ok(buf)
    }

    fn finish(&mut self, options: &SaveOptions) -> Result<()> {
        if options.update_metadata {
            self.stamp_mod_date()?;
        }
        if options.garbage {
            let pruned = self.doc.prune_objects();
            let empty = self.doc.delete_zero_length_streams();
            self.doc.renumber_objects();
            debug!("Dropped {} unused objects, {} empty streams", pruned.len(), empty.len());
        }
        if options.deflate {
            self.doc.compress();
        }
        Ok(())
    }

    fn stamp_mod_date(&mut self) -> Result<()> {
        let stamp = chrono::Utc::now().format("D:%Y%m%d%H%M%S+00'00'").to_string();
        let date = Object::string_literal(stamp);

        match self.doc.trailer.get(b"Info").and_then(Object::as_reference) {
            Ok(info_id) => {
                self.doc.get_dictionary_mut(info_id)?.set("ModDate", date);
            }
            Err(_) => {
                let mut info = lopdf::Dictionary::new();
                info.set("ModDate", date);
                let info_id = self.doc.add_object(info);
                self.doc.trailer.set("Info", Object::Reference(info_id));
            }
        }
        Ok(())
    }
}
