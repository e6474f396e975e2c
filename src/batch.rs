//! Input discovery and sequential processing of many files.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::editor::{EditOptions, PdfEditor, SaveOptions};
use crate::error::{Error, Result};
use crate::model::{ImageSize, RemovalReport, RemovalRequest};

/// Resolve an input path into the PDF files to process.
///
/// A file yields itself. A directory yields every `*.pdf` below it,
/// recursively, in sorted order.
pub fn collect_pdf_files<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }

    let mut files = Vec::new();
    walk(path, &mut files)?;
    files.sort();
    debug!("Found {} PDF file(s) under {}", files.len(), path.display());
    Ok(files)
}

/// Symlinked directories are not followed.
fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walk(&path, files)?;
        } else if has_pdf_extension(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Where the cleaned copy of `input` is written.
///
/// Without an output directory the file lands beside the input as
/// `<stem>_new.pdf`; otherwise it keeps its file name inside `output_dir`.
pub fn output_path_for(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    match output_dir {
        Some(dir) => dir.join(input.file_name().unwrap_or_default()),
        None => {
            let stem = input.file_stem().unwrap_or_default().to_string_lossy();
            input.with_file_name(format!("{}_new.pdf", stem))
        }
    }
}

/// A set of removal criteria applied to every file of a run.
#[derive(Debug, Clone, Default)]
pub struct BatchJob {
    pub links: Vec<String>,
    pub image_sizes: Vec<ImageSize>,
    pub image_names: Vec<String>,
    pub pattern: Option<String>,
    pub remove_page: bool,
    pub edit_options: EditOptions,
    pub save_options: SaveOptions,
}

impl BatchJob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removal requests in application order: links, image sizes,
    /// image names, then the text pattern.
    pub fn requests(&self) -> Vec<RemovalRequest> {
        let links = self.links.iter().map(RemovalRequest::link);
        let sizes = self
            .image_sizes
            .iter()
            .map(|s| RemovalRequest::image_size(s.width, s.height));
        let names = self.image_names.iter().map(RemovalRequest::image_name);
        let pattern = self.pattern.iter().map(RemovalRequest::pattern);

        links
            .chain(sizes)
            .chain(names)
            .chain(pattern)
            .map(|r| r.remove_page(self.remove_page))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
            && self.image_sizes.is_empty()
            && self.image_names.is_empty()
            && self.pattern.is_none()
    }

    /// Process one file and save the result to `output`.
    pub fn run_file(&self, input: &Path, output: &Path) -> Result<RemovalReport> {
        let mut editor = PdfEditor::open_with_options(input, self.edit_options.clone())?;
        let mut report = RemovalReport::default();
        for request in self.requests() {
            report.merge(&editor.apply(&request)?);
        }
        editor.save_with_options(output, &self.save_options)?;
        Ok(report)
    }

    /// Process files one after another. The first failure aborts the run.
    ///
    /// `progress` is called after each file with the input path.
    pub fn run<F>(
        &self,
        files: &[PathBuf],
        output_dir: Option<&Path>,
        mut progress: F,
    ) -> Result<Vec<(PathBuf, RemovalReport)>>
    where
        F: FnMut(&Path),
    {
        let mut results = Vec::with_capacity(files.len());
        for input in files {
            let output = output_path_for(input, output_dir);
            info!("Processing {} -> {}", input.display(), output.display());
            let report = self.run_file(input, &output)?;
            progress(input);
            results.push((output, report));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Filter;
    use tempfile::TempDir;

    #[test]
    fn test_output_path_default() {
        let out = output_path_for(Path::new("/data/book.pdf"), None);
        assert_eq!(out, PathBuf::from("/data/book_new.pdf"));
    }

    #[test]
    fn test_output_path_with_dir() {
        let out = output_path_for(Path::new("/data/sub/book.pdf"), Some(Path::new("/out")));
        assert_eq!(out, PathBuf::from("/out/book.pdf"));
    }

    #[test]
    fn test_collect_pdf_files_recursive() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("z.pdf"), b"%PDF-1.4").unwrap();
        fs::write(nested.join("x.PDF"), b"%PDF-1.4").unwrap();
        fs::write(nested.join("notes.txt"), b"hello").unwrap();

        let files = collect_pdf_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| has_pdf_extension(f)));
        assert!(files.windows(2).all(|w| w[0] <= w[1]));
    }

    #[cfg(unix)]
    #[test]
    fn test_collect_skips_symlinked_dirs() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("a.pdf"), b"%PDF-1.4").unwrap();
        std::os::unix::fs::symlink(dir.path(), sub.join("loop")).unwrap();

        let files = collect_pdf_files(dir.path()).unwrap();
        assert_eq!(files, vec![sub.join("a.pdf")]);
    }

    #[test]
    fn test_collect_single_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("one.pdf");
        fs::write(&file, b"%PDF-1.4").unwrap();
        assert_eq!(collect_pdf_files(&file).unwrap(), vec![file]);
    }

    #[test]
    fn test_collect_missing_path() {
        let result = collect_pdf_files("/definitely/not/here");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_requests_order() {
        let job = BatchJob {
            links: vec!["https://a".into()],
            image_sizes: vec![ImageSize::new(10, 20)],
            image_names: vec!["Im1".into()],
            pattern: Some("foo".into()),
            remove_page: true,
            ..Default::default()
        };
        let requests = job.requests();
        assert_eq!(requests.len(), 4);
        assert!(matches!(requests[0].filter, Filter::Link(_)));
        assert!(matches!(requests[3].filter, Filter::Pattern(_)));
        assert!(requests.iter().all(|r| r.remove_page));
    }

    #[test]
    fn test_empty_job() {
        assert!(BatchJob::new().is_empty());
        assert!(BatchJob::new().requests().is_empty());
    }
}
