//! Filesystem-backed rasterizer for PDFs, images and directories of either.

use super::text_layer::SidecarTextLayer;
use super::{RenderedDocument, Rasterizer, image_file};
use crate::core::{ExtractError, ExtractResult};
use crate::domain::TextLines;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp"];

/// A range of 0-based page indices, applied to every document.
///
/// `end` is exclusive; `None` runs to the last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: usize,
    #[serde(default)]
    pub end: Option<usize>,
}

impl PageRange {
    pub fn new(start: usize, end: Option<usize>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && self.end.is_none_or(|end| index < end)
    }

    /// Parses `START:END`, `START:` or a single page `N`.
    pub fn parse(value: &str) -> Result<Self, String> {
        let parse_index = |s: &str| {
            s.trim()
                .parse::<usize>()
                .map_err(|e| format!("invalid page index '{s}': {e}"))
        };
        let range = match value.split_once(':') {
            Some((start, end)) => {
                let start = if start.trim().is_empty() {
                    0
                } else {
                    parse_index(start)?
                };
                let end = if end.trim().is_empty() {
                    None
                } else {
                    Some(parse_index(end)?)
                };
                Self::new(start, end)
            }
            None => {
                let page = parse_index(value)?;
                Self::new(page, Some(page + 1))
            }
        };
        if range.end.is_some_and(|end| end <= range.start) {
            return Err(format!("page range '{value}' is empty"));
        }
        Ok(range)
    }
}

/// Returns true if the path has a `.pdf` extension.
pub fn is_pdf_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Returns true if the path has a supported raster image extension.
pub fn is_image_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Document name for a file: its file name up to the first `.`.
pub fn document_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.split('.').next() {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => file_name,
    }
}

/// Rasterizes PDFs (with the `pdf` feature), images, or a directory of them.
///
/// Directory inputs are processed file by file in name order; every file is
/// its own document. Raster images are a single page at their native
/// resolution regardless of the requested DPI. Text-line geometry is read
/// from a PDF's own text layer, unless a `<name>.textlines.json` sidecar next
/// to the document provides it.
#[derive(Debug, Clone, Default)]
pub struct FileRasterizer {
    page_range: Option<PageRange>,
}

impl FileRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_range(mut self, page_range: Option<PageRange>) -> Self {
        self.page_range = page_range;
        self
    }

    fn collect_documents(dir: &Path) -> ExtractResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)
            .map_err(|e| ExtractError::load_error(dir, format!("cannot read directory: {e}")))?
        {
            let path = entry?.path();
            if path.is_file() && (is_pdf_file(&path) || is_image_file(&path)) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn render_file(&self, path: &Path, dpi: u32) -> ExtractResult<Vec<(usize, RgbImage)>> {
        if is_pdf_file(path) {
            return render_pdf(path, dpi, self.page_range.as_ref());
        }
        if is_image_file(path) {
            let selected = self.page_range.is_none_or(|r| r.contains(0));
            if !selected {
                return Ok(Vec::new());
            }
            return Ok(vec![(0, image_file::render_image(path)?)]);
        }
        Err(ExtractError::load_error(path, "unsupported document type"))
    }

    /// Text lines for the rendered `pages` of `path`, sidecar first.
    fn text_layer(
        &self,
        path: &Path,
        pages: &[(usize, RgbImage)],
    ) -> ExtractResult<Vec<Option<TextLines>>> {
        if let Some(layer) = SidecarTextLayer::load_for(path)? {
            return Ok(pages
                .iter()
                .map(|(idx, _)| layer.page(*idx).cloned())
                .collect());
        }
        let mut embedded: HashMap<usize, Option<TextLines>> =
            embedded_text_lines(path, self.page_range.as_ref())?
                .into_iter()
                .collect();
        Ok(pages
            .iter()
            .map(|(idx, _)| embedded.remove(idx).flatten())
            .collect())
    }
}

#[cfg(feature = "pdf")]
fn embedded_text_lines(
    path: &Path,
    range: Option<&PageRange>,
) -> ExtractResult<Vec<(usize, Option<TextLines>)>> {
    if !is_pdf_file(path) {
        return Ok(Vec::new());
    }
    super::pdf_text::extract_text_lines(path, range)
}

#[cfg(not(feature = "pdf"))]
fn embedded_text_lines(
    _path: &Path,
    _range: Option<&PageRange>,
) -> ExtractResult<Vec<(usize, Option<TextLines>)>> {
    Ok(Vec::new())
}

#[cfg(feature = "pdf")]
fn render_pdf(
    path: &Path,
    dpi: u32,
    range: Option<&PageRange>,
) -> ExtractResult<Vec<(usize, RgbImage)>> {
    super::pdf::render_pdf(path, dpi, range)
}

#[cfg(not(feature = "pdf"))]
fn render_pdf(
    path: &Path,
    _dpi: u32,
    _range: Option<&PageRange>,
) -> ExtractResult<Vec<(usize, RgbImage)>> {
    Err(ExtractError::load_error(
        path,
        "PDF input requires the `pdf` feature",
    ))
}

impl Rasterizer for FileRasterizer {
    fn render(&self, path: &Path, dpi: u32, with_text: bool) -> ExtractResult<RenderedDocument> {
        if !path.exists() {
            return Err(ExtractError::load_error(path, "no such file or directory"));
        }
        let files = if path.is_dir() {
            Self::collect_documents(path)?
        } else {
            vec![path.to_path_buf()]
        };
        if files.is_empty() {
            return Err(ExtractError::load_error(path, "no supported documents found"));
        }

        let mut rendered = RenderedDocument {
            images: Vec::new(),
            names: Vec::new(),
            text_lines: with_text.then(Vec::new),
        };
        for file in &files {
            let name = document_name(file);
            let pages = self.render_file(file, dpi)?;
            debug!(
                target: "tables",
                document = %name,
                dpi,
                pages = pages.len(),
                "Rendered document"
            );

            if let Some(lines) = rendered.text_lines.as_mut() {
                lines.extend(self.text_layer(file, &pages)?);
            }
            for (_, image) in pages {
                rendered.images.push(image);
                rendered.names.push(name.clone());
            }
        }
        Ok(rendered)
    }
}
