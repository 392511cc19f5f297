//! Document loading at two resolutions.
//!
//! A [`Rasterizer`] renders a document into page images plus, on request,
//! embedded text-line geometry. The [`DocumentLoader`] renders the same input
//! twice (working and high resolution), checks that both renders describe the
//! same physical pages in the same order, and assembles [`Page`]s with their
//! per-document page index.

mod file;
mod image_file;
#[cfg(feature = "pdf")]
mod pdf;
#[cfg(feature = "pdf")]
mod pdf_text;
mod text_layer;

pub use file::{FileRasterizer, PageRange, document_name, is_image_file, is_pdf_file};
pub use text_layer::{SidecarTextLayer, sidecar_path};

use crate::core::{ExtractError, ExtractResult};
use crate::domain::{Page, PageRef, TextLines, run_positions};
use image::RgbImage;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Output of one render pass, index-aligned with page order.
#[derive(Debug, Clone, Default)]
pub struct RenderedDocument {
    /// One image per page.
    pub images: Vec<RgbImage>,
    /// Source document name for each page.
    pub names: Vec<String>,
    /// Text-line geometry per page; `None` when it was not requested.
    pub text_lines: Option<Vec<Option<TextLines>>>,
}

impl RenderedDocument {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Renders documents into page images.
pub trait Rasterizer: Send + Sync {
    /// Renders every page of `path` at `dpi`.
    ///
    /// When `with_text` is true the result carries text-line geometry for each
    /// page where it can be extracted.
    fn render(&self, path: &Path, dpi: u32, with_text: bool) -> ExtractResult<RenderedDocument>;
}

/// Loads documents as pairs of working and high-resolution pages.
#[derive(Clone)]
pub struct DocumentLoader {
    rasterizer: Arc<dyn Rasterizer>,
    working_dpi: u32,
    highres_dpi: u32,
}

impl std::fmt::Debug for DocumentLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentLoader")
            .field("working_dpi", &self.working_dpi)
            .field("highres_dpi", &self.highres_dpi)
            .finish_non_exhaustive()
    }
}

impl DocumentLoader {
    pub fn new(rasterizer: Arc<dyn Rasterizer>, working_dpi: u32, highres_dpi: u32) -> Self {
        Self {
            rasterizer,
            working_dpi,
            highres_dpi,
        }
    }

    /// Renders `path` at both resolutions and pairs the pages up.
    ///
    /// Any page that fails to render aborts the whole load.
    pub fn load(&self, path: &Path) -> ExtractResult<Vec<Page>> {
        let working = self.rasterizer.render(path, self.working_dpi, false)?;
        let highres = self.rasterizer.render(path, self.highres_dpi, true)?;
        let pages = assemble_pages(path, working, highres)?;
        debug!(
            target: "tables",
            path = %path.display(),
            pages = pages.len(),
            with_text = pages.iter().filter(|p| p.text_lines.is_some()).count(),
            "Loaded document"
        );
        Ok(pages)
    }
}

/// Pairs a working-resolution render with a high-resolution render.
pub fn assemble_pages(
    path: &Path,
    working: RenderedDocument,
    highres: RenderedDocument,
) -> ExtractResult<Vec<Page>> {
    if working.images.len() != working.names.len() || highres.images.len() != highres.names.len()
    {
        return Err(ExtractError::load_error(
            path,
            "rasterizer returned a different number of names than images",
        ));
    }
    if working.len() != highres.len() {
        return Err(ExtractError::load_error(
            path,
            format!(
                "working render has {} pages but high-resolution render has {}",
                working.len(),
                highres.len()
            ),
        ));
    }
    if let Some(position) = working
        .names
        .iter()
        .zip(&highres.names)
        .position(|(a, b)| a != b)
    {
        return Err(ExtractError::load_error(
            path,
            format!("renders disagree on the document of page {position}"),
        ));
    }

    let mut text_lines = match highres.text_lines {
        Some(lines) if lines.len() != highres.images.len() => {
            return Err(ExtractError::load_error(
                path,
                format!(
                    "text layer has {} pages but the render has {}",
                    lines.len(),
                    highres.images.len()
                ),
            ));
        }
        Some(lines) => lines,
        None => vec![None; highres.images.len()],
    };

    let positions = run_positions(&highres.names);
    let mut pages = Vec::with_capacity(highres.images.len());
    let mut current: Option<Arc<str>> = None;
    for (idx, ((image, highres_image), name)) in working
        .images
        .into_iter()
        .zip(highres.images)
        .zip(&highres.names)
        .enumerate()
    {
        let document = match &current {
            Some(doc) if **doc == **name => doc.clone(),
            _ => {
                let doc: Arc<str> = Arc::from(name.as_str());
                current = Some(doc.clone());
                doc
            }
        };
        pages.push(Page {
            page_ref: PageRef::new(document, positions[idx]),
            image,
            highres_image,
            text_lines: text_lines[idx].take(),
        });
    }
    Ok(pages)
}
