//! Pages produced by the document loader and the embedded text geometry they carry.

use super::geometry::BoundingBox;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identifies the page a piece of data came from.
///
/// `page_index` is the 0-based position of the page within its own document,
/// as assigned by [`run_positions`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageRef {
    /// Name of the source document.
    pub document: Arc<str>,
    /// 0-based page index within the document.
    pub page_index: usize,
}

impl PageRef {
    pub fn new(document: impl Into<Arc<str>>, page_index: usize) -> Self {
        Self {
            document: document.into(),
            page_index,
        }
    }

    /// The 1-based page number reported in results.
    pub fn page_number(&self) -> usize {
        self.page_index + 1
    }
}

/// A single span of text with its position in page space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub bbox: BoundingBox,
    pub text: String,
}

/// A line of embedded text made of one or more spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub bbox: BoundingBox,
    #[serde(default)]
    pub spans: Vec<TextSpan>,
}

/// Text-line geometry embedded in a page.
///
/// Coordinates are in page space (for PDFs, points), described by
/// `page_width` x `page_height`. Consumers rescale into image space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLines {
    pub page_width: f32,
    pub page_height: f32,
    #[serde(default)]
    pub lines: Vec<TextLine>,
}

impl TextLines {
    pub fn page_size(&self) -> (f32, f32) {
        (self.page_width, self.page_height)
    }
}

/// One physical page rendered at both resolutions.
#[derive(Debug, Clone)]
pub struct Page {
    /// Source document and page index.
    pub page_ref: PageRef,
    /// Working-resolution raster used for layout detection.
    pub image: RgbImage,
    /// High-resolution raster used for table crops.
    pub highres_image: RgbImage,
    /// Embedded text-line geometry, when the document has a text layer.
    pub text_lines: Option<TextLines>,
}

impl Page {
    /// Working-resolution image size as floats.
    pub fn image_size(&self) -> (f32, f32) {
        let (w, h) = self.image.dimensions();
        (w as f32, h as f32)
    }

    /// High-resolution image size as floats.
    pub fn highres_size(&self) -> (f32, f32) {
        let (w, h) = self.highres_image.dimensions();
        (w as f32, h as f32)
    }
}

/// Computes each page's position within its run of same-named pages.
///
/// The counter resets to 0 whenever the document name changes and otherwise
/// increments by one, so `[A, A, B, A]` yields `[0, 1, 0, 0]`.
pub fn run_positions<S: AsRef<str>>(names: &[S]) -> Vec<usize> {
    let mut positions: Vec<usize> = Vec::with_capacity(names.len());
    let mut previous: Option<&str> = None;
    for name in names {
        let name = name.as_ref();
        let position = match (previous, positions.last()) {
            (Some(prev), Some(&last)) if prev == name => last + 1,
            _ => 0,
        };
        positions.push(position);
        previous = Some(name);
    }
    positions
}
