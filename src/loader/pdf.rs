//! PDF rasterization with the pure Rust `hayro` renderer.

use super::PageRange;
use crate::core::{ExtractError, ExtractResult};
use hayro::{InterpreterSettings, Pdf, RenderSettings};
use image::RgbImage;
use std::path::Path;
use std::sync::Arc;

/// PDF user space is 72 units per inch.
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Renders the selected pages of a PDF at `dpi`.
///
/// Returns `(page_index, image)` pairs in page order.
pub fn render_pdf(
    path: &Path,
    dpi: u32,
    range: Option<&PageRange>,
) -> ExtractResult<Vec<(usize, RgbImage)>> {
    let data = std::fs::read(path)
        .map_err(|e| ExtractError::load_error(path, format!("cannot read file: {e}")))?;
    let pdf = Pdf::new(Arc::new(data))
        .map_err(|e| ExtractError::load_error(path, format!("failed to parse PDF: {e:?}")))?;

    let scale = dpi as f32 / PDF_POINTS_PER_INCH;
    let settings = RenderSettings {
        x_scale: scale,
        y_scale: scale,
        ..Default::default()
    };
    let interpreter_settings = InterpreterSettings::default();

    let page_count = pdf.pages().len();
    let mut pages = Vec::new();
    for index in 0..page_count {
        if range.is_some_and(|r| !r.contains(index)) {
            continue;
        }
        let page = pdf
            .pages()
            .get(index)
            .ok_or_else(|| ExtractError::load_error(path, format!("missing page {index}")))?;

        let media_box = page.media_box();
        let width = (media_box.x1 - media_box.x0) as f32;
        let height = (media_box.y1 - media_box.y0) as f32;
        if width <= 0.0 || height <= 0.0 {
            return Err(ExtractError::load_error(
                path,
                format!("page {index} has invalid size {width}x{height}"),
            ));
        }

        let pixmap = hayro::render(page, &interpreter_settings, &settings);
        let rgb: Vec<u8> = pixmap
            .data_as_u8_slice()
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        let image = RgbImage::from_raw(u32::from(pixmap.width()), u32::from(pixmap.height()), rgb)
            .ok_or_else(|| {
                ExtractError::load_error(path, format!("page {index} produced a malformed pixmap"))
            })?;
        pages.push((index, image));
    }
    Ok(pages)
}
