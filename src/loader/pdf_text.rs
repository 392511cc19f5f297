//! Embedded text-line geometry read from PDFs through pdfium.
//!
//! pdfium reports text as segments, runs of characters sharing a baseline.
//! Each segment becomes one span. Spans on the same row are joined into a
//! line until the horizontal gap to the next span grows wider than the row
//! is tall, so separate table cells on one row stay separate lines.

use super::PageRange;
use crate::core::{ExtractError, ExtractResult};
use crate::domain::{BoundingBox, TextLine, TextLines, TextSpan};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, warn};

/// Gap between spans, relative to row height, that starts a new line.
const LINE_GAP_FACTOR: f32 = 1.0;

/// Reads the text layer of every selected page of `path`.
///
/// Returns `(page_index, lines)` pairs in page order, `None` for pages
/// without text. When the pdfium library cannot be found no page has a text
/// layer and every table falls back to cell detection.
pub fn extract_text_lines(
    path: &Path,
    range: Option<&PageRange>,
) -> ExtractResult<Vec<(usize, Option<TextLines>)>> {
    let bindings = match Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
    {
        Ok(bindings) => bindings,
        Err(e) => {
            warn!(
                target: "tables",
                path = %path.display(),
                error = %e,
                "pdfium not available, PDF text layer skipped"
            );
            return Ok(Vec::new());
        }
    };
    let pdfium = Pdfium::new(bindings);
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| ExtractError::load_error(path, format!("failed to open PDF text: {e}")))?;

    let mut pages = Vec::new();
    for (index, page) in document.pages().iter().enumerate() {
        if range.is_some_and(|r| !r.contains(index)) {
            continue;
        }
        let page_width = page.width().value;
        let page_height = page.height().value;
        let text = page.text().map_err(|e| {
            ExtractError::load_error(path, format!("failed to read text of page {index}: {e}"))
        })?;

        let spans: Vec<TextSpan> = text
            .segments()
            .iter()
            .filter_map(|segment| {
                let content = segment.text();
                if content.trim().is_empty() {
                    return None;
                }
                let bounds = segment.bounds();
                // pdfium's origin is bottom-left; page space here is top-left.
                let bbox = BoundingBox::from_coords(
                    bounds.left().value,
                    page_height - bounds.top().value,
                    bounds.right().value,
                    page_height - bounds.bottom().value,
                );
                Some(TextSpan {
                    bbox,
                    text: content,
                })
            })
            .collect();

        debug!(
            target: "tables",
            page = index + 1,
            spans = spans.len(),
            "Read PDF text layer"
        );
        let lines = (!spans.is_empty()).then(|| TextLines {
            page_width,
            page_height,
            lines: group_into_lines(spans),
        });
        pages.push((index, lines));
    }
    Ok(pages)
}

/// Joins spans into lines, top to bottom and left to right.
pub fn group_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.sort_by(|a, b| center_y(&a.bbox).total_cmp(&center_y(&b.bbox)));

    let mut rows: Vec<(BoundingBox, Vec<TextSpan>)> = Vec::new();
    for span in spans {
        let y = center_y(&span.bbox);
        match rows.last_mut() {
            Some((bbox, members)) if y >= bbox.y_min() && y <= bbox.y_max() => {
                *bbox = bbox.union(&span.bbox);
                members.push(span);
            }
            _ => rows.push((span.bbox, vec![span])),
        }
    }

    let mut lines = Vec::new();
    for (row_bbox, mut members) in rows {
        members.sort_by(|a, b| a.bbox.x_min().total_cmp(&b.bbox.x_min()));
        let max_gap = row_bbox.height() * LINE_GAP_FACTOR;

        let mut current: Option<TextLine> = None;
        for span in members {
            match current.as_mut() {
                Some(line) if span.bbox.x_min() - line.bbox.x_max() <= max_gap => {
                    line.bbox = line.bbox.union(&span.bbox);
                    line.spans.push(span);
                }
                _ => {
                    lines.extend(current.take());
                    current = Some(TextLine {
                        bbox: span.bbox,
                        spans: vec![span],
                    });
                }
            }
        }
        lines.extend(current);
    }
    lines
}

fn center_y(bbox: &BoundingBox) -> f32 {
    (bbox.y_min() + bbox.y_max()) / 2.0
}
