//! Annotated table crops for inspecting cell geometry.
//!
//! Each crop is saved as `<document>_page<page>_table<idx>.png` with its cell
//! blocks outlined: blue for blocks taken from the text layer, red for
//! detected ones.

use crate::core::{ExtractError, ExtractResult, PipelineStage};
use crate::domain::{BoundingBox, CellBlock, TableRegion};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

const TEXT_CELL_COLOR: Rgb<u8> = Rgb([0, 90, 255]);
const DETECTED_CELL_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// File name of the annotated crop for a table.
pub fn table_image_name(region: &TableRegion, table_idx: usize) -> String {
    format!(
        "{}_page{}_table{}.png",
        region.page.document,
        region.page.page_number(),
        table_idx
    )
}

/// Draws the outlines of `cells` on a copy of the table crop.
pub fn draw_cells(image: &RgbImage, cells: &[CellBlock]) -> RgbImage {
    let mut canvas = image.clone();
    for cell in cells {
        let color = if cell.text.is_some() {
            TEXT_CELL_COLOR
        } else {
            DETECTED_CELL_COLOR
        };
        if let Some(rect) = bbox_to_rect(&cell.bbox, canvas.width(), canvas.height()) {
            draw_hollow_rect_mut(&mut canvas, rect, color);
        }
    }
    canvas
}

/// Saves an annotated image for every table into `dir`.
///
/// `cells[i]` belongs to `regions[i]`; the global table index is the
/// position in `regions`.
pub fn save_table_images(
    dir: &Path,
    regions: &[TableRegion],
    cells: &[Vec<CellBlock>],
) -> ExtractResult<Vec<PathBuf>> {
    if regions.len() != cells.len() {
        return Err(ExtractError::batch_mismatch(
            PipelineStage::Persistence,
            regions.len(),
            cells.len(),
        ));
    }
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(regions.len());
    for (table_idx, (region, blocks)) in regions.iter().zip(cells).enumerate() {
        let path = dir.join(table_image_name(region, table_idx));
        draw_cells(&region.image, blocks)
            .save(&path)
            .map_err(|e| {
                ExtractError::processing_error(
                    PipelineStage::Persistence,
                    &format!("saving {}", path.display()),
                    e,
                )
            })?;
        written.push(path);
    }
    tracing::debug!(
        target: "tables",
        dir = %dir.display(),
        images = written.len(),
        "Saved table images"
    );
    Ok(written)
}

fn bbox_to_rect(bbox: &BoundingBox, width: u32, height: u32) -> Option<Rect> {
    if bbox.is_empty() || width == 0 || height == 0 {
        return None;
    }
    let (x, y, w, h) = bbox.pixel_rect(width, height);
    Some(Rect::at(x as i32, y as i32).of_size(w, h))
}
