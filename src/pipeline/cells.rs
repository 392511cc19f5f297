//! Cell block resolution with a page-level fallback.
//!
//! Pages with an embedded text layer get their cell blocks from text-line
//! geometry. When a page has no text layer, or the derivation comes up empty
//! for any one of its tables, every table on that page goes through the cell
//! detector instead. The fallback never mixes strategies within a page.

use crate::core::{ExtractError, ExtractResult, PipelineStage};
use crate::domain::{BoundingBox, CellBlock, Page, TableRegion, TextLines};
use crate::engines::{CellDetector, ensure_batch_len};
use image::RgbImage;
use std::sync::Arc;

/// Default fraction of a text line that must lie inside a table to count.
pub const DEFAULT_TABLE_THRESH: f32 = 0.8;

/// How cell blocks are produced for all tables of one page.
#[derive(Debug, Clone, PartialEq)]
pub enum CellStrategy {
    /// Blocks derived from the text layer, one list per table.
    Structural(Vec<Vec<CellBlock>>),
    /// Blocks come from the cell detector.
    Detection(FallbackReason),
}

/// Why a page fell back to detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The page has no text layer.
    NoTextLayer,
    /// The table at this within-page position got no blocks.
    EmptyTable(usize),
}

impl CellStrategy {
    /// Chooses the strategy for a page given its tables' high-resolution boxes.
    pub fn choose(page: &Page, table_bboxes: &[BoundingBox], table_thresh: f32) -> Self {
        let Some(text_lines) = page.text_lines.as_ref() else {
            return Self::Detection(FallbackReason::NoTextLayer);
        };
        let blocks =
            derive_table_blocks(table_bboxes, text_lines, page.highres_size(), table_thresh);
        match blocks.iter().position(Vec::is_empty) {
            Some(idx) => Self::Detection(FallbackReason::EmptyTable(idx)),
            None => Self::Structural(blocks),
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural(_))
    }
}

/// Derives cell blocks for each table from embedded text lines.
///
/// `table_bboxes` are in high-resolution image space of size `image_size`;
/// `text_lines` are in page space. A line belongs to a table when at least
/// `table_thresh` of its area falls inside the table. Each non-blank span of
/// such a line becomes one block in the table crop's coordinates.
pub fn derive_table_blocks(
    table_bboxes: &[BoundingBox],
    text_lines: &TextLines,
    image_size: (f32, f32),
    table_thresh: f32,
) -> Vec<Vec<CellBlock>> {
    let page_size = text_lines.page_size();
    table_bboxes
        .iter()
        .map(|table| {
            let mut blocks = Vec::new();
            for line in &text_lines.lines {
                let line_bbox = line.bbox.rescale(page_size, image_size);
                if line_bbox.intersection_pct(table) < table_thresh {
                    continue;
                }
                for span in &line.spans {
                    let text = span.text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    let bbox = span
                        .bbox
                        .rescale(page_size, image_size)
                        .translate(-table.x_min(), -table.y_min())
                        .clamp(table.width(), table.height());
                    if bbox.is_empty() {
                        continue;
                    }
                    blocks.push(CellBlock::with_text(bbox, text));
                }
            }
            blocks
        })
        .collect()
}

/// Cell blocks for every table region plus a tally of strategies used.
#[derive(Debug, Clone, Default)]
pub struct ResolvedCells {
    /// One list per region, index-aligned with the flattened regions.
    pub cells: Vec<Vec<CellBlock>>,
    /// Pages resolved from the text layer.
    pub structural_pages: usize,
    /// Pages resolved by the cell detector.
    pub detection_pages: usize,
}

/// Produces cell blocks for table regions, page by page.
#[derive(Clone)]
pub struct CellBlockResolver {
    detector: Arc<dyn CellDetector>,
    table_thresh: f32,
}

impl std::fmt::Debug for CellBlockResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellBlockResolver")
            .field("table_thresh", &self.table_thresh)
            .finish_non_exhaustive()
    }
}

impl CellBlockResolver {
    pub fn new(detector: Arc<dyn CellDetector>) -> Self {
        Self {
            detector,
            table_thresh: DEFAULT_TABLE_THRESH,
        }
    }

    pub fn with_table_thresh(mut self, table_thresh: f32) -> Self {
        self.table_thresh = table_thresh;
        self
    }

    /// Resolves cell blocks for `regions`, which must be grouped by page in
    /// page order as produced by the region extractor.
    pub fn resolve(&self, pages: &[Page], regions: &[TableRegion]) -> ExtractResult<ResolvedCells> {
        let mut resolved = ResolvedCells {
            cells: Vec::with_capacity(regions.len()),
            ..Default::default()
        };

        for group in regions.chunk_by(|a, b| a.page_position == b.page_position) {
            let position = group[0].page_position;
            let page = pages.get(position).ok_or_else(|| {
                ExtractError::invalid_input(format!(
                    "table region refers to page {position} of a {}-page batch",
                    pages.len()
                ))
            })?;
            let bboxes: Vec<BoundingBox> = group.iter().map(|r| r.highres_bbox).collect();

            match CellStrategy::choose(page, &bboxes, self.table_thresh) {
                CellStrategy::Structural(blocks) => {
                    tracing::debug!(
                        target: "tables",
                        document = %page.page_ref.document,
                        page = page.page_ref.page_number(),
                        tables = group.len(),
                        blocks = blocks.iter().map(Vec::len).sum::<usize>(),
                        "Derived cell blocks from text layer"
                    );
                    resolved.structural_pages += 1;
                    resolved.cells.extend(blocks);
                }
                CellStrategy::Detection(reason) => {
                    tracing::debug!(
                        target: "tables",
                        document = %page.page_ref.document,
                        page = page.page_ref.page_number(),
                        tables = group.len(),
                        reason = ?reason,
                        "Falling back to cell detection"
                    );
                    resolved.detection_pages += 1;
                    resolved.cells.extend(self.detect(group)?);
                }
            }
        }

        let cells = ensure_batch_len(PipelineStage::CellResolution, regions.len(), resolved.cells)?;
        Ok(ResolvedCells { cells, ..resolved })
    }

    fn detect(&self, group: &[TableRegion]) -> ExtractResult<Vec<Vec<CellBlock>>> {
        let crops: Vec<&RgbImage> = group.iter().map(|r| &r.image).collect();
        let detected = self.detector.detect(&crops)?;
        let detected = ensure_batch_len(PipelineStage::CellDetection, crops.len(), detected)?;
        Ok(detected
            .into_iter()
            .map(|boxes| boxes.into_iter().map(CellBlock::detected).collect())
            .collect())
    }
}
