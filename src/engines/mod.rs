//! Inference capabilities consumed by the pipeline.
//!
//! The layout model, the fallback cell detector and the table recognizer are
//! external engines. The pipeline only depends on the traits below; every
//! call is batched, and every batch must return exactly one result per input,
//! in input order. [`ensure_batch_len`] enforces that at each call site.

mod process;

pub use process::{EngineTask, ProcessEngine, ProcessEngineError};

use crate::core::{ExtractError, ExtractResult, PipelineStage};
use crate::domain::{BoundingBox, CellBlock, LayoutRegion, TableStructure};
use image::RgbImage;

/// Labels regions on whole pages.
pub trait LayoutDetector: Send + Sync {
    /// Returns one list of regions per input image, in input order.
    fn detect(&self, images: &[&RgbImage]) -> ExtractResult<Vec<Vec<LayoutRegion>>>;
}

/// Detects cell-like boxes inside table crops.
pub trait CellDetector: Send + Sync {
    /// Returns one list of boxes (crop coordinates) per input image, in input order.
    fn detect(&self, images: &[&RgbImage]) -> ExtractResult<Vec<Vec<BoundingBox>>>;
}

/// Recognizes table structure from crops and their cell blocks.
pub trait TableRecognizer: Send + Sync {
    /// Returns one prediction per crop, in input order.
    ///
    /// `cells[i]` holds the cell blocks for `images[i]`.
    fn recognize(
        &self,
        images: &[&RgbImage],
        cells: &[Vec<CellBlock>],
    ) -> ExtractResult<Vec<TableStructure>>;
}

/// Checks that a batched call returned exactly one result per input.
pub fn ensure_batch_len<T>(
    stage: PipelineStage,
    expected: usize,
    output: Vec<T>,
) -> ExtractResult<Vec<T>> {
    if output.len() != expected {
        return Err(ExtractError::batch_mismatch(stage, expected, output.len()));
    }
    Ok(output)
}
