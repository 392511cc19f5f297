//! Grouping of table predictions by source document.

use crate::core::{ExtractError, ExtractResult, PipelineStage};
use crate::domain::{DocumentResult, TableRecord, TableRegion, TableStructure};
use indexmap::IndexMap;

/// Attaches page numbers and global indices to predictions and groups them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAggregator;

impl ResultAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Builds the per-document result.
    ///
    /// `predictions[i]` belongs to `regions[i]`. Each record takes its page
    /// from its own region, and `table_idx` is the position in the flattened
    /// sequence. Documents appear in the order their first table was found.
    pub fn aggregate(
        &self,
        regions: &[TableRegion],
        predictions: Vec<TableStructure>,
    ) -> ExtractResult<DocumentResult> {
        if predictions.len() != regions.len() {
            return Err(ExtractError::batch_mismatch(
                PipelineStage::Aggregation,
                regions.len(),
                predictions.len(),
            ));
        }

        let mut documents: IndexMap<String, Vec<TableRecord>> = IndexMap::new();
        for (table_idx, (region, mut structure)) in regions.iter().zip(predictions).enumerate() {
            // The record's own page and index replace any the recognizer reported.
            structure.remove("page");
            structure.remove("table_idx");
            let record = TableRecord {
                document: region.page.document.clone(),
                structure,
                page: region.page.page_number(),
                table_idx,
            };
            documents
                .entry(region.page.document.to_string())
                .or_default()
                .push(record);
        }
        Ok(DocumentResult::from_map(documents))
    }
}
