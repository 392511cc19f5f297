//! Table regions, cell blocks, recognizer output and the per-document result.

use super::geometry::BoundingBox;
use super::page::PageRef;
use image::RgbImage;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A table found on a page, cropped from the high-resolution raster.
///
/// Each region carries its page reference, so later stages never have to
/// recover the source page from positional alignment.
#[derive(Debug, Clone)]
pub struct TableRegion {
    /// Page the table was found on.
    pub page: PageRef,
    /// Position of that page within the loaded batch.
    pub page_position: usize,
    /// Bounding box in working-resolution coordinates.
    pub bbox: BoundingBox,
    /// Bounding box in high-resolution coordinates, within the image bounds.
    pub highres_bbox: BoundingBox,
    /// High-resolution crop of the table.
    pub image: RgbImage,
}

/// A candidate cell in table-crop coordinates.
///
/// `text` is `None` when the block came from geometric detection rather than
/// embedded text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellBlock {
    pub bbox: BoundingBox,
    #[serde(default)]
    pub text: Option<String>,
}

impl CellBlock {
    pub fn detected(bbox: BoundingBox) -> Self {
        Self { bbox, text: None }
    }

    pub fn with_text(bbox: BoundingBox, text: impl Into<String>) -> Self {
        Self {
            bbox,
            text: Some(text.into()),
        }
    }
}

/// Structured prediction for one table, as returned by a recognizer.
///
/// The pipeline never interprets a prediction. It is kept as the JSON object
/// the recognizer produced, so nested cells, rows and columns keep every
/// field, number and key order they arrived with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableStructure(serde_json::Map<String, serde_json::Value>);

impl TableStructure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<serde_json::Value> {
        self.0.insert(key.into(), value)
    }

    /// Removes `key`, keeping the order of the remaining fields.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.0.shift_remove(key)
    }
}

/// A recognized table tied to its source document and page.
#[derive(Debug, Clone, Serialize)]
pub struct TableRecord {
    /// Source document name; the results file groups by it instead.
    #[serde(skip)]
    pub document: Arc<str>,
    /// Recognizer output, minus any `page` or `table_idx` keys of its own.
    #[serde(flatten)]
    pub structure: TableStructure,
    /// 1-based page number within the document.
    pub page: usize,
    /// Global, strictly increasing index in extraction order.
    pub table_idx: usize,
}

/// Table records grouped by document, in first-seen document order.
///
/// Built once by [`ResultAggregator`](crate::pipeline::ResultAggregator) and
/// read-only afterwards.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct DocumentResult {
    documents: IndexMap<String, Vec<TableRecord>>,
}

impl DocumentResult {
    pub(crate) fn from_map(documents: IndexMap<String, Vec<TableRecord>>) -> Self {
        Self { documents }
    }

    /// Records for one document, in extraction order.
    pub fn get(&self, document: &str) -> Option<&[TableRecord]> {
        self.documents.get(document).map(Vec::as_slice)
    }

    /// Document names in first-seen order.
    pub fn document_names(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn table_count(&self) -> usize {
        self.documents.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structure_passes_nested_fields_through() {
        let raw = r#"{"cells":[{"bbox":[0,0,5,5],"row_id":0,"col_id":0,"is_header":true,"polygon":[[0,0],[5,0],[5,5],[0,5]],"confidence":0.93}],"rows":[{"bbox":[0,0,5,5]}],"unmerged_cells":3}"#;
        let structure: TableStructure = serde_json::from_str(raw).unwrap();
        assert_eq!(structure.get("unmerged_cells"), Some(&json!(3)));
        assert_eq!(serde_json::to_string(&structure).unwrap(), raw);
    }

    #[test]
    fn test_record_serializes_page_and_index_flat() {
        let record = TableRecord {
            document: Arc::from("a"),
            structure: TableStructure::default(),
            page: 2,
            table_idx: 7,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["page"], json!(2));
        assert_eq!(value["table_idx"], json!(7));
        assert!(value.get("document").is_none());
        assert_eq!(value["cells"], json!([]));
    }

    #[test]
    fn test_cell_block_text_null_when_detected() {
        let block = CellBlock::detected(BoundingBox::from_coords(0.0, 0.0, 1.0, 1.0));
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["text"], serde_json::Value::Null);
    }
}
