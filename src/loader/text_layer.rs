//! Text-line geometry stored next to a document.
//!
//! A sidecar named `<document>.textlines.json` holds one entry per page of
//! the document (index-aligned, `null` for pages without a text layer):
//!
//! ```json
//! {"pages": [{"page_width": 612, "page_height": 792, "lines": [
//!     {"bbox": [72, 90, 300, 104], "spans": [{"bbox": [72, 90, 120, 104], "text": "Age"}]}
//! ]}, null]}
//! ```
//!
//! Coordinates are in the page's own space, given by `page_width` and
//! `page_height`.

use crate::core::{ExtractError, ExtractResult};
use crate::domain::TextLines;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-page text-line geometry for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SidecarTextLayer {
    #[serde(default)]
    pub pages: Vec<Option<TextLines>>,
}

/// Location of the sidecar for `document`: its path with a `.textlines.json` extension.
pub fn sidecar_path(document: &Path) -> PathBuf {
    document.with_extension("textlines.json")
}

impl SidecarTextLayer {
    /// Reads a sidecar file.
    pub fn from_file(path: &Path) -> ExtractResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ExtractError::load_error(path, format!("cannot read text layer: {e}")))?;
        serde_json::from_str(&content)
            .map_err(|e| ExtractError::load_error(path, format!("invalid text layer: {e}")))
    }

    /// Reads the sidecar of `document`, or `None` if it has none.
    pub fn load_for(document: &Path) -> ExtractResult<Option<Self>> {
        let path = sidecar_path(document);
        if !path.is_file() {
            return Ok(None);
        }
        Self::from_file(&path).map(Some)
    }

    /// Text lines of the page at `index`, if recorded.
    pub fn page(&self, index: usize) -> Option<&TextLines> {
        self.pages.get(index).and_then(Option::as_ref)
    }
}
