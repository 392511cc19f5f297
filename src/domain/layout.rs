//! Layout regions reported by the layout detector.

use super::geometry::BoundingBox;
use serde::{Deserialize, Serialize};

/// Kind of a detected layout region.
///
/// Engines report labels as strings; they are mapped once at the boundary via
/// [`RegionKind::from_label`] so the pipeline can select regions by pattern
/// matching. Unrecognized labels are kept verbatim in [`RegionKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RegionKind {
    /// Table
    Table,
    /// Body text
    Text,
    /// Document title
    Title,
    /// Section header
    SectionHeader,
    /// Figure or picture
    Figure,
    /// Figure or table caption
    Caption,
    /// Footnote
    Footnote,
    /// Mathematical formula
    Formula,
    /// List item
    ListItem,
    /// Page header
    PageHeader,
    /// Page footer
    PageFooter,
    /// Table of contents
    TableOfContents,
    /// Form fields
    Form,
    /// Code block
    Code,
    /// Any other label, preserved as reported
    Other(String),
}

impl RegionKind {
    /// Maps a detector label to a region kind.
    ///
    /// Matching ignores case and treats `-`, `_` and spaces alike, so
    /// `"Section-header"`, `"section_header"` and `"SECTION HEADER"` agree.
    pub fn from_label(label: &str) -> Self {
        let normalized: String = label
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        match normalized.as_str() {
            "table" => RegionKind::Table,
            "text" | "paragraph" | "plain_text" => RegionKind::Text,
            "title" | "doc_title" => RegionKind::Title,
            "section_header" | "paragraph_title" => RegionKind::SectionHeader,
            "figure" | "picture" | "image" => RegionKind::Figure,
            "caption" | "table_caption" | "figure_caption" => RegionKind::Caption,
            "footnote" => RegionKind::Footnote,
            "formula" | "equation" => RegionKind::Formula,
            "list_item" | "list" => RegionKind::ListItem,
            "page_header" | "header" => RegionKind::PageHeader,
            "page_footer" | "footer" => RegionKind::PageFooter,
            "table_of_contents" => RegionKind::TableOfContents,
            "form" => RegionKind::Form,
            "code" => RegionKind::Code,
            _ => RegionKind::Other(label.to_string()),
        }
    }

    /// Returns the canonical label for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            RegionKind::Table => "Table",
            RegionKind::Text => "Text",
            RegionKind::Title => "Title",
            RegionKind::SectionHeader => "Section-header",
            RegionKind::Figure => "Figure",
            RegionKind::Caption => "Caption",
            RegionKind::Footnote => "Footnote",
            RegionKind::Formula => "Formula",
            RegionKind::ListItem => "List-item",
            RegionKind::PageHeader => "Page-header",
            RegionKind::PageFooter => "Page-footer",
            RegionKind::TableOfContents => "Table-of-contents",
            RegionKind::Form => "Form",
            RegionKind::Code => "Code",
            RegionKind::Other(label) => label,
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, RegionKind::Table)
    }
}

impl From<String> for RegionKind {
    fn from(label: String) -> Self {
        RegionKind::from_label(&label)
    }
}

impl From<RegionKind> for String {
    fn from(kind: RegionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for RegionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A labelled region in working-resolution coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRegion {
    /// Region kind, serialized as the detector's label.
    #[serde(rename = "label")]
    pub kind: RegionKind,
    /// Bounding box in working-resolution pixels.
    pub bbox: BoundingBox,
    /// Detector confidence.
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl LayoutRegion {
    pub fn new(kind: RegionKind, bbox: BoundingBox) -> Self {
        Self {
            kind,
            bbox,
            confidence: 1.0,
        }
    }
}
