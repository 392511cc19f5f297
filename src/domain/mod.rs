//! Domain types shared by the pipeline stages.
//!
//! * [`geometry`] - bounding boxes and coordinate-space mappings
//! * [`page`] - rendered pages, text-line geometry and the page counter
//! * [`layout`] - layout regions and their kinds
//! * [`table`] - table regions, cell blocks, predictions and results

pub mod geometry;
pub mod layout;
pub mod page;
pub mod table;

pub use geometry::BoundingBox;
pub use layout::{LayoutRegion, RegionKind};
pub use page::{Page, PageRef, TextLine, TextLines, TextSpan, run_positions};
pub use table::{CellBlock, DocumentResult, TableRecord, TableRegion, TableStructure};
