//! # OAR Tables
//!
//! Extracts structured tables from multi-page documents.
//!
//! Each document is rendered twice: at a working resolution for layout
//! detection and at a higher resolution for table crops. Table regions found
//! by the layout model are rescaled into the high-resolution space and
//! cropped. Cell geometry comes from the page's embedded text layer when it
//! covers every table on the page, and from a cell detector otherwise. A
//! table recognizer turns each crop and its cells into a structured
//! prediction, and the predictions are grouped by source document.
//!
//! ## Modules
//!
//! * [`core`] - Error handling, configuration validation and logging setup
//! * [`domain`] - Pages, layout regions, table regions and results
//! * [`engines`] - Inference capabilities and the external-process adapter
//! * [`loader`] - Dual-resolution document loading
//! * [`pipeline`] - The extraction stages and their orchestration
//! * [`output`] - Results persistence and table images
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oar_tables::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExtractionConfig {
//!     engines: EngineCommands {
//!         layout: Some("python3 engines/layout.py".into()),
//!         cell_detection: Some("python3 engines/detect.py".into()),
//!         table_recognition: Some("python3 engines/tables.py".into()),
//!     },
//!     ..Default::default()
//! };
//! let pipeline = TableExtractionPipeline::builder(config).build()?;
//! let processed = pipeline.process(Path::new("paper.pdf"))?;
//! println!("Wrote results to {}", processed.dir.display());
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod engines;
pub mod loader;
pub mod output;
pub mod pipeline;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{ExtractError, ExtractResult, PipelineStage, init_tracing};
    pub use crate::domain::{
        BoundingBox, CellBlock, DocumentResult, LayoutRegion, Page, PageRef, RegionKind,
        TableRecord, TableRegion, TableStructure,
    };
    pub use crate::engines::{CellDetector, LayoutDetector, ProcessEngine, TableRecognizer};
    pub use crate::loader::{DocumentLoader, FileRasterizer, Rasterizer};
    pub use crate::pipeline::{
        ConfigLoader, EngineCommands, ExtractionConfig, TableExtractionPipeline,
    };
}
