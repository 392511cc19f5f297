//! The table extraction pipeline and its stages.
//!
//! [`TableExtractionPipeline`] wires the stages together; each stage is also
//! usable on its own:
//!
//! * [`TableRegionExtractor`] - table selection, rescaling and cropping
//! * [`CellBlockResolver`] - cell geometry with the page-level detection fallback
//! * [`ResultAggregator`] - per-document grouping with page numbers and indices

mod aggregate;
pub mod cells;
mod config;
mod orchestrator;
mod regions;
mod stats;

pub use aggregate::ResultAggregator;
pub use cells::{
    CellBlockResolver, CellStrategy, DEFAULT_TABLE_THRESH, FallbackReason, ResolvedCells,
    derive_table_blocks,
};
pub use config::{
    ConfigFormat, ConfigLoader, DEFAULT_HIGHRES_DPI, DEFAULT_WORKING_DPI, EngineCommands,
    ExtractionConfig,
};
pub use orchestrator::{
    ExtractionRun, ProcessedInput, TableExtractionPipeline, TableExtractionPipelineBuilder,
};
pub use regions::{RegionExtraction, TableRegionExtractor};
pub use stats::ExtractionStats;
