//! Error types for the table extraction pipeline.
//!
//! Every stage of a run reports failures through [`ExtractError`]. Nothing in the
//! pipeline recovers from an error: a run either completes with a full
//! [`DocumentResult`](crate::domain::DocumentResult) or aborts with the error
//! that stopped it.
//!
//! # Usage
//!
//! ```rust
//! use oar_tables::core::errors::{ExtractError, PipelineStage};
//!
//! let error = ExtractError::inference_error(
//!     PipelineStage::LayoutDetection,
//!     std::io::Error::new(std::io::ErrorKind::BrokenPipe, "engine exited"),
//! );
//! assert!(error.to_string().contains("layout detection"));
//!
//! let mismatch = ExtractError::batch_mismatch(PipelineStage::Recognition, 3, 2);
//! assert!(matches!(mismatch, ExtractError::BatchMismatch { expected: 3, actual: 2, .. }));
//! ```

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Stages of a table extraction run.
///
/// Used to tag errors and timing metrics with the stage they came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Rasterizing the document at both resolutions.
    Load,
    /// Running the layout model over working-resolution pages.
    LayoutDetection,
    /// Selecting, rescaling and cropping table regions.
    RegionExtraction,
    /// Deriving cell blocks from embedded text geometry.
    CellResolution,
    /// Fallback cell detection over table crops.
    CellDetection,
    /// Table structure recognition.
    Recognition,
    /// Grouping predictions by document.
    Aggregation,
    /// Writing results to disk.
    Persistence,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Load => write!(f, "document load"),
            PipelineStage::LayoutDetection => write!(f, "layout detection"),
            PipelineStage::RegionExtraction => write!(f, "region extraction"),
            PipelineStage::CellResolution => write!(f, "cell resolution"),
            PipelineStage::CellDetection => write!(f, "cell detection"),
            PipelineStage::Recognition => write!(f, "table recognition"),
            PipelineStage::Aggregation => write!(f, "aggregation"),
            PipelineStage::Persistence => write!(f, "persistence"),
        }
    }
}

/// Errors that can occur while extracting tables.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// An image could not be decoded or encoded.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// A document could not be rasterized.
    #[error("failed to load {}: {message}", path.display())]
    Load {
        /// The document that failed to load.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// A non-inference processing step failed.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage where the error occurred.
        kind: PipelineStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An external inference capability raised during a batched call.
    #[error("{stage} inference failed")]
    Inference {
        /// The stage whose engine failed.
        stage: PipelineStage,
        /// The engine's error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A batched call returned a different number of results than it was given.
    #[error("{stage} returned {actual} results for a batch of {expected}")]
    BatchMismatch {
        /// The stage that broke alignment.
        stage: PipelineStage,
        /// Number of inputs in the batch.
        expected: usize,
        /// Number of outputs returned.
        actual: usize,
    },

    /// The caller supplied unusable input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// A configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("json")]
    Json(#[from] serde_json::Error),
}

impl ExtractError {
    /// Creates a load error for the given document.
    pub fn load_error(path: &Path, message: impl Into<String>) -> Self {
        Self::Load {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Creates an error for a failed processing step.
    ///
    /// # Arguments
    ///
    /// * `kind` - The stage where the error occurred.
    /// * `context` - Additional context about the error.
    /// * `error` - The underlying error that caused this error.
    pub fn processing_error(
        kind: PipelineStage,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an error for a failed inference call.
    pub fn inference_error(
        stage: PipelineStage,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            stage,
            source: Box::new(error),
        }
    }

    /// Creates an error for a batch whose output length does not mirror its input.
    pub fn batch_mismatch(stage: PipelineStage, expected: usize, actual: usize) -> Self {
        Self::BatchMismatch {
            stage,
            expected,
            actual,
        }
    }

    /// Creates an error for invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates an error for configuration problems.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Returns the pipeline stage this error is attributed to, if any.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Load { .. } | Self::ImageLoad(_) => Some(PipelineStage::Load),
            Self::Processing { kind, .. } => Some(*kind),
            Self::Inference { stage, .. } | Self::BatchMismatch { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<image::ImageError> for ExtractError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<crate::core::config::ConfigError> for ExtractError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

/// Convenient result alias for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;
