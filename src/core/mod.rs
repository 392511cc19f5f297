//! The core module of the table extraction pipeline.
//!
//! This module contains the fundamental pieces shared by every stage:
//! - Error handling ([`errors`])
//! - Configuration validation ([`config`])
//! - Logging setup ([`init_tracing`])

pub mod config;
pub mod errors;

pub use config::{ConfigError, ConfigValidator};
pub use errors::{ExtractError, ExtractResult, PipelineStage};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called at the start of an application to enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
