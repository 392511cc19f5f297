//! Extraction configuration and the file loader for it.
//!
//! Configuration can be written as TOML or JSON; the format is chosen from
//! the file extension.

use crate::core::{ConfigError, ConfigValidator, ExtractError, ExtractResult};
use crate::loader::PageRange;
use crate::pipeline::cells::DEFAULT_TABLE_THRESH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default resolution for layout detection.
pub const DEFAULT_WORKING_DPI: u32 = 96;
/// Default resolution for table crops.
pub const DEFAULT_HIGHRES_DPI: u32 = 192;

/// Command lines for the external inference engines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineCommands {
    /// Layout detection program.
    pub layout: Option<String>,
    /// Cell detection program used by the fallback.
    pub cell_detection: Option<String>,
    /// Table structure recognition program.
    pub table_recognition: Option<String>,
}

impl EngineCommands {
    fn entries(&self) -> [(&'static str, Option<&str>); 3] {
        [
            ("engines.layout", self.layout.as_deref()),
            ("engines.cell_detection", self.cell_detection.as_deref()),
            ("engines.table_recognition", self.table_recognition.as_deref()),
        ]
    }
}

/// Configuration for a table extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Resolution used for layout detection.
    pub working_dpi: u32,
    /// Resolution used for table crops and cell geometry.
    pub highres_dpi: u32,
    /// Fraction of a text line that must fall inside a table for it to count.
    pub table_thresh: f32,
    /// Pages to process in every document; all pages when unset.
    pub page_range: Option<PageRange>,
    /// Root directory for results.
    pub results_dir: PathBuf,
    /// Write an annotated image of every table next to the results.
    pub save_images: bool,
    /// External engine programs.
    pub engines: EngineCommands,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            working_dpi: DEFAULT_WORKING_DPI,
            highres_dpi: DEFAULT_HIGHRES_DPI,
            table_thresh: DEFAULT_TABLE_THRESH,
            page_range: None,
            results_dir: PathBuf::from("results"),
            save_images: false,
            engines: EngineCommands::default(),
        }
    }
}

impl ConfigValidator for ExtractionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_dpi("working_dpi", self.working_dpi)?;
        self.validate_dpi("highres_dpi", self.highres_dpi)?;
        if self.highres_dpi < self.working_dpi {
            return Err(ConfigError::ValidationFailed {
                message: format!(
                    "highres_dpi ({}) must not be lower than working_dpi ({})",
                    self.highres_dpi, self.working_dpi
                ),
            });
        }
        self.validate_ratio("table_thresh", self.table_thresh)?;
        if let Some(range) = self.page_range
            && range.end.is_some_and(|end| end <= range.start)
        {
            return Err(ConfigError::InvalidConfig {
                message: format!("page_range {}..{:?} is empty", range.start, range.end),
            });
        }
        for (field, command) in self.engines.entries() {
            let Some(command) = command else { continue };
            let program = command.split_whitespace().next().ok_or_else(|| {
                ConfigError::InvalidConfig {
                    message: format!("{field} is blank"),
                }
            })?;
            // Bare names are looked up on PATH when the engine runs.
            if program.contains(std::path::MAIN_SEPARATOR) {
                self.validate_path_exists(Path::new(program))?;
            }
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Loads [`ExtractionConfig`] files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file, auto-detecting the format from the extension.
    ///
    /// The loaded configuration is validated before it is returned.
    pub fn load_from_file(path: &Path) -> ExtractResult<ExtractionConfig> {
        let format = ConfigFormat::from_extension(path).ok_or_else(|| {
            ExtractError::config_error(format!(
                "Unsupported config file extension: {:?}",
                path.extension()
            ))
        })?;

        let content = std::fs::read_to_string(path).map_err(|e| {
            ExtractError::config_error(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let config = Self::load_from_string(&content, format)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a string with specified format
    pub fn load_from_string(content: &str, format: ConfigFormat) -> ExtractResult<ExtractionConfig> {
        match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| {
                ExtractError::config_error(format!("Failed to parse TOML config: {e}"))
            }),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| {
                ExtractError::config_error(format!("Failed to parse JSON config: {e}"))
            }),
        }
    }
}
