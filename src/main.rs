//! Command-line entry point for table extraction.
//!
//! Usage:
//! ```
//! oar-tables paper.pdf --layout-cmd "python3 layout.py" \
//!     --detect-cmd "python3 detect.py" --table-cmd "python3 tables.py"
//! ```

use clap::Parser;
use oar_tables::core::init_tracing;
use oar_tables::loader::PageRange;
use oar_tables::pipeline::{ConfigLoader, ExtractionConfig, TableExtractionPipeline};
use std::path::PathBuf;
use tracing::error;

/// Extract tables from documents into per-document JSON records.
#[derive(Parser)]
#[command(name = "oar-tables")]
#[command(about = "Extract tables from PDFs and page images")]
struct Args {
    /// Document file, or a directory of documents
    input: PathBuf,

    /// Configuration file (TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root directory for results
    #[arg(short, long)]
    results_dir: Option<PathBuf>,

    /// Also save an annotated image of every table
    #[arg(long)]
    images: bool,

    /// Resolution for layout detection
    #[arg(long)]
    working_dpi: Option<u32>,

    /// Resolution for table crops
    #[arg(long)]
    highres_dpi: Option<u32>,

    /// Pages to process, 0-based, as START:END (END exclusive)
    #[arg(long, value_parser = PageRange::parse)]
    pages: Option<PageRange>,

    /// Layout detection engine command
    #[arg(long)]
    layout_cmd: Option<String>,

    /// Cell detection engine command
    #[arg(long)]
    detect_cmd: Option<String>,

    /// Table recognition engine command
    #[arg(long)]
    table_cmd: Option<String>,

    /// Print run statistics after writing the results
    #[arg(long)]
    stats: bool,
}

impl Args {
    fn into_config(self) -> Result<(PathBuf, ExtractionConfig), Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ExtractionConfig::default(),
        };
        if let Some(dir) = self.results_dir {
            config.results_dir = dir;
        }
        if self.images {
            config.save_images = true;
        }
        if let Some(dpi) = self.working_dpi {
            config.working_dpi = dpi;
        }
        if let Some(dpi) = self.highres_dpi {
            config.highres_dpi = dpi;
        }
        if self.pages.is_some() {
            config.page_range = self.pages;
        }
        if self.layout_cmd.is_some() {
            config.engines.layout = self.layout_cmd;
        }
        if self.detect_cmd.is_some() {
            config.engines.cell_detection = self.detect_cmd;
        }
        if self.table_cmd.is_some() {
            config.engines.table_recognition = self.table_cmd;
        }
        Ok((self.input, config))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args = Args::parse();
    let show_stats = args.stats;
    let (input, config) = args.into_config()?;
    let pipeline = TableExtractionPipeline::builder(config).build()?;

    match pipeline.process(&input) {
        Ok(processed) => {
            println!("Wrote results to {}", processed.dir.display());
            if show_stats {
                print!("{}", processed.stats);
            }
            Ok(())
        }
        Err(e) => {
            error!(
                target: "tables",
                input = %input.display(),
                stage = ?e.stage(),
                error = %e,
                "Extraction failed"
            );
            Err(e.into())
        }
    }
}
