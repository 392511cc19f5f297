//! Per-run extraction statistics.

use std::fmt;
use std::time::Duration;

/// Counts and stage timings for one extraction run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionStats {
    /// Pages loaded.
    pub pages: usize,
    /// Distinct documents among the pages.
    pub documents: usize,
    /// Table regions found.
    pub tables: usize,
    /// Pages with no tables.
    pub empty_pages: usize,
    /// Pages whose cells came from the text layer.
    pub structural_pages: usize,
    /// Pages whose cells came from the cell detector.
    pub detection_pages: usize,
    /// Time spent in layout detection.
    pub layout_time: Duration,
    /// Time spent resolving cell blocks, detection included.
    pub cell_time: Duration,
    /// Time spent in table recognition.
    pub recognition_time: Duration,
}

impl ExtractionStats {
    /// Share of table pages that fell back to detection, as a percentage.
    pub fn fallback_rate(&self) -> f64 {
        let table_pages = self.structural_pages + self.detection_pages;
        if table_pages == 0 {
            0.0
        } else {
            (self.detection_pages as f64 / table_pages as f64) * 100.0
        }
    }

    /// Logs the summary at info level.
    pub fn log_summary(&self) {
        tracing::info!(
            target: "tables",
            pages = self.pages,
            documents = self.documents,
            tables = self.tables,
            empty_pages = self.empty_pages,
            structural_pages = self.structural_pages,
            detection_pages = self.detection_pages,
            layout_ms = self.layout_time.as_millis() as u64,
            cell_ms = self.cell_time.as_millis() as u64,
            recognition_ms = self.recognition_time.as_millis() as u64,
            "Table extraction finished"
        );
    }
}

impl fmt::Display for ExtractionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Extraction Statistics:")?;
        writeln!(
            f,
            "  Pages: {} across {} document(s), {} without tables",
            self.pages, self.documents, self.empty_pages
        )?;
        writeln!(f, "  Tables: {}", self.tables)?;
        writeln!(
            f,
            "  Cell sources: {} structural page(s), {} detection page(s) ({:.1}% fallback)",
            self.structural_pages,
            self.detection_pages,
            self.fallback_rate()
        )?;
        writeln!(
            f,
            "  Timings: layout {:.2?}, cells {:.2?}, recognition {:.2?}",
            self.layout_time, self.cell_time, self.recognition_time
        )?;
        Ok(())
    }
}
