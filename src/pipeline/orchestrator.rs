//! The table extraction pipeline.
//!
//! A run moves strictly forward through the stages:
//!
//! 1. load every page at working and high resolution
//! 2. detect layout regions on the working-resolution pages (one batch)
//! 3. select table regions and crop them at high resolution
//! 4. resolve cell blocks per page, falling back to detection when needed
//! 5. recognize table structure for every crop (one batch)
//! 6. group predictions by document
//!
//! Any error aborts the run; nothing is written for a failed run.

use super::aggregate::ResultAggregator;
use super::cells::CellBlockResolver;
use super::config::ExtractionConfig;
use super::regions::TableRegionExtractor;
use super::stats::ExtractionStats;
use crate::core::{ConfigValidator, ExtractError, ExtractResult, PipelineStage};
use crate::domain::{
    CellBlock, DocumentResult, LayoutRegion, Page, TableRegion, TableStructure,
};
use crate::engines::{
    CellDetector, LayoutDetector, ProcessEngine, TableRecognizer, ensure_batch_len,
};
use crate::loader::{DocumentLoader, FileRasterizer, Rasterizer};
use crate::output::{commit_results, results_location};
use image::RgbImage;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Everything a run produced, index-aligned across regions, cells and records.
#[derive(Debug, Clone)]
pub struct ExtractionRun {
    /// Table regions in discovery order.
    pub regions: Vec<TableRegion>,
    /// Cell blocks per region.
    pub cells: Vec<Vec<CellBlock>>,
    /// Number of tables per loaded page.
    pub table_counts: Vec<usize>,
    /// Records grouped by document.
    pub result: DocumentResult,
    pub stats: ExtractionStats,
}

/// Where a processed input was written, and how the run went.
#[derive(Debug, Clone)]
pub struct ProcessedInput {
    /// Directory holding `results.json`.
    pub dir: PathBuf,
    pub stats: ExtractionStats,
}

/// Builder for [`TableExtractionPipeline`].
pub struct TableExtractionPipelineBuilder {
    config: ExtractionConfig,
    rasterizer: Option<Arc<dyn Rasterizer>>,
    layout_detector: Option<Arc<dyn LayoutDetector>>,
    cell_detector: Option<Arc<dyn CellDetector>>,
    table_recognizer: Option<Arc<dyn TableRecognizer>>,
}

impl TableExtractionPipelineBuilder {
    /// Creates a builder with engines taken from the configured commands.
    ///
    /// Engines set explicitly on the builder take precedence.
    pub fn from_config(config: ExtractionConfig) -> Self {
        let engine = |command: &Option<String>| {
            command
                .as_deref()
                .and_then(ProcessEngine::from_command_line)
                .map(Arc::new)
        };
        let layout = engine(&config.engines.layout);
        let cells = engine(&config.engines.cell_detection);
        let tables = engine(&config.engines.table_recognition);
        Self {
            layout_detector: layout.map(|e| e as Arc<dyn LayoutDetector>),
            cell_detector: cells.map(|e| e as Arc<dyn CellDetector>),
            table_recognizer: tables.map(|e| e as Arc<dyn TableRecognizer>),
            rasterizer: None,
            config,
        }
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn layout_detector(mut self, detector: Arc<dyn LayoutDetector>) -> Self {
        self.layout_detector = Some(detector);
        self
    }

    pub fn cell_detector(mut self, detector: Arc<dyn CellDetector>) -> Self {
        self.cell_detector = Some(detector);
        self
    }

    pub fn table_recognizer(mut self, recognizer: Arc<dyn TableRecognizer>) -> Self {
        self.table_recognizer = Some(recognizer);
        self
    }

    /// Validates the configuration and assembles the pipeline.
    pub fn build(self) -> ExtractResult<TableExtractionPipeline> {
        self.config.validate()?;

        let missing = |what: &str| {
            ExtractError::config_error(format!(
                "no {what} configured; set an engine command or provide one to the builder"
            ))
        };
        let layout_detector = self.layout_detector.ok_or_else(|| missing("layout detector"))?;
        let cell_detector = self.cell_detector.ok_or_else(|| missing("cell detector"))?;
        let table_recognizer = self
            .table_recognizer
            .ok_or_else(|| missing("table recognizer"))?;

        let rasterizer = self.rasterizer.unwrap_or_else(|| {
            Arc::new(FileRasterizer::new().with_page_range(self.config.page_range))
        });

        Ok(TableExtractionPipeline {
            loader: DocumentLoader::new(
                rasterizer,
                self.config.working_dpi,
                self.config.highres_dpi,
            ),
            layout_detector,
            region_extractor: TableRegionExtractor::new(),
            cell_resolver: CellBlockResolver::new(cell_detector)
                .with_table_thresh(self.config.table_thresh),
            table_recognizer,
            aggregator: ResultAggregator::new(),
            results_dir: self.config.results_dir,
            save_images: self.config.save_images,
        })
    }
}

/// Extracts tables from documents and writes them grouped by document.
pub struct TableExtractionPipeline {
    loader: DocumentLoader,
    layout_detector: Arc<dyn LayoutDetector>,
    region_extractor: TableRegionExtractor,
    cell_resolver: CellBlockResolver,
    table_recognizer: Arc<dyn TableRecognizer>,
    aggregator: ResultAggregator,
    results_dir: PathBuf,
    save_images: bool,
}

impl std::fmt::Debug for TableExtractionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableExtractionPipeline")
            .field("loader", &self.loader)
            .field("cell_resolver", &self.cell_resolver)
            .field("results_dir", &self.results_dir)
            .field("save_images", &self.save_images)
            .finish_non_exhaustive()
    }
}

impl TableExtractionPipeline {
    pub fn builder(config: ExtractionConfig) -> TableExtractionPipelineBuilder {
        TableExtractionPipelineBuilder::from_config(config)
    }

    /// Loads `path` and runs every stage on its pages.
    pub fn extract(&self, path: &Path) -> ExtractResult<ExtractionRun> {
        let pages = self.loader.load(path)?;
        self.extract_pages(&pages)
    }

    /// Runs extraction on `path` and persists the result.
    ///
    /// Results and table images are published together; a failed run leaves
    /// the results directory untouched.
    pub fn process(&self, path: &Path) -> ExtractResult<ProcessedInput> {
        let run = self.extract(path)?;
        let dir = results_location(&self.results_dir, path);
        commit_results(&run.result, &dir, |staging| {
            if self.save_images {
                self.write_table_images(staging, &run)?;
            }
            Ok(())
        })?;
        tracing::info!(
            target: "tables",
            path = %dir.display(),
            documents = run.result.document_count(),
            tables = run.result.table_count(),
            "Wrote results"
        );
        Ok(ProcessedInput {
            dir,
            stats: run.stats,
        })
    }

    #[cfg(feature = "visualization")]
    fn write_table_images(&self, dir: &Path, run: &ExtractionRun) -> ExtractResult<()> {
        crate::output::visualization::save_table_images(dir, &run.regions, &run.cells)?;
        Ok(())
    }

    #[cfg(not(feature = "visualization"))]
    fn write_table_images(&self, _dir: &Path, _run: &ExtractionRun) -> ExtractResult<()> {
        tracing::warn!(
            target: "tables",
            "Table images requested but the `visualization` feature is disabled"
        );
        Ok(())
    }

    /// Runs layout detection through aggregation on already loaded pages.
    pub fn extract_pages(&self, pages: &[Page]) -> ExtractResult<ExtractionRun> {
        let mut stats = ExtractionStats {
            pages: pages.len(),
            documents: pages
                .iter()
                .map(|p| &*p.page_ref.document)
                .collect::<HashSet<_>>()
                .len(),
            ..Default::default()
        };

        let start = Instant::now();
        let layouts = self.detect_layout(pages)?;
        stats.layout_time = start.elapsed();

        let extraction = self.region_extractor.extract(pages, layouts)?;
        let regions = extraction.regions;
        stats.tables = regions.len();
        stats.empty_pages = extraction.table_counts.iter().filter(|&&c| c == 0).count();

        let start = Instant::now();
        let resolved = self.cell_resolver.resolve(pages, &regions)?;
        stats.cell_time = start.elapsed();
        stats.structural_pages = resolved.structural_pages;
        stats.detection_pages = resolved.detection_pages;

        let start = Instant::now();
        let predictions = self.recognize(&regions, &resolved.cells)?;
        stats.recognition_time = start.elapsed();

        let result = self.aggregator.aggregate(&regions, predictions)?;
        stats.log_summary();

        Ok(ExtractionRun {
            regions,
            cells: resolved.cells,
            table_counts: extraction.table_counts,
            result,
            stats,
        })
    }

    fn detect_layout(&self, pages: &[Page]) -> ExtractResult<Vec<Vec<LayoutRegion>>> {
        if pages.is_empty() {
            return Ok(Vec::new());
        }
        let images: Vec<&RgbImage> = pages.iter().map(|p| &p.image).collect();
        let layouts = self.layout_detector.detect(&images)?;
        ensure_batch_len(PipelineStage::LayoutDetection, images.len(), layouts)
    }

    fn recognize(
        &self,
        regions: &[TableRegion],
        cells: &[Vec<CellBlock>],
    ) -> ExtractResult<Vec<TableStructure>> {
        if regions.is_empty() {
            return Ok(Vec::new());
        }
        let crops: Vec<&RgbImage> = regions.iter().map(|r| &r.image).collect();
        let predictions = self.table_recognizer.recognize(&crops, cells)?;
        ensure_batch_len(PipelineStage::Recognition, crops.len(), predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoundingBox, PageRef, RegionKind, TextLine, TextLines, TextSpan};
    use crate::loader::RenderedDocument;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    /// Layout detector keyed by page width, so each test page can carry its
    /// own table boxes.
    struct WidthKeyedLayout {
        tables: Vec<(u32, Vec<BoundingBox>)>,
    }

    impl LayoutDetector for WidthKeyedLayout {
        fn detect(&self, images: &[&RgbImage]) -> ExtractResult<Vec<Vec<LayoutRegion>>> {
            Ok(images
                .iter()
                .map(|image| {
                    self.tables
                        .iter()
                        .find(|(width, _)| *width == image.width())
                        .map(|(_, boxes)| {
                            boxes
                                .iter()
                                .map(|b| LayoutRegion::new(RegionKind::Table, *b))
                                .collect()
                        })
                        .unwrap_or_default()
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct CountingDetector {
        calls: Mutex<usize>,
    }

    impl CellDetector for CountingDetector {
        fn detect(&self, images: &[&RgbImage]) -> ExtractResult<Vec<Vec<BoundingBox>>> {
            *self.calls.lock().unwrap() += 1;
            Ok(images
                .iter()
                .map(|_| vec![BoundingBox::from_coords(0.0, 0.0, 2.0, 2.0)])
                .collect())
        }
    }

    /// Echoes the number of cells it was given.
    #[derive(Default)]
    struct EchoRecognizer {
        calls: Mutex<usize>,
    }

    impl TableRecognizer for EchoRecognizer {
        fn recognize(
            &self,
            images: &[&RgbImage],
            cells: &[Vec<CellBlock>],
        ) -> ExtractResult<Vec<TableStructure>> {
            *self.calls.lock().unwrap() += 1;
            assert_eq!(images.len(), cells.len());
            Ok(cells
                .iter()
                .map(|blocks| {
                    let mut structure = TableStructure::new();
                    structure.insert("cell_count", json!(blocks.len()));
                    structure
                })
                .collect())
        }
    }

    struct ShortRecognizer;

    impl TableRecognizer for ShortRecognizer {
        fn recognize(
            &self,
            _images: &[&RgbImage],
            _cells: &[Vec<CellBlock>],
        ) -> ExtractResult<Vec<TableStructure>> {
            Ok(Vec::new())
        }
    }

    /// Serves fixed pages: each entry is (document, working width).
    struct FixedRasterizer {
        pages: Vec<(&'static str, u32)>,
    }

    impl Rasterizer for FixedRasterizer {
        fn render(&self, _path: &Path, dpi: u32, with_text: bool) -> ExtractResult<RenderedDocument> {
            let factor = dpi / 96;
            Ok(RenderedDocument {
                images: self
                    .pages
                    .iter()
                    .map(|(_, w)| RgbImage::new(w * factor, 100 * factor))
                    .collect(),
                names: self.pages.iter().map(|(n, _)| n.to_string()).collect(),
                text_lines: with_text.then(|| vec![None; self.pages.len()]),
            })
        }
    }

    fn page(document: &str, index: usize, width: u32, text: Option<TextLines>) -> Page {
        Page {
            page_ref: PageRef::new(document, index),
            image: RgbImage::new(width, 100),
            highres_image: RgbImage::new(width * 2, 200),
            text_lines: text,
        }
    }

    fn pipeline(
        layout: WidthKeyedLayout,
        detector: Arc<CountingDetector>,
        recognizer: Arc<dyn TableRecognizer>,
    ) -> TableExtractionPipeline {
        TableExtractionPipeline::builder(ExtractionConfig::default())
            .rasterizer(Arc::new(FixedRasterizer { pages: Vec::new() }))
            .layout_detector(Arc::new(layout))
            .cell_detector(detector)
            .table_recognizer(recognizer)
            .build()
            .unwrap()
    }

    fn interleaved_layout() -> WidthKeyedLayout {
        WidthKeyedLayout {
            tables: vec![
                (101, vec![BoundingBox::from_coords(10.0, 10.0, 50.0, 40.0)]),
                (
                    103,
                    vec![
                        BoundingBox::from_coords(0.0, 0.0, 40.0, 40.0),
                        BoundingBox::from_coords(50.0, 50.0, 90.0, 90.0),
                    ],
                ),
            ],
        }
    }

    #[test]
    fn test_interleaved_documents_keep_page_and_index() {
        let pages = vec![
            page("a", 0, 101, None),
            page("a", 1, 102, None),
            page("b", 0, 103, None),
        ];
        let detector = Arc::new(CountingDetector::default());
        let run = pipeline(
            interleaved_layout(),
            detector.clone(),
            Arc::new(EchoRecognizer::default()),
        )
        .extract_pages(&pages)
        .unwrap();

        assert_eq!(run.table_counts, vec![1, 0, 2]);
        assert_eq!(run.regions.len(), 3);
        assert_eq!(run.cells.len(), 3);
        assert_eq!(run.result.table_count(), 3);

        let value = serde_json::to_value(&run.result).unwrap();
        let keys: Vec<(Value, Value)> = ["a", "b"]
            .iter()
            .flat_map(|doc| value[doc].as_array().unwrap().clone())
            .map(|r| (r["page"].clone(), r["table_idx"].clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (json!(1), json!(0)),
                (json!(1), json!(1)),
                (json!(1), json!(2))
            ]
        );
        assert_eq!(value["a"].as_array().unwrap().len(), 1);
        // Two pages with tables, neither with a text layer.
        assert_eq!(*detector.calls.lock().unwrap(), 2);
        assert_eq!(run.stats.detection_pages, 2);
        assert_eq!(run.stats.empty_pages, 1);
        assert_eq!(run.stats.documents, 2);
    }

    #[test]
    fn test_text_layer_pages_skip_detection() {
        let text = TextLines {
            page_width: 101.0,
            page_height: 100.0,
            lines: vec![TextLine {
                bbox: BoundingBox::from_coords(15.0, 15.0, 30.0, 20.0),
                spans: vec![TextSpan {
                    bbox: BoundingBox::from_coords(15.0, 15.0, 30.0, 20.0),
                    text: "Cases".into(),
                }],
            }],
        };
        let pages = vec![page("a", 0, 101, Some(text))];
        let detector = Arc::new(CountingDetector::default());
        let run = pipeline(
            interleaved_layout(),
            detector.clone(),
            Arc::new(EchoRecognizer::default()),
        )
        .extract_pages(&pages)
        .unwrap();

        assert_eq!(run.cells[0].len(), 1);
        assert_eq!(run.cells[0][0].text.as_deref(), Some("Cases"));
        assert_eq!(*detector.calls.lock().unwrap(), 0);
        assert_eq!(run.stats.structural_pages, 1);
        let record = &run.result.get("a").unwrap()[0];
        assert_eq!(record.structure.get("cell_count"), Some(&json!(1)));
    }

    #[test]
    fn test_no_tables_skips_downstream_engines() {
        let pages = vec![page("a", 0, 102, None), page("a", 1, 104, None)];
        let detector = Arc::new(CountingDetector::default());
        let recognizer = Arc::new(EchoRecognizer::default());
        let run = pipeline(interleaved_layout(), detector.clone(), recognizer.clone())
            .extract_pages(&pages)
            .unwrap();

        assert_eq!(run.table_counts, vec![0, 0]);
        assert!(run.result.is_empty());
        assert_eq!(*detector.calls.lock().unwrap(), 0);
        assert_eq!(*recognizer.calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_short_recognition_batch_aborts() {
        let pages = vec![page("a", 0, 101, None)];
        let err = pipeline(
            interleaved_layout(),
            Arc::new(CountingDetector::default()),
            Arc::new(ShortRecognizer),
        )
        .extract_pages(&pages)
        .unwrap_err();
        assert!(matches!(
            err,
            ExtractError::BatchMismatch {
                stage: PipelineStage::Recognition,
                expected: 1,
                actual: 0
            }
        ));
    }

    #[test]
    fn test_build_requires_engines() {
        let err = TableExtractionPipeline::builder(ExtractionConfig::default())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("layout detector"));
    }

    #[test]
    fn test_process_writes_results_file() {
        let out = tempfile::tempdir().unwrap();
        let config = ExtractionConfig {
            results_dir: out.path().to_path_buf(),
            save_images: true,
            ..Default::default()
        };
        let pipeline = TableExtractionPipeline::builder(config)
            .rasterizer(Arc::new(FixedRasterizer {
                pages: vec![("report", 101), ("report", 103)],
            }))
            .layout_detector(Arc::new(interleaved_layout()))
            .cell_detector(Arc::new(CountingDetector::default()))
            .table_recognizer(Arc::new(EchoRecognizer::default()))
            .build()
            .unwrap();

        let processed = pipeline.process(Path::new("/input/report.pdf")).unwrap();
        assert_eq!(processed.stats.tables, 3);
        let dir = processed.dir;
        assert_eq!(dir, out.path().join("report"));

        let text = std::fs::read_to_string(dir.join("results.json")).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        let records = value["report"].as_array().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["page"], json!(1));
        assert_eq!(records[1]["page"], json!(2));
        assert_eq!(records[2]["table_idx"], json!(2));

        #[cfg(feature = "visualization")]
        assert!(dir.join("report_page2_table2.png").is_file());
    }

    #[test]
    fn test_failed_run_writes_nothing() {
        let out = tempfile::tempdir().unwrap();
        let config = ExtractionConfig {
            results_dir: out.path().to_path_buf(),
            ..Default::default()
        };
        let pipeline = TableExtractionPipeline::builder(config)
            .rasterizer(Arc::new(FixedRasterizer {
                pages: vec![("report", 101)],
            }))
            .layout_detector(Arc::new(interleaved_layout()))
            .cell_detector(Arc::new(CountingDetector::default()))
            .table_recognizer(Arc::new(ShortRecognizer))
            .build()
            .unwrap();

        assert!(pipeline.process(Path::new("report.pdf")).is_err());
        assert!(!out.path().join("report").exists());
    }
}
