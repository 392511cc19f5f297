//! Engines backed by an external program speaking JSON over stdin/stdout.
//!
//! For each batch the images are written as PNG files into a temporary
//! directory and the program receives one request on stdin:
//!
//! ```json
//! {"task": "table_recognition", "images": ["/tmp/x/00000.png"], "cells": [[{"bbox": [0, 0, 10, 10], "text": null}]]}
//! ```
//!
//! It must print `{"results": [...]}` with one entry per image and exit 0.
//! Result entries are layout regions (`{"label", "bbox", "confidence"}`),
//! detected boxes (`{"bbox"}`) or table structures, depending on the task.

use super::{CellDetector, LayoutDetector, TableRecognizer, ensure_batch_len};
use crate::core::{ExtractError, ExtractResult, PipelineStage};
use crate::domain::{BoundingBox, CellBlock, LayoutRegion, TableStructure};
use image::RgbImage;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::debug;

/// Task identifier sent to the engine program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineTask {
    LayoutDetection,
    CellDetection,
    TableRecognition,
}

impl EngineTask {
    fn stage(self) -> PipelineStage {
        match self {
            EngineTask::LayoutDetection => PipelineStage::LayoutDetection,
            EngineTask::CellDetection => PipelineStage::CellDetection,
            EngineTask::TableRecognition => PipelineStage::Recognition,
        }
    }
}

/// Failures while driving an engine program.
#[derive(Error, Debug)]
pub enum ProcessEngineError {
    #[error("engine io")]
    Io(#[from] std::io::Error),

    #[error("failed to write batch image")]
    Image(#[from] image::ImageError),

    #[error("malformed engine response")]
    Protocol(#[from] serde_json::Error),

    #[error("failed to send request to engine `{program}`: {stderr}")]
    Request {
        program: String,
        #[source]
        source: std::io::Error,
        stderr: String,
    },

    #[error("engine `{program}` exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

#[derive(Serialize)]
struct EngineRequest<'a> {
    task: EngineTask,
    images: &'a [PathBuf],
    #[serde(skip_serializing_if = "Option::is_none")]
    cells: Option<&'a [Vec<CellBlock>]>,
}

#[derive(Deserialize)]
struct EngineResponse<T> {
    results: Vec<T>,
}

#[derive(Deserialize)]
struct DetectedBox {
    bbox: BoundingBox,
}

/// An engine that runs an external program once per batch.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessEngine {
    /// Creates an engine that runs `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends arguments passed to the program on every call.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Parses a whitespace-separated command line such as `python layout.py --gpu`.
    ///
    /// Returns `None` for a blank command.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).with_args(parts))
    }

    fn invoke<T: DeserializeOwned>(
        &self,
        task: EngineTask,
        images: &[&RgbImage],
        cells: Option<&[Vec<CellBlock>]>,
    ) -> ExtractResult<Vec<T>> {
        let stage = task.stage();
        let results = self
            .run_batch(task, images, cells)
            .map_err(|e| ExtractError::inference_error(stage, e))?;
        ensure_batch_len(stage, images.len(), results)
    }

    fn run_batch<T: DeserializeOwned>(
        &self,
        task: EngineTask,
        images: &[&RgbImage],
        cells: Option<&[Vec<CellBlock>]>,
    ) -> Result<Vec<T>, ProcessEngineError> {
        let workdir = tempfile::tempdir()?;
        let mut paths = Vec::with_capacity(images.len());
        for (idx, image) in images.iter().enumerate() {
            let path = workdir.path().join(format!("{idx:05}.png"));
            image.save(&path)?;
            paths.push(path);
        }

        let payload = serde_json::to_vec(&EngineRequest {
            task,
            images: &paths,
            cells,
        })?;

        debug!(
            target: "tables",
            program = %self.program.display(),
            task = ?task,
            batch_size = images.len(),
            "Invoking engine"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        // The request is fed from its own thread while stdout and stderr are
        // drained here, so neither side can stall on a full pipe.
        let writer = child
            .stdin
            .take()
            .map(|mut stdin| std::thread::spawn(move || stdin.write_all(&payload)));
        let output = child.wait_with_output()?;
        let sent = match writer {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("request writer panicked"))),
            None => Ok(()),
        };

        let stderr = || String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(ProcessEngineError::Exit {
                program: self.program.display().to_string(),
                status: output.status,
                stderr: stderr(),
            });
        }
        if let Err(source) = sent {
            return Err(ProcessEngineError::Request {
                program: self.program.display().to_string(),
                source,
                stderr: stderr(),
            });
        }

        let response: EngineResponse<T> = serde_json::from_slice(&output.stdout)?;
        Ok(response.results)
    }
}

impl LayoutDetector for ProcessEngine {
    fn detect(&self, images: &[&RgbImage]) -> ExtractResult<Vec<Vec<LayoutRegion>>> {
        self.invoke(EngineTask::LayoutDetection, images, None)
    }
}

impl CellDetector for ProcessEngine {
    fn detect(&self, images: &[&RgbImage]) -> ExtractResult<Vec<Vec<BoundingBox>>> {
        let detected: Vec<Vec<DetectedBox>> =
            self.invoke(EngineTask::CellDetection, images, None)?;
        Ok(detected
            .into_iter()
            .map(|boxes| boxes.into_iter().map(|b| b.bbox).collect())
            .collect())
    }
}

impl TableRecognizer for ProcessEngine {
    fn recognize(
        &self,
        images: &[&RgbImage],
        cells: &[Vec<CellBlock>],
    ) -> ExtractResult<Vec<TableStructure>> {
        if cells.len() != images.len() {
            return Err(ExtractError::batch_mismatch(
                PipelineStage::Recognition,
                images.len(),
                cells.len(),
            ));
        }
        self.invoke(EngineTask::TableRecognition, images, Some(cells))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> ProcessEngine {
        ProcessEngine::new("sh").with_args(["-c", script])
    }

    #[test]
    fn test_from_command_line() {
        let engine = ProcessEngine::from_command_line("python3 layout.py --device cpu").unwrap();
        assert_eq!(engine.program, PathBuf::from("python3"));
        assert_eq!(engine.args, vec!["layout.py", "--device", "cpu"]);
        assert!(ProcessEngine::from_command_line("   ").is_none());
    }

    #[test]
    fn test_layout_detection_round_trip() {
        let engine = shell(
            r#"cat > /dev/null; echo '{"results": [[{"label": "Table", "bbox": [1, 2, 3, 4]}], []]}'"#,
        );
        let a = RgbImage::new(8, 8);
        let b = RgbImage::new(8, 8);
        let regions = LayoutDetector::detect(&engine, &[&a, &b]).unwrap();
        assert_eq!(regions.len(), 2);
        assert!(regions[0][0].kind.is_table());
        assert!(regions[1].is_empty());
    }

    #[test]
    fn test_request_lists_written_images() {
        // Echo back one detection per image path found in the request.
        let engine = shell(
            r#"n=$(grep -o '\.png' | wc -l); printf '{"results": ['; i=0; while [ $i -lt $n ]; do [ $i -gt 0 ] && printf ','; printf '[{"bbox": [0, 0, 1, 1]}]'; i=$((i+1)); done; printf ']}'"#,
        );
        let crops = [RgbImage::new(4, 4), RgbImage::new(4, 4), RgbImage::new(4, 4)];
        let refs: Vec<&RgbImage> = crops.iter().collect();
        let boxes = CellDetector::detect(&engine, &refs).unwrap();
        assert_eq!(boxes.len(), 3);
        assert!(boxes.iter().all(|b| b.len() == 1));
    }

    #[test]
    fn test_short_batch_is_rejected() {
        let engine = shell(r#"cat > /dev/null; echo '{"results": [[]]}'"#);
        let a = RgbImage::new(2, 2);
        let b = RgbImage::new(2, 2);
        let err = LayoutDetector::detect(&engine, &[&a, &b]).unwrap_err();
        assert!(matches!(err, ExtractError::BatchMismatch { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn test_nonzero_exit_is_inference_error() {
        let engine = shell("cat > /dev/null; echo 'model missing' >&2; exit 3");
        let a = RgbImage::new(2, 2);
        let err = LayoutDetector::detect(&engine, &[&a]).unwrap_err();
        match err {
            ExtractError::Inference { stage, source } => {
                assert_eq!(stage, PipelineStage::LayoutDetection);
                assert!(source.to_string().contains("model missing"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_chatty_engine_with_large_request_completes() {
        // Fills the stderr pipe before reading a request larger than a pipe buffer.
        let engine = shell(
            r#"head -c 200000 /dev/zero >&2; cat > /dev/null; echo '{"results": [{"cells": []}]}'"#,
        );
        let crop = RgbImage::new(2, 2);
        let blocks: Vec<CellBlock> = (0..4000)
            .map(|i| CellBlock::with_text(BoundingBox::from_size(1.0, 1.0), format!("cell {i}")))
            .collect();
        let tables = TableRecognizer::recognize(&engine, &[&crop], &[blocks]).unwrap();
        assert_eq!(tables.len(), 1);
    }

    #[test]
    fn test_unread_request_reports_engine_stderr() {
        let engine = shell(r#"echo 'not listening' >&2; exec 0<&-; echo '{"results": [[]]}'"#);
        let crop = RgbImage::new(2, 2);
        let blocks: Vec<CellBlock> = (0..20000)
            .map(|i| CellBlock::with_text(BoundingBox::from_size(1.0, 1.0), format!("cell {i}")))
            .collect();
        let err = TableRecognizer::recognize(&engine, &[&crop], &[blocks]).unwrap_err();
        let ExtractError::Inference { source, .. } = err else {
            panic!("unexpected error: {err:?}");
        };
        assert!(source.to_string().contains("not listening"));
    }

    #[test]
    fn test_recognizer_output_is_kept_verbatim() {
        let engine = shell(
            r#"cat > /dev/null; echo '{"results": [{"cells":[{"bbox":[0,0,5,5],"row_id":0,"col_id":0,"is_header":true,"polygon":[[0,0],[5,0],[5,5],[0,5]]}]}]}'"#,
        );
        let crop = RgbImage::new(2, 2);
        let tables = TableRecognizer::recognize(&engine, &[&crop], &[Vec::new()]).unwrap();
        assert_eq!(
            serde_json::to_string(&tables[0]).unwrap(),
            r#"{"cells":[{"bbox":[0,0,5,5],"row_id":0,"col_id":0,"is_header":true,"polygon":[[0,0],[5,0],[5,5],[0,5]]}]}"#
        );
    }

    #[test]
    fn test_malformed_response_is_inference_error() {
        let engine = shell("cat > /dev/null; echo 'not json'");
        let a = RgbImage::new(2, 2);
        let err = TableRecognizer::recognize(&engine, &[&a], &[Vec::new()]).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Inference {
                stage: PipelineStage::Recognition,
                ..
            }
        ));
    }
}
