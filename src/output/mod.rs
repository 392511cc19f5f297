//! Persistence of extraction results.
//!
//! Results for an input land in `<results_dir>/<input name>/results.json`,
//! where the input name is the file or directory name up to its first `.`.
//! The file is written whole; non-ASCII text is kept as-is.
//!
//! [`commit_results`] writes everything for a run into a staging directory
//! first and moves it into place only once all of it was written.

#[cfg(feature = "visualization")]
pub mod visualization;

use crate::core::{ExtractError, ExtractResult, PipelineStage};
use crate::domain::DocumentResult;
use crate::loader::document_name;
use std::path::{Path, PathBuf};

/// File name of the results document.
pub const RESULTS_FILE: &str = "results.json";

/// Directory that receives the results for `input`.
pub fn results_location(results_dir: &Path, input: &Path) -> PathBuf {
    results_dir.join(document_name(input))
}

/// Writes `result` as `results.json` inside `dir`, creating `dir` if needed.
///
/// Returns the path of the written file.
pub fn write_results(result: &DocumentResult, dir: &Path) -> ExtractResult<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| {
        ExtractError::processing_error(
            PipelineStage::Persistence,
            &format!("creating {}", dir.display()),
            e,
        )
    })?;
    let path = dir.join(RESULTS_FILE);
    let json = serde_json::to_string(result)?;
    std::fs::write(&path, json).map_err(|e| {
        ExtractError::processing_error(
            PipelineStage::Persistence,
            &format!("writing {}", path.display()),
            e,
        )
    })?;
    tracing::debug!(
        target: "tables",
        path = %path.display(),
        documents = result.document_count(),
        tables = result.table_count(),
        "Wrote results file"
    );
    Ok(path)
}

/// Writes `result` and any extra files into `dir` as one unit.
///
/// `extra` receives a staging directory to write into. If it or the results
/// file fails, the staging directory is removed and `dir` is left untouched.
/// Returns the path of the published results file.
pub fn commit_results<F>(result: &DocumentResult, dir: &Path, extra: F) -> ExtractResult<PathBuf>
where
    F: FnOnce(&Path) -> ExtractResult<()>,
{
    let persistence = |what: String, e: std::io::Error| {
        ExtractError::processing_error(PipelineStage::Persistence, &what, e)
    };
    let parent = dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)
        .map_err(|e| persistence(format!("creating {}", parent.display()), e))?;
    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(parent)
        .map_err(|e| persistence(format!("staging in {}", parent.display()), e))?;

    extra(staging.path())?;
    write_results(result, staging.path())?;

    std::fs::create_dir_all(dir).map_err(|e| persistence(format!("creating {}", dir.display()), e))?;
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(staging.path())
        .map_err(|e| persistence(format!("listing {}", staging.path().display()), e))?
    {
        entries.push(entry?.file_name());
    }
    // The results file goes last so it only appears once its images are in place.
    entries.sort_by_key(|name| name == RESULTS_FILE);
    for name in entries {
        let target = dir.join(&name);
        std::fs::rename(staging.path().join(&name), &target)
            .map_err(|e| persistence(format!("moving {}", target.display()), e))?;
    }
    Ok(dir.join(RESULTS_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoundingBox, PageRef, TableRegion, TableStructure};
    use crate::pipeline::ResultAggregator;
    use image::RgbImage;
    use serde_json::{Value, json};

    #[test]
    fn test_results_location_uses_input_name() {
        assert_eq!(
            results_location(Path::new("results"), Path::new("/data/mpox.v1.pdf")),
            PathBuf::from("results/mpox")
        );
        assert_eq!(
            results_location(Path::new("out"), Path::new("papers")),
            PathBuf::from("out/papers")
        );
    }

    #[test]
    fn test_write_results_creates_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested").join("doc");
        let path = write_results(&DocumentResult::default(), &dir).unwrap();
        assert_eq!(path, dir.join("results.json"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "{}");
    }

    #[test]
    fn test_commit_results_publishes_extra_files() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("report");
        let path = commit_results(&DocumentResult::default(), &dir, |staging| {
            std::fs::write(staging.join("table.png"), b"png")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(path, dir.join(RESULTS_FILE));
        assert!(path.is_file());
        assert!(dir.join("table.png").is_file());
        let leftovers: Vec<_> = std::fs::read_dir(root.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_commit_results_failure_leaves_nothing() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("report");
        let err = commit_results(&DocumentResult::default(), &dir, |staging| {
            std::fs::write(staging.join("table.png"), b"png")?;
            Err(ExtractError::invalid_input("image encoder failed"))
        })
        .unwrap_err();

        assert!(err.to_string().contains("image encoder failed"));
        assert!(!dir.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_write_results_keeps_unicode() {
        let mut structure = TableStructure::new();
        structure.insert("title", json!("Überblick µ"));
        let region = TableRegion {
            page: PageRef::new("bericht", 0),
            page_position: 0,
            bbox: BoundingBox::from_size(1.0, 1.0),
            highres_bbox: BoundingBox::from_size(1.0, 1.0),
            image: RgbImage::new(1, 1),
        };
        let result = ResultAggregator::new()
            .aggregate(&[region], vec![structure])
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = write_results(&result, dir.path()).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("Überblick µ"));

        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["bericht"][0]["page"], json!(1));
        assert_eq!(value["bericht"][0]["table_idx"], json!(0));
    }
}
