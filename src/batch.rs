//! Offline batch mode: analyse every supported file under a directory and
//! write one JSON results file.

use crate::analyze::{Analyzer, FileInput};
use crate::config::BatchConfig;
use crate::error::AnalyzerError;
use crate::output::{BatchEntry, BatchReport};
use crate::pipeline::classify::has_supported_extension;
use crate::progress::ProgressCallback;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::{DirEntry, WalkDir};

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

/// Result key for `path`: relative to `input_dir`, `/`-separated.
pub fn relative_key(input_dir: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(input_dir).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Collect supported files under `input_dir`, recursively, in sorted order.
///
/// Hidden files and directories are skipped. Unreadable entries are logged
/// and skipped. A missing input directory is logged and yields no inputs.
pub fn scan_inputs(input_dir: &Path) -> Vec<FileInput> {
    if !input_dir.is_dir() {
        error!(
            "Input directory not found or is not a directory: '{}'",
            input_dir.display()
        );
        return Vec::new();
    }

    let mut inputs = Vec::new();
    let walker = WalkDir::new(input_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !has_supported_extension(entry.path()) {
            continue;
        }
        let key = relative_key(input_dir, entry.path());
        inputs.push(FileInput::new(entry.into_path(), key));
    }
    inputs
}

/// Write the report as pretty JSON, atomically (temp file + rename).
///
/// The output directory is created when missing.
pub fn write_report(report: &BatchReport, path: &Path) -> Result<(), AnalyzerError> {
    let write_err = |source: std::io::Error| AnalyzerError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(write_err)?;

    let json = serde_json::to_string_pretty(report)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
    tmp.write_all(json.as_bytes()).map_err(write_err)?;
    tmp.write_all(b"\n").map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// What a batch run produced.
#[derive(Debug, Default)]
pub struct BatchRun {
    pub report: BatchReport,
    /// Where the report was written; `None` when there was nothing to write
    /// or the write failed.
    pub written_to: Option<PathBuf>,
}

/// Run a batch: scan, analyse sequentially, write the results file.
///
/// Never fails: a missing input directory or an unwritable results file is
/// logged and reflected in the returned [`BatchRun`]. When no supported
/// files are found nothing is written and the report is empty.
pub async fn run_batch(
    analyzer: &Analyzer,
    config: &BatchConfig,
    model_override: Option<&str>,
    progress: Option<&ProgressCallback>,
) -> BatchRun {
    let inputs = scan_inputs(&config.input_dir);
    if inputs.is_empty() {
        warn!(
            "No supported files found in '{}'",
            config.input_dir.display()
        );
        return BatchRun::default();
    }
    info!(
        "Found {} files to analyse in '{}'",
        inputs.len(),
        config.input_dir.display()
    );

    let results = analyzer
        .analyze_files(&inputs, &config.prompt, model_override, progress)
        .await;

    let mut report = BatchReport::default();
    for result in &results {
        report.entries.insert(
            result.filename.clone(),
            BatchEntry::from_result(result, config.include_sections),
        );
    }

    let out = config.output_path();
    match write_report(&report, &out) {
        Ok(()) => {
            info!(
                "Wrote {} results ({} errors) to '{}'",
                report.len(),
                report.error_count(),
                out.display()
            );
            BatchRun {
                report,
                written_to: Some(out),
            }
        }
        Err(e) => {
            error!("{}", e);
            BatchRun {
                report,
                written_to: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_filters_sorts_and_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("b.txt"), "b").unwrap();
        fs::write(root.join("a.PDF"), "a").unwrap();
        fs::write(root.join("notes.md"), "skip").unwrap();
        fs::write(root.join(".hidden.txt"), "skip").unwrap();
        fs::write(root.join(".git/c.txt"), "skip").unwrap();
        fs::write(root.join("sub/deeper/img.png"), "x").unwrap();

        let names: Vec<String> = scan_inputs(root).into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["a.PDF", "b.txt", "sub/deeper/img.png"]);
    }

    #[test]
    fn missing_input_dir_yields_no_inputs() {
        assert!(scan_inputs(Path::new("/nonexistent/inputs")).is_empty());
    }

    #[test]
    fn unwritable_report_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "file").unwrap();
        let err = write_report(&BatchReport::default(), &blocker.join("results.json")).unwrap_err();
        assert!(matches!(err, AnalyzerError::OutputWriteFailed { .. }));
    }

    #[test]
    fn report_written_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out/results.json");
        let mut report = BatchReport::default();
        report.entries.insert(
            "a.txt".into(),
            BatchEntry::Success {
                analysis: "text".into(),
                sections: None,
            },
        );
        write_report(&report, &out).unwrap();

        let raw = fs::read_to_string(&out).unwrap();
        let back: BatchReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, report);
        let leftovers = fs::read_dir(out.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn keys_are_slash_separated() {
        let key = relative_key(Path::new("/in"), Path::new("/in/a/b/c.txt"));
        assert_eq!(key, "a/b/c.txt");
    }
}
