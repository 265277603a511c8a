//! Per-document processing: read, embed, then verify, print or write.

use crate::embed::{EmbedError, Embedder, OutputMode};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("file {path} does not exist or is not a regular file")]
    NotAFile { path: String },

    #[error("file {path} could not be read: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to embed {path}: {source}")]
    Embed {
        path: String,
        #[source]
        source: EmbedError,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Difference detected in {path}")]
    Difference { path: String },
}

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    /// Path relative to the working directory, for display.
    pub path: String,
    pub changed: bool,
    /// Number of blocks that received new content.
    pub resolved_blocks: usize,
}

/// Totals over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub documents: usize,
    pub changed: usize,
    pub written: usize,
}

/// `path` relative to `working_dir`, or as given when outside it.
pub fn to_display_path(path: &Path, working_dir: &Path) -> String {
    path.strip_prefix(working_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

/// Read and embed one document without writing anything.
pub fn embed_document(embedder: &Embedder, source: &Path) -> Result<(String, DocumentReport), ProcessingError> {
    let working_dir = &embedder.options().working_dir;
    let path = to_display_path(source, working_dir);

    if !source.is_file() {
        return Err(ProcessingError::NotAFile { path });
    }
    let markdown = std::fs::read_to_string(source).map_err(|source| ProcessingError::Read {
        path: path.clone(),
        source,
    })?;

    let result = embedder
        .embed(&markdown, &path)
        .map_err(|source| ProcessingError::Embed {
            path: path.clone(),
            source,
        })?;

    let report = DocumentReport {
        changed: result.content != markdown,
        resolved_blocks: result.resolved_count(),
        path,
    };
    Ok((result.content, report))
}

/// Process `sources` in order according to the embedder's output mode.
///
/// Stdout mode writes every document to `out`. File mode concatenates all
/// documents and writes the target once, after every document succeeded.
/// The first error stops the run; documents already written stay written.
pub fn process_sources(
    embedder: &Embedder,
    sources: &[PathBuf],
    out: &mut dyn Write,
) -> Result<RunSummary, ProcessingError> {
    let mode = embedder.options().mode.clone();
    let mut summary = RunSummary::default();
    let mut collected = String::new();

    for (i, source) in sources.iter().enumerate() {
        if i > 0 {
            log::info!("---");
        }
        let (content, report) = embed_document(embedder, source)?;
        summary.documents += 1;
        if report.changed {
            summary.changed += 1;
        }

        match &mode {
            OutputMode::Verify => {
                if report.changed {
                    return Err(ProcessingError::Difference { path: report.path });
                }
                log::info!("{} is up to date", report.path);
            }
            OutputMode::DryRun => {
                if report.changed {
                    log::info!("Would write {} with embedded changes (dry run)", report.path);
                } else {
                    log::info!("No changes to write for {}", report.path);
                }
            }
            OutputMode::Stdout => {
                out.write_all(content.as_bytes())
                    .and_then(|()| out.flush())
                    .map_err(|source| ProcessingError::Write {
                        path: "<stdout>".to_string(),
                        source,
                    })?;
            }
            OutputMode::File(_) => collected.push_str(&content),
            OutputMode::Write => {
                if report.changed {
                    log::info!("Writing {} with embedded changes.", report.path);
                    std::fs::write(source, &content).map_err(|source| ProcessingError::Write {
                        path: report.path.clone(),
                        source,
                    })?;
                    summary.written += 1;
                } else {
                    log::info!("No changes to write for {}", report.path);
                }
            }
        }
    }

    if let OutputMode::File(target) = &mode {
        let target = if target.is_absolute() {
            target.clone()
        } else {
            embedder.options().working_dir.join(target)
        };
        let display = to_display_path(&target, &embedder.options().working_dir);
        log::info!("Writing {display} with embedded changes.");
        std::fs::write(&target, collected).map_err(|source| ProcessingError::Write { path: display, source })?;
        summary.written += 1;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::{EmbedOptions, OsFileSystem, SystemShell};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    const DOC: &str = "# Doc\n\n```py\n# snippet.py\n```\n";
    const EMBEDDED: &str = "# Doc\n\n```py\n# snippet.py\n\nprint('hi')\n```\n";

    fn fixture() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("snippet.py"), "print('hi')\n").unwrap();
        fs::write(dir.path().join("README.md"), DOC).unwrap();
        dir
    }

    fn run(options: &EmbedOptions, sources: &[PathBuf]) -> (Result<RunSummary, ProcessingError>, String) {
        let shell = SystemShell::default();
        let embedder = Embedder::new(options, &OsFileSystem, &shell).unwrap();
        let mut out = Vec::new();
        let result = process_sources(&embedder, sources, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_write_mode_updates_in_place() {
        let dir = fixture();
        let readme = dir.path().join("README.md");
        let options = EmbedOptions::new(dir.path());

        let (result, out) = run(&options, std::slice::from_ref(&readme));
        assert_eq!(
            result.unwrap(),
            RunSummary {
                documents: 1,
                changed: 1,
                written: 1
            }
        );
        assert!(out.is_empty());
        assert_eq!(fs::read_to_string(&readme).unwrap(), EMBEDDED);

        // Second run has nothing to do
        let (result, _) = run(&options, &[readme]);
        assert_eq!(result.unwrap().written, 0);
    }

    #[test]
    fn test_dry_run_leaves_file_alone() {
        let dir = fixture();
        let readme = dir.path().join("README.md");
        let mut options = EmbedOptions::new(dir.path());
        options.mode = OutputMode::DryRun;

        let (result, _) = run(&options, std::slice::from_ref(&readme));
        let summary = result.unwrap();
        assert_eq!(summary.changed, 1);
        assert_eq!(summary.written, 0);
        assert_eq!(fs::read_to_string(&readme).unwrap(), DOC);
    }

    #[test]
    fn test_verify_reports_difference() {
        let dir = fixture();
        let readme = dir.path().join("README.md");
        let mut options = EmbedOptions::new(dir.path());
        options.mode = OutputMode::Verify;

        let (result, _) = run(&options, std::slice::from_ref(&readme));
        assert!(matches!(result, Err(ProcessingError::Difference { ref path }) if path == "README.md"));

        fs::write(&readme, EMBEDDED).unwrap();
        let (result, _) = run(&options, &[readme]);
        assert_eq!(result.unwrap().changed, 0);
    }

    #[test]
    fn test_stdout_mode_prints_every_document() {
        let dir = fixture();
        fs::write(dir.path().join("OTHER.md"), "plain\n").unwrap();
        let mut options = EmbedOptions::new(dir.path());
        options.mode = OutputMode::Stdout;

        let sources = vec![dir.path().join("README.md"), dir.path().join("OTHER.md")];
        let (result, out) = run(&options, &sources);
        assert_eq!(result.unwrap().documents, 2);
        assert_eq!(out, format!("{EMBEDDED}plain\n"));
        assert_eq!(fs::read_to_string(dir.path().join("README.md")).unwrap(), DOC);
    }

    #[test]
    fn test_output_file_mode() {
        let dir = fixture();
        let mut options = EmbedOptions::new(dir.path());
        options.mode = OutputMode::File(PathBuf::from("out.md"));

        let (result, out) = run(&options, &[dir.path().join("README.md")]);
        assert_eq!(result.unwrap().written, 1);
        assert!(out.is_empty());
        assert_eq!(fs::read_to_string(dir.path().join("out.md")).unwrap(), EMBEDDED);
        assert_eq!(fs::read_to_string(dir.path().join("README.md")).unwrap(), DOC);
    }

    #[test]
    fn test_missing_document() {
        let dir = tempdir().unwrap();
        let options = EmbedOptions::new(dir.path());
        let (result, _) = run(&options, &[dir.path().join("missing.md")]);
        assert!(matches!(result, Err(ProcessingError::NotAFile { ref path }) if path == "missing.md"));
    }

    #[test]
    fn test_fatal_block_leaves_document_untouched() {
        let dir = tempdir().unwrap();
        let readme = dir.path().join("README.md");
        let doc = "```py\n# missing.py\n```\n";
        fs::write(&readme, doc).unwrap();
        let options = EmbedOptions::new(dir.path());

        let (result, _) = run(&options, std::slice::from_ref(&readme));
        let err = result.unwrap_err();
        assert!(matches!(err, ProcessingError::Embed { .. }));
        assert!(err.to_string().contains("README.md#L2-L3"));
        assert_eq!(fs::read_to_string(&readme).unwrap(), doc);
    }

    #[test]
    fn test_display_path() {
        let root = Path::new("/work");
        assert_eq!(to_display_path(Path::new("/work/docs/a.md"), root), "docs/a.md");
        assert_eq!(to_display_path(Path::new("/elsewhere/a.md"), root), "/elsewhere/a.md");
    }
}
