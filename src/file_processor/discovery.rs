//! Source discovery: explicit paths or glob patterns, filtered by ignore files

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid glob pattern {pattern:?}: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to walk {}: {source}", .root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: ignore::Error,
    },
}

/// Sources dropped by one ignore file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredSources {
    pub ignore_file: String,
    pub count: usize,
}

/// Resolve positional arguments to a sorted, deduplicated list of absolute paths.
///
/// Without `glob` each argument is a path relative to `working_dir`. With
/// `glob` each argument is a pattern matched against paths relative to
/// `working_dir`; `*` stops at `/` and `**` crosses directories.
pub fn discover_sources(args: &[String], working_dir: &Path, glob: bool) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut sources = BTreeSet::new();

    if glob {
        if args.is_empty() {
            return Ok(Vec::new());
        }
        let matcher = build_glob_set(args)?;
        for path in walk_files(working_dir)? {
            let Ok(relative) = path.strip_prefix(working_dir) else {
                continue;
            };
            if matcher.is_match(relative) {
                sources.insert(path);
            }
        }
    } else {
        for arg in args {
            sources.insert(working_dir.join(arg));
        }
    }

    log::debug!("[embedme-discovery] {} source(s) from {args:?}", sources.len());
    Ok(sources.into_iter().collect())
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, DiscoveryError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern.trim_start_matches("./"))
            .literal_separator(true)
            .build()
            .map_err(|source| DiscoveryError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| DiscoveryError::InvalidGlob {
        pattern: patterns.join(", "),
        source,
    })
}

/// Every regular file under `root`, hidden ones included. Ignore files are
/// applied separately so that skipped sources can be reported.
fn walk_files(root: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut files = Vec::new();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .filter_entry(|entry| entry.file_name() != ".git")
        .build();

    for result in walker {
        let entry = result.map_err(|source| DiscoveryError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_some_and(|ft| ft.is_file()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Drop sources matched by any of `ignore_files` in `working_dir`.
///
/// Ignore files are applied in order; a missing or unparseable file is skipped.
/// Returns the remaining sources and, per ignore file that dropped anything,
/// how many were dropped.
pub fn filter_ignored(
    sources: Vec<PathBuf>,
    working_dir: &Path,
    ignore_files: &[String],
) -> (Vec<PathBuf>, Vec<IgnoredSources>) {
    let mut remaining = sources;
    let mut skipped = Vec::new();

    for ignore_file in ignore_files {
        let Some(matcher) = compile_ignore_file(working_dir, ignore_file) else {
            continue;
        };
        let before = remaining.len();
        remaining.retain(|source| !is_ignored(&matcher, working_dir, source));
        let count = before - remaining.len();
        if count > 0 {
            skipped.push(IgnoredSources {
                ignore_file: ignore_file.clone(),
                count,
            });
        }
    }

    (remaining, skipped)
}

fn compile_ignore_file(working_dir: &Path, ignore_file: &str) -> Option<Gitignore> {
    let path = working_dir.join(ignore_file);
    if !path.is_file() {
        return None;
    }
    let mut builder = GitignoreBuilder::new(working_dir);
    if let Some(err) = builder.add(&path) {
        log::warn!("Could not read {}: {err}", path.display());
        return None;
    }
    match builder.build() {
        Ok(matcher) => Some(matcher),
        Err(err) => {
            log::warn!("Could not compile {}: {err}", path.display());
            None
        }
    }
}

fn is_ignored(matcher: &Gitignore, working_dir: &Path, source: &Path) -> bool {
    // The matcher only understands paths under its root
    if !source.starts_with(working_dir) {
        return false;
    }
    matcher.matched_path_or_any_parents(source, false).is_ignore()
}
