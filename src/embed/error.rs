use super::executor::ExecutorError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single block could not be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{directive:?} is not a valid directive")]
    InvalidDirective { directive: String },

    #[error("file {path} not found (searched {})", display_paths(.searched))]
    FileNotFound { path: String, searched: Vec<PathBuf> },

    #[error("failed to read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("`{command}` exited with code {exit_code}:\n{output}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("refusing to embed output that would embed a nested code fence:\n{preview}")]
    NestedFence { preview: String },
}

impl ResolveError {
    /// Invalid directives are reported but leave the document intact unless
    /// the caller asks for strictness. Everything else aborts the document.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ResolveError::InvalidDirective { .. })
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum EmbedError {
    /// A block failed; carries the document path and the block's line range.
    #[error("{path}#L{start_line}-L{end_line}: {source}")]
    Block {
        path: String,
        start_line: usize,
        end_line: usize,
        #[source]
        source: ResolveError,
    },

    /// The document could not be scanned for code blocks to the end.
    #[error("{path}: could not scan for code blocks: {source}")]
    Scan {
        path: String,
        #[source]
        source: fancy_regex::Error,
    },

    #[error("invalid options: {0}")]
    InvalidOptions(String),
}
