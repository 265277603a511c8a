//! Embedding of file contents and command output into fenced code blocks.
//!
//! The pipeline for one document:
//!
//! 1. [`block::extract_blocks`] finds every fenced block and the embed
//!    markers preceding it.
//! 2. [`resolver::DirectiveResolver`] maps the block language to a
//!    [`language::CommentFamily`], finds the directive (marker or first-line
//!    comment), parses it with [`directive::parse_directive`] and produces the
//!    new block interior.
//! 3. [`processor::Embedder`] stitches the untouched text and the resolved
//!    interiors back together.
//!
//! File access and shell execution go through the [`fs::FileSystem`] and
//! [`executor::ShellExecutor`] traits.

pub mod block;
pub mod config;
pub mod directive;
pub mod error;
pub mod executor;
pub mod fs;
pub mod language;
pub mod processor;
pub mod resolver;

pub use block::{Block, extract_blocks};
pub use config::{EmbedOptions, OnInvalid, OutputMode};
pub use directive::{CommandDirective, Directive, FileDirective, parse_directive};
pub use error::{EmbedError, ResolveError};
pub use executor::{CommandOutput, ExecutorError, ShellExecutor, SystemShell};
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use language::{CommentFamily, LanguageTable};
pub use processor::{BlockReport, EmbedResult, Embedder};
pub use resolver::{BlockState, DirectiveResolver};
