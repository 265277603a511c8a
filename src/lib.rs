//! Keep markdown code blocks in sync with source files and command output.
//!
//! A block opts in with a directive: either a comment on its first line
//! (`# src/example.py`, `// $ cargo --version`) or a marker right above it
//! (`<!-- embedme src/lib.rs#L10-L20 -->`). See [`embed`] for the pipeline
//! and [`file_processor`] for running it over documents on disk.

pub mod config;
pub mod embed;
pub mod exit_codes;
pub mod file_processor;
pub mod utils;

pub use embed::{EmbedOptions, EmbedResult, Embedder, OutputMode};
