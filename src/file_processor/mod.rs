//! Source discovery and per-document processing.
//!
//! This module turns command line arguments into document paths and runs each
//! document through the embedder in the selected output mode.

mod discovery;
mod processing;

pub use discovery::*;
pub use processing::*;
