//! Text utilities shared by the embedding pipeline.

pub mod line_ending;

pub use line_ending::{LineEnding, detect_line_ending};
