//! Fenced code block extraction.
//!
//! A single composite pattern finds every backtick-fenced block together with
//! an optional embed marker on the line(s) right above it:
//!
//! ```text
//! <!-- embedme src/lib.rs#L1-L9 -->     sets Block::inline_directive
//! <!-- embedme ignore-next -->          sets Block::ignore_next
//! ```
//!
//! Only the block interior is captured as a span; markers, fences and the text
//! between blocks stay untouched. The closing fence must repeat the opening
//! fence's indentation exactly.

use crate::utils::line_ending::{detect_line_ending, line_number};
use fancy_regex::{Regex as FancyRegex, RegexBuilder};
use std::sync::LazyLock;

const BLOCK_PATTERN: &str = concat!(
    r"(?m)",
    // optional marker, possibly followed by blank lines
    r"(?:^[ \t]*<!--[ \t]*embedme",
    r"(?:(?P<ignore>[ \t-]+ignore-next)|[ \t]+(?![ \t]*ignore-next[ \t]*-->)(?P<directive>[^\r\n]+?))",
    r"[ \t]*-->[ \t]*\r?\n(?:[ \t]*\r?\n)*)?",
    // opening fence
    r"^(?P<indent>[ \t]*)```(?P<language>[^\s`]*)[^\r\n]*\r?\n",
    // interior, up to the first closing fence at the same indentation
    r"(?P<code>[\s\S]*?)",
    r"^\k<indent>```[ \t]*\r?$",
);

static BLOCK_REGEX: LazyLock<FancyRegex> = LazyLock::new(|| {
    RegexBuilder::new(BLOCK_PATTERN)
        .backtrack_limit(10_000_000)
        .build()
        .unwrap()
});

/// One fenced code block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    /// Byte offset of the first interior byte.
    pub start: usize,
    /// Byte offset just past the interior (the closing fence line starts here).
    pub end: usize,
    /// 1-based line of `start`.
    pub start_line: usize,
    /// 1-based line of `end`.
    pub end_line: usize,
    /// Whitespace before the opening fence.
    pub indent: String,
    /// Interior text, verbatim.
    pub code: String,
    /// First word of the info string, possibly empty.
    pub language: String,
    /// Directive from a preceding `<!-- embedme ... -->` marker, possibly empty.
    pub inline_directive: String,
    /// Set by a preceding `<!-- embedme ignore-next -->` marker.
    pub ignore_next: bool,
}

/// Extract all fenced code blocks in document order.
///
/// Blocks never overlap and are ordered by `start`. A document without fences
/// yields no blocks. Fails when the scan gives up part way, e.g. when a huge
/// document exhausts the backtracking budget, rather than returning the blocks
/// found so far.
pub fn extract_blocks(source: &str) -> Result<Vec<Block>, fancy_regex::Error> {
    scan_blocks(&BLOCK_REGEX, source)
}

fn scan_blocks(regex: &FancyRegex, source: &str) -> Result<Vec<Block>, fancy_regex::Error> {
    let newline = detect_line_ending(source.as_bytes());
    let mut blocks = Vec::new();

    for caps in regex.captures_iter(source) {
        let caps = caps?;
        let Some(code) = caps.name("code") else {
            continue;
        };
        let text = |name: &str| caps.name(name).map(|m| m.as_str().to_string()).unwrap_or_default();

        blocks.push(Block {
            start: code.start(),
            end: code.end(),
            start_line: line_number(source, code.start(), newline),
            end_line: line_number(source, code.end(), newline),
            indent: text("indent"),
            code: code.as_str().to_string(),
            language: text("language"),
            inline_directive: text("directive").trim().to_string(),
            ignore_next: caps.name("ignore").is_some(),
        });
    }

    Ok(blocks)
}
