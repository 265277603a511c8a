//! Newline detection and line bookkeeping.
//!
//! Documents, embedded files and command output each keep their own newline
//! convention, so everything here takes the convention as an explicit argument
//! instead of assuming `\n`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

/// Count `\r\n` pairs and bare `\n` bytes (an LF not preceded by CR) in a single pass.
pub fn count_line_endings(content: &[u8]) -> (usize, usize) {
    let mut crlf_count = 0;
    let mut lf_count = 0;
    for (i, &byte) in content.iter().enumerate() {
        if byte == b'\n' {
            if i > 0 && content[i - 1] == b'\r' {
                crlf_count += 1;
            } else {
                lf_count += 1;
            }
        }
    }
    (crlf_count, lf_count)
}

/// CRLF wins only when it strictly outnumbers bare LF. Ties and empty input are LF.
pub fn detect_line_ending_enum(content: &[u8]) -> LineEnding {
    let (crlf_count, lf_count) = count_line_endings(content);
    if crlf_count > lf_count {
        LineEnding::Crlf
    } else {
        LineEnding::Lf
    }
}

pub fn detect_line_ending(content: &[u8]) -> &'static str {
    detect_line_ending_enum(content).as_str()
}

/// 1-based line number of `byte_offset`: one plus the number of `newline`
/// delimiters in `text[..byte_offset]`.
///
/// Offsets past the end are clamped to the text length.
pub fn line_number(text: &str, byte_offset: usize, newline: &str) -> usize {
    let end = byte_offset.min(text.len());
    1 + text.as_bytes()[..end]
        .windows(newline.len())
        .filter(|window| *window == newline.as_bytes())
        .count()
}

/// Split `text` on `newline`. A trailing delimiter yields a final empty line,
/// so `split_lines("a\nb\n", "\n") == ["a", "b", ""]`.
pub fn split_lines<'a>(text: &'a str, newline: &str) -> Vec<&'a str> {
    text.split(newline).collect()
}

/// First `length` lines followed by an omission marker, for error messages.
pub fn preview_lines(lines: &[String], length: usize) -> Vec<String> {
    let shown = length.min(lines.len());
    let mut preview: Vec<String> = lines[..shown].to_vec();
    let omitted = lines.len() - shown;
    if omitted > 0 {
        preview.push(format!("... {omitted} lines omitted"));
    }
    preview
}
