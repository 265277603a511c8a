//! Directive parsing.
//!
//! A directive is the text of an embed comment. It is either a file
//! reference with an optional line range (`src/lib.rs#L2-L10`) or a shell
//! command (`$ cargo --version`). Parsers are tried in a fixed order and the
//! first match wins.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static FILE_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?P<path>\S+?)(?:#L?(?P<start>\d+)-L?(?P<end>\d+))?\s*$").unwrap());
static COMMAND_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\$\s*(?P<command>[\s\S]+?)\s*$").unwrap());

/// Embed the contents of a file, optionally restricted to a line range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDirective {
    pub path: String,
    /// 0-based index of the first embedded line.
    pub start_line: usize,
    /// 0-based, exclusive.
    pub end_line: usize,
    pub has_range: bool,
}

impl FileDirective {
    /// The effective `[start, end)` slice for a file with `line_count` lines.
    ///
    /// An empty or inverted range selects the whole file; `end` is clamped.
    pub fn range(&self, line_count: usize) -> std::ops::Range<usize> {
        if !self.has_range || self.start_line >= self.end_line {
            return 0..line_count;
        }
        let end = self.end_line.min(line_count);
        self.start_line.min(end)..end
    }
}

/// Embed the combined output of a shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDirective {
    pub shell_command: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    File(FileDirective),
    Command(CommandDirective),
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::File(file) if file.has_range => {
                write!(f, "{}#L{}-L{}", file.path, file.start_line, file.end_line)
            }
            Directive::File(file) => write!(f, "{}", file.path),
            Directive::Command(command) => write!(f, "$ {}", command.shell_command),
        }
    }
}

type ParseStrategy = fn(&str) -> Option<Directive>;

/// Parse attempts in priority order.
const PARSE_STRATEGIES: &[ParseStrategy] = &[parse_file_directive, parse_command_directive];

pub fn parse_file_directive(text: &str) -> Option<Directive> {
    let caps = FILE_DIRECTIVE.captures(text)?;
    let path = caps.name("path")?.as_str().to_string();
    let range = match (caps.name("start"), caps.name("end")) {
        (Some(start), Some(end)) => Some((start.as_str().parse().ok()?, end.as_str().parse().ok()?)),
        _ => None,
    };
    let (start_line, end_line) = range.unwrap_or((0, 0));
    Some(Directive::File(FileDirective {
        path,
        start_line,
        end_line,
        has_range: range.is_some(),
    }))
}

pub fn parse_command_directive(text: &str) -> Option<Directive> {
    let caps = COMMAND_DIRECTIVE.captures(text)?;
    Some(Directive::Command(CommandDirective {
        shell_command: caps.name("command")?.as_str().to_string(),
    }))
}

/// Classify a directive string. `None` means it matches no known form.
pub fn parse_directive(text: &str) -> Option<Directive> {
    PARSE_STRATEGIES.iter().find_map(|parse| parse(text))
}
