//! Directive resolution.
//!
//! Turns one [`Block`] into its next state: skipped for one of several
//! reasons, already up to date, or resolved to a replacement interior. Only
//! errors that abort the document (and invalid directives, which the caller
//! may choose to tolerate) come back as `Err`.

use super::block::Block;
use super::config::EmbedOptions;
use super::directive::{CommandDirective, Directive, FileDirective, parse_directive};
use super::error::ResolveError;
use super::executor::ShellExecutor;
use super::fs::FileSystem;
use super::language::LanguageTable;
use crate::utils::line_ending::{detect_line_ending, preview_lines, split_lines};

/// Lines of offending output shown when refusing to embed a fence.
const FENCE_PREVIEW_LINES: usize = 3;

/// Outcome of resolving one block.
///
/// Every state except [`BlockState::Resolved`] leaves the block untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockState {
    /// Preceded by an ignore-next marker.
    Ignored,
    /// No language tag, or a tag with no known comment syntax.
    LanguageUnresolved { language: String },
    /// Neither a marker nor a first-line comment carries a directive.
    NoDirective,
    /// The directive did not parse and the caller chose to keep going.
    DirectiveInvalid { directive: String },
    AlreadyUpToDate,
    Resolved {
        replacement: String,
        /// Number of embedded lines, excluding the header.
        line_count: usize,
    },
}

impl BlockState {
    pub fn is_resolved(&self) -> bool {
        matches!(self, BlockState::Resolved { .. })
    }
}

/// Resolves blocks against a filesystem and a shell.
pub struct DirectiveResolver<'a> {
    options: &'a EmbedOptions,
    languages: &'a LanguageTable,
    fs: &'a dyn FileSystem,
    shell: &'a dyn ShellExecutor,
}

impl<'a> DirectiveResolver<'a> {
    pub fn new(
        options: &'a EmbedOptions,
        languages: &'a LanguageTable,
        fs: &'a dyn FileSystem,
        shell: &'a dyn ShellExecutor,
    ) -> Self {
        Self {
            options,
            languages,
            fs,
            shell,
        }
    }

    /// Resolve `block` of a document whose newline convention is `newline`.
    pub fn resolve(&self, block: &Block, newline: &str) -> Result<BlockState, ResolveError> {
        if block.ignore_next {
            return Ok(BlockState::Ignored);
        }
        if block.language.is_empty() {
            return Ok(BlockState::LanguageUnresolved {
                language: String::new(),
            });
        }
        let Some(family) = self.languages.comment_family(&block.language) else {
            return Ok(BlockState::LanguageUnresolved {
                language: block.language.clone(),
            });
        };

        let inline = !block.inline_directive.is_empty();
        let directive_text = if inline {
            block.inline_directive.clone()
        } else {
            match family.first_comment(&block.code) {
                Some(comment) if !comment.trim().is_empty() => comment,
                _ => return Ok(BlockState::NoDirective),
            }
        };

        let Some(directive) = parse_directive(&directive_text) else {
            return Err(ResolveError::InvalidDirective {
                directive: directive_text.trim().to_string(),
            });
        };
        log::debug!("resolving {directive} ({} block)", block.language);

        let lines = match &directive {
            Directive::File(file) => self.file_lines(file)?,
            Directive::Command(command) => self.command_lines(command)?,
        };

        let mut output = lines.join(newline);
        output.truncate(output.trim_end().len());
        output.push_str(newline);

        let output_lines: Vec<String> = split_lines(&output, newline).into_iter().map(String::from).collect();
        if output_lines.iter().any(|line| line.starts_with("```")) {
            return Err(ResolveError::NestedFence {
                preview: preview_lines(&output_lines, FENCE_PREVIEW_LINES).join(newline),
            });
        }

        let mut replacement = String::with_capacity(output.len() + 64);
        if !inline
            && !self.options.strip_embed_comment
            && let Some(header) = family.render(&directive_text)
        {
            replacement.push_str(&header);
            replacement.push_str(newline);
            replacement.push_str(newline);
        }
        replacement.push_str(&output);
        let replacement = indent_lines(&replacement, &block.indent, newline);

        if replacement == block.code {
            return Ok(BlockState::AlreadyUpToDate);
        }
        Ok(BlockState::Resolved {
            replacement,
            line_count: output_lines.len().saturating_sub(1),
        })
    }

    /// Contents of the first matching file across the base directories, sliced
    /// to the directive's range and de-indented.
    fn file_lines(&self, file: &FileDirective) -> Result<Vec<String>, ResolveError> {
        let searched: Vec<_> = self
            .options
            .base_dirs()
            .iter()
            .map(|dir| dir.join(&file.path))
            .collect();
        let Some(path) = searched.iter().find(|candidate| self.fs.is_file(candidate)) else {
            return Err(ResolveError::FileNotFound {
                path: file.path.clone(),
                searched,
            });
        };

        let bytes = self.fs.read(path).map_err(|source| ResolveError::ReadFile {
            path: path.clone(),
            source,
        })?;
        let content = String::from_utf8_lossy(&bytes);
        let lines = split_lines(&content, detect_line_ending(&bytes));
        let range = file.range(lines.len());
        Ok(dedent(&lines[range]))
    }

    /// Combined output of the command, run in the working directory.
    fn command_lines(&self, command: &CommandDirective) -> Result<Vec<String>, ResolveError> {
        let result = self.shell.run(&command.shell_command, &self.options.working_dir)?;
        let output = String::from_utf8_lossy(&result.output);
        if !result.success {
            return Err(ResolveError::CommandFailed {
                command: command.shell_command.clone(),
                exit_code: result.exit_code,
                output: output.trim_end().to_string(),
            });
        }
        let newline = detect_line_ending(&result.output);
        Ok(split_lines(&output, newline).into_iter().map(String::from).collect())
    }
}

/// Strip the leading whitespace shared by all non-blank lines.
fn dedent(lines: &[&str]) -> Vec<String> {
    let common = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                line.chars().skip(common).collect()
            }
        })
        .collect()
}

/// Prefix every line with `indent`, leaving the empty tail after the final
/// newline alone.
fn indent_lines(text: &str, indent: &str, newline: &str) -> String {
    if indent.is_empty() {
        return text.to_string();
    }
    let pieces = split_lines(text, newline);
    let last = pieces.len() - 1;
    pieces
        .iter()
        .enumerate()
        .map(|(i, piece)| {
            if i == last && piece.is_empty() {
                String::new()
            } else {
                format!("{indent}{piece}")
            }
        })
        .collect::<Vec<_>>()
        .join(newline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::config::OnInvalid;
    use crate::embed::executor::{CommandOutput, ExecutorError};
    use crate::embed::fs::MemoryFileSystem;
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    /// Returns canned output and records the commands it was asked to run.
    struct FakeShell {
        output: &'static str,
        exit_code: i32,
        calls: RefCell<Vec<(String, PathBuf)>>,
    }

    impl FakeShell {
        fn new(output: &'static str) -> Self {
            Self {
                output,
                exit_code: 0,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ShellExecutor for FakeShell {
        fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, ExecutorError> {
            self.calls.borrow_mut().push((command.to_string(), cwd.to_path_buf()));
            Ok(CommandOutput {
                output: self.output.as_bytes().to_vec(),
                exit_code: self.exit_code,
                success: self.exit_code == 0,
            })
        }
    }

    fn block(language: &str, code: &str) -> Block {
        Block {
            language: language.to_string(),
            code: code.to_string(),
            ..Default::default()
        }
    }

    fn resolve_with(
        options: &EmbedOptions,
        fs: &MemoryFileSystem,
        shell: &FakeShell,
        block: &Block,
    ) -> Result<BlockState, ResolveError> {
        let languages = LanguageTable::new();
        DirectiveResolver::new(options, &languages, fs, shell).resolve(block, "\n")
    }

    fn replacement(state: BlockState) -> String {
        match state {
            BlockState::Resolved { replacement, .. } => replacement,
            other => panic!("expected a resolved block, got {other:?}"),
        }
    }

    #[test]
    fn test_file_directive_from_first_line() {
        let options = EmbedOptions::new("/work");
        let fs = MemoryFileSystem::new().with_file("/work/code/greet.py", "def greet():\n    print('hi')\n");
        let shell = FakeShell::new("");

        let state = resolve_with(&options, &fs, &shell, &block("python", "# code/greet.py\n")).unwrap();
        assert_eq!(
            state,
            BlockState::Resolved {
                replacement: "# code/greet.py\n\ndef greet():\n    print('hi')\n".to_string(),
                line_count: 2,
            }
        );
    }

    #[test]
    fn test_line_range_is_zero_based_and_exclusive() {
        let options = EmbedOptions::new("/work");
        let fs = MemoryFileSystem::new().with_file("/work/code/foo.py", "l0\nl1\nl2\nl3\nl4\n");
        let shell = FakeShell::new("");

        let state = resolve_with(&options, &fs, &shell, &block("py", "# code/foo.py#L2-L4\n")).unwrap();
        assert_eq!(replacement(state), "# code/foo.py#L2-L4\n\nl2\nl3\n");
    }

    #[test]
    fn test_inverted_range_embeds_whole_file() {
        let options = EmbedOptions::new("/work");
        let fs = MemoryFileSystem::new().with_file("/work/a.txt", "one\ntwo\n");
        let shell = FakeShell::new("");

        let state = resolve_with(&options, &fs, &shell, &block("txt", "// a.txt#L5-L1\n")).unwrap();
        assert_eq!(replacement(state), "// a.txt#L5-L1\n\none\ntwo\n");
    }

    #[test]
    fn test_selected_lines_are_dedented() {
        let options = EmbedOptions::new("/work");
        let fs = MemoryFileSystem::new().with_file(
            "/work/lib.rs",
            "impl Foo {\n    fn bar() {\n\n        baz();\n    }\n}\n",
        );
        let shell = FakeShell::new("");

        let state = resolve_with(&options, &fs, &shell, &block("rust", "// lib.rs#L1-L5\n")).unwrap();
        assert_eq!(replacement(state), "// lib.rs#L1-L5\n\nfn bar() {\n\n    baz();\n}\n");
    }

    #[test]
    fn test_base_dir_is_searched_first() {
        let mut options = EmbedOptions::new("/work");
        options.base = Some(PathBuf::from("/base"));
        let fs = MemoryFileSystem::new()
            .with_file("/base/a.sh", "echo base\n")
            .with_file("/work/a.sh", "echo work\n");
        let shell = FakeShell::new("");

        let state = resolve_with(&options, &fs, &shell, &block("sh", "# a.sh\n")).unwrap();
        assert_eq!(replacement(state), "# a.sh\n\necho base\n");
    }

    #[test]
    fn test_falls_back_to_working_dir() {
        let mut options = EmbedOptions::new("/work");
        options.base = Some(PathBuf::from("/base"));
        let fs = MemoryFileSystem::new().with_file("/work/a.sh", "echo work\n");
        let shell = FakeShell::new("");

        let state = resolve_with(&options, &fs, &shell, &block("sh", "# a.sh\n")).unwrap();
        assert_eq!(replacement(state), "# a.sh\n\necho work\n");
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let options = EmbedOptions::new("/work");
        let fs = MemoryFileSystem::new();
        let shell = FakeShell::new("");

        let err = resolve_with(&options, &fs, &shell, &block("py", "# missing.py\n")).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, ResolveError::FileNotFound { ref path, .. } if path == "missing.py"));
    }

    #[test]
    fn test_crlf_source_into_lf_document() {
        let options = EmbedOptions::new("/work");
        let fs = MemoryFileSystem::new().with_file("/work/win.txt", "a\r\nb\r\n");
        let shell = FakeShell::new("");

        let state = resolve_with(&options, &fs, &shell, &block("txt", "// win.txt\n")).unwrap();
        assert_eq!(replacement(state), "// win.txt\n\na\nb\n");
    }

    #[test]
    fn test_command_directive() {
        let options = EmbedOptions::new("/work");
        let fs = MemoryFileSystem::new();
        let shell = FakeShell::new("hello\n\n\n");

        let state = resolve_with(&options, &fs, &shell, &block("sh", "# $ echo hello\n")).unwrap();
        assert_eq!(replacement(state), "# $ echo hello\n\nhello\n");
        assert_eq!(
            *shell.calls.borrow(),
            vec![("echo hello".to_string(), PathBuf::from("/work"))]
        );
    }

    #[test]
    fn test_command_directive_stripped_header() {
        let mut options = EmbedOptions::new("/work");
        options.strip_embed_comment = true;
        let fs = MemoryFileSystem::new();
        let shell = FakeShell::new("hello\n");

        let state = resolve_with(&options, &fs, &shell, &block("sh", "# $ echo hello\n")).unwrap();
        assert_eq!(replacement(state), "hello\n");
    }

    #[test]
    fn test_failing_command_is_fatal() {
        let options = EmbedOptions::new("/work");
        let fs = MemoryFileSystem::new();
        let mut shell = FakeShell::new("boom\n");
        shell.exit_code = 2;

        let err = resolve_with(&options, &fs, &shell, &block("sh", "# $ false\n")).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, ResolveError::CommandFailed { exit_code: 2, ref output, .. } if output == "boom"));
    }

    #[test]
    fn test_inline_directive_writes_no_header() {
        let options = EmbedOptions::new("/work");
        let fs = MemoryFileSystem::new().with_file("/work/data.json", "{\n  \"a\": 1\n}\n");
        let shell = FakeShell::new("");
        let mut b = block("json", "");
        b.inline_directive = "data.json".to_string();

        let state = resolve_with(&options, &fs, &shell, &b).unwrap();
        assert_eq!(replacement(state), "{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn test_indent_is_reapplied() {
        let options = EmbedOptions::new("/work");
        let fs = MemoryFileSystem::new().with_file("/work/a.py", "x = 1\n\ny = 2\n");
        let shell = FakeShell::new("");
        let mut b = block("py", "  # a.py\n");
        b.indent = "  ".to_string();

        let state = resolve_with(&options, &fs, &shell, &b).unwrap();
        assert_eq!(replacement(state), "  # a.py\n  \n  x = 1\n  \n  y = 2\n");
    }

    #[test]
    fn test_already_up_to_date() {
        let options = EmbedOptions::new("/work");
        let fs = MemoryFileSystem::new().with_file("/work/a.py", "x = 1\n");
        let shell = FakeShell::new("");

        let state = resolve_with(&options, &fs, &shell, &block("py", "# a.py\n\nx = 1\n")).unwrap();
        assert_eq!(state, BlockState::AlreadyUpToDate);
    }

    #[test]
    fn test_nested_fence_is_refused() {
        let options = EmbedOptions::new("/work");
        let fs = MemoryFileSystem::new().with_file("/work/README.md", "# Title\n\n```sh\nls\n```\n");
        let shell = FakeShell::new("");

        let err = resolve_with(&options, &fs, &shell, &block("md", "<!-- README.md -->\n")).unwrap_err();
        assert!(err.is_fatal());
        let ResolveError::NestedFence { preview } = err else {
            panic!("expected a nested fence error");
        };
        assert!(preview.starts_with("# Title\n\n```sh\n"));
        assert!(preview.ends_with("lines omitted"));
    }

    #[test]
    fn test_skip_states() {
        let options = EmbedOptions::new("/work");
        let fs = MemoryFileSystem::new();
        let shell = FakeShell::new("");

        let mut ignored = block("py", "# a.py\n");
        ignored.ignore_next = true;
        assert_eq!(resolve_with(&options, &fs, &shell, &ignored).unwrap(), BlockState::Ignored);

        assert_eq!(
            resolve_with(&options, &fs, &shell, &block("", "# a.py\n")).unwrap(),
            BlockState::LanguageUnresolved {
                language: String::new()
            }
        );
        assert_eq!(
            resolve_with(&options, &fs, &shell, &block("brainfuck", "+++\n")).unwrap(),
            BlockState::LanguageUnresolved {
                language: "brainfuck".to_string()
            }
        );
        assert_eq!(
            resolve_with(&options, &fs, &shell, &block("py", "print('no directive')\n")).unwrap(),
            BlockState::NoDirective
        );
        assert_eq!(
            resolve_with(&options, &fs, &shell, &block("json", "{}\n")).unwrap(),
            BlockState::NoDirective
        );
        assert!(shell.calls.borrow().is_empty());
    }

    #[test]
    fn test_invalid_directive_is_not_fatal() {
        let mut options = EmbedOptions::new("/work");
        options.on_invalid = OnInvalid::Fail;
        let fs = MemoryFileSystem::new();
        let shell = FakeShell::new("");

        let err = resolve_with(&options, &fs, &shell, &block("py", "# just a comment\n")).unwrap_err();
        assert!(!err.is_fatal());
        assert!(matches!(err, ResolveError::InvalidDirective { ref directive } if directive == "just a comment"));
    }

    #[test]
    fn test_dedent_ignores_blank_lines() {
        assert_eq!(dedent(&["    a", "", "      b", "  "]), vec!["a", "", "  b", ""]);
        assert_eq!(dedent(&["a", "  b"]), vec!["a", "  b"]);
        assert!(dedent(&[]).is_empty());
    }

    #[test]
    fn test_indent_lines_keeps_final_newline() {
        assert_eq!(indent_lines("a\nb\n", "> ", "\n"), "> a\n> b\n");
        assert_eq!(indent_lines("a\r\n", "\t", "\r\n"), "\ta\r\n");
        assert_eq!(indent_lines("a\n", "", "\n"), "a\n");
    }
}
