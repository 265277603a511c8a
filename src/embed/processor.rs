//! Document rewriting.
//!
//! [`Embedder::embed`] walks the extracted blocks left to right, copying the
//! text between blocks verbatim and replacing each block interior with its
//! resolved content. The result is computed in full before anything is
//! returned, so a fatal block error never yields a partially embedded
//! document.

use super::block::extract_blocks;
use super::config::{EmbedOptions, OnInvalid, OutputMode};
use super::error::{EmbedError, ResolveError};
use super::executor::ShellExecutor;
use super::fs::FileSystem;
use super::language::LanguageTable;
use super::resolver::{BlockState, DirectiveResolver};
use crate::utils::line_ending::detect_line_ending;

/// Final state of one block, with the lines it occupied in the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReport {
    pub start_line: usize,
    pub end_line: usize,
    pub state: BlockState,
}

/// The embedded document and what happened to each of its blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedResult {
    pub content: String,
    pub blocks: Vec<BlockReport>,
}

impl EmbedResult {
    /// Number of blocks whose interior was replaced.
    pub fn resolved_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.state.is_resolved()).count()
    }
}

pub struct Embedder<'a> {
    options: &'a EmbedOptions,
    languages: LanguageTable,
    fs: &'a dyn FileSystem,
    shell: &'a dyn ShellExecutor,
}

impl<'a> Embedder<'a> {
    /// Create an embedder, rejecting option combinations that would lose directives.
    pub fn new(
        options: &'a EmbedOptions,
        fs: &'a dyn FileSystem,
        shell: &'a dyn ShellExecutor,
    ) -> Result<Self, EmbedError> {
        options.validate()?;
        Ok(Self {
            options,
            languages: LanguageTable::new(),
            fs,
            shell,
        })
    }

    pub fn options(&self) -> &EmbedOptions {
        self.options
    }

    /// Embed all blocks of `markdown`. `rel_path` names the document in
    /// diagnostics.
    pub fn embed(&self, markdown: &str, rel_path: &str) -> Result<EmbedResult, EmbedError> {
        log::info!("Analysing {rel_path} ...");

        let newline = detect_line_ending(markdown.as_bytes());
        let resolver = DirectiveResolver::new(self.options, &self.languages, self.fs, self.shell);
        let blocks = extract_blocks(markdown).map_err(|source| EmbedError::Scan {
            path: rel_path.to_string(),
            source,
        })?;

        let mut content = String::with_capacity(markdown.len());
        let mut reports = Vec::with_capacity(blocks.len());
        let mut previous_end = 0;

        for block in &blocks {
            content.push_str(&markdown[previous_end..block.start]);
            let label = format!("  {rel_path}#L{}-L{}", block.start_line, block.end_line);

            let state = match resolver.resolve(block, newline) {
                Ok(state) => state,
                Err(err) if !err.is_fatal() && self.options.on_invalid == OnInvalid::Warn => {
                    log::error!("{label} {err}");
                    BlockState::DirectiveInvalid {
                        directive: block_directive(&err),
                    }
                }
                Err(source) => {
                    return Err(EmbedError::Block {
                        path: rel_path.to_string(),
                        start_line: block.start_line,
                        end_line: block.end_line,
                        source,
                    });
                }
            };

            match &state {
                BlockState::Resolved {
                    replacement,
                    line_count,
                } => {
                    if self.options.mode == OutputMode::Verify {
                        log::warn!("{label} Embedded {line_count} lines");
                    } else {
                        log::info!("{label} Embedded {line_count} lines");
                    }
                    content.push_str(replacement);
                }
                other => {
                    self.log_unchanged(&label, other);
                    content.push_str(&block.code);
                }
            }

            reports.push(BlockReport {
                start_line: block.start_line,
                end_line: block.end_line,
                state,
            });
            previous_end = block.end;
        }
        content.push_str(&markdown[previous_end..]);

        Ok(EmbedResult {
            content,
            blocks: reports,
        })
    }

    fn log_unchanged(&self, label: &str, state: &BlockState) {
        match state {
            BlockState::Ignored => log::info!("{label} ignore-next marker found, skipping"),
            BlockState::LanguageUnresolved { language } if language.is_empty() => {
                log::info!("{label} no language detected, skipping")
            }
            BlockState::LanguageUnresolved { language } => log::warn!(
                "{label} unsupported language {language:?}, supported languages are {}; skipping",
                self.languages.supported_languages().join(", ")
            ),
            BlockState::NoDirective => log::info!("{label} no directive in first line, skipping"),
            BlockState::AlreadyUpToDate => log::info!("{label} already up to date"),
            // Reported where the error is handled
            BlockState::DirectiveInvalid { .. } | BlockState::Resolved { .. } => {}
        }
    }
}

fn block_directive(err: &ResolveError) -> String {
    match err {
        ResolveError::InvalidDirective { directive } => directive.clone(),
        other => other.to_string(),
    }
}
