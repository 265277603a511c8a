//! Options for a single embedding pass.

use super::error::EmbedError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happens to the embedded result of a document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Rewrite the document in place when it changed.
    #[default]
    Write,
    /// Compute the result but never write it.
    DryRun,
    /// Fail when the result differs from the document.
    Verify,
    /// Print the result to stdout.
    Stdout,
    /// Write the result to another file.
    File(PathBuf),
}

/// Handling of directives that match no known form.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OnInvalid {
    /// Report the directive and leave the block unchanged
    #[default]
    Warn,
    /// Abort the document
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedOptions {
    /// Omit the directive comment from resolved blocks. Only legal with [`OutputMode::Stdout`].
    pub strip_embed_comment: bool,
    pub mode: OutputMode,
    /// Directory commands run in; also the last base for file lookups.
    pub working_dir: PathBuf,
    /// Explicit base for file directives, searched before `working_dir`.
    pub base: Option<PathBuf>,
    pub on_invalid: OnInvalid,
}

impl EmbedOptions {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            strip_embed_comment: false,
            mode: OutputMode::default(),
            working_dir: working_dir.into(),
            base: None,
            on_invalid: OnInvalid::default(),
        }
    }

    /// Ordered directories a file directive's path is resolved against.
    pub fn base_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::with_capacity(2);
        if let Some(base) = &self.base {
            dirs.push(if base.is_absolute() {
                base.clone()
            } else {
                self.working_dir.join(base)
            });
        }
        if !dirs.contains(&self.working_dir) {
            dirs.push(self.working_dir.clone());
        }
        dirs
    }

    /// Stripping the directive comment makes the next run unable to find the
    /// directive, so it is only allowed when the source is not rewritten.
    pub fn validate(&self) -> Result<(), EmbedError> {
        if self.strip_embed_comment && self.mode != OutputMode::Stdout {
            return Err(EmbedError::InvalidOptions(
                "--strip-embed-comment requires --stdout; redirect the result to your destination \
                 file, otherwise the source would be overwritten and its directives lost"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = EmbedOptions::new("/work");
        assert!(!options.strip_embed_comment);
        assert_eq!(options.mode, OutputMode::Write);
        assert_eq!(options.on_invalid, OnInvalid::Warn);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_base_dirs_order() {
        let mut options = EmbedOptions::new("/work");
        assert_eq!(options.base_dirs(), vec![PathBuf::from("/work")]);

        options.base = Some(PathBuf::from("docs/src"));
        assert_eq!(
            options.base_dirs(),
            vec![PathBuf::from("/work/docs/src"), PathBuf::from("/work")]
        );

        options.base = Some(PathBuf::from("/work"));
        assert_eq!(options.base_dirs(), vec![PathBuf::from("/work")]);
    }

    #[test]
    fn test_strip_requires_stdout() {
        let mut options = EmbedOptions::new("/work");
        options.strip_embed_comment = true;
        assert!(matches!(options.validate(), Err(EmbedError::InvalidOptions(_))));

        options.mode = OutputMode::DryRun;
        assert!(options.validate().is_err());

        options.mode = OutputMode::Stdout;
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_on_invalid_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            on_invalid: OnInvalid,
        }
        let parsed: Wrapper = toml::from_str("on_invalid = \"fail\"").unwrap();
        assert_eq!(parsed.on_invalid, OnInvalid::Fail);
    }
}
