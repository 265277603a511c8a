//! Project configuration for embedme.
//!
//! An optional `.embedme.toml` (or `embedme.toml`) in the working directory
//! provides defaults for the command line:
//!
//! ```toml
//! base = "docs/snippets"
//! glob = true
//! strict = false
//! timeout = 5000
//! ignore-files = [".embedmeignore", ".gitignore"]
//! shell = ["bash", "-c"]
//! ```
//!
//! Values given on the command line or through `EMBEDME_*` variables win.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file names, in lookup order.
pub const CONFIG_FILES: &[&str] = &[".embedme.toml", "embedme.toml"];

/// Ignore files consulted when the config does not name any.
pub const DEFAULT_IGNORE_FILES: &[&str] = &[".embedmeignore", ".gitignore"];

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file at {path}: {source}")]
    IoError { source: io::Error, path: String },

    /// Failed to parse the configuration content
    #[error("Failed to parse config file at {path}: {message}")]
    ParseError { path: String, message: String },
}

/// Settings shared by the config file and the command line.
///
/// Every field is optional so that two layers can be merged with
/// [`ProjectConfig::merged_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct ProjectConfig {
    /// Base directory for file directives, relative to the working directory.
    pub base: Option<PathBuf>,
    /// Treat source arguments as glob patterns.
    pub glob: Option<bool>,
    /// Abort on directives that cannot be parsed.
    pub strict: Option<bool>,
    /// Command timeout in milliseconds, `0` for none.
    pub timeout: Option<u64>,
    pub ignore_files: Option<Vec<String>>,
    /// Shell program and its script flag, e.g. `["bash", "-c"]`.
    pub shell: Option<Vec<String>>,
}

impl ProjectConfig {
    pub fn from_toml_str(content: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// First config file present in `working_dir`.
    pub fn discover(working_dir: &Path) -> Option<PathBuf> {
        CONFIG_FILES
            .iter()
            .map(|name| working_dir.join(name))
            .find(|candidate| {
                let found = candidate.is_file();
                log::debug!(
                    "[embedme-config] {} {}",
                    if found { "Found config file:" } else { "No config at" },
                    candidate.display()
                );
                found
            })
    }

    /// Load `explicit` if given, otherwise a discovered config file, otherwise defaults.
    ///
    /// Returns the config and the file it came from.
    pub fn load(explicit: Option<&Path>, working_dir: &Path) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = match explicit {
            Some(path) if path.is_relative() => Some(working_dir.join(path)),
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(working_dir),
        };
        let Some(path) = path else {
            return Ok((Self::default(), None));
        };

        let display = path.display().to_string();
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::IoError {
            source,
            path: display.clone(),
        })?;
        let config = Self::from_toml_str(&content, &display)?;
        log::debug!("[embedme-config] Loaded {display}: {config:?}");
        Ok((config, Some(path)))
    }

    /// Layer `overrides` on top of `self`; any value set in `overrides` wins.
    pub fn merged_with(self, overrides: ProjectConfig) -> ProjectConfig {
        ProjectConfig {
            base: overrides.base.or(self.base),
            glob: overrides.glob.or(self.glob),
            strict: overrides.strict.or(self.strict),
            timeout: overrides.timeout.or(self.timeout),
            ignore_files: overrides.ignore_files.or(self.ignore_files),
            shell: overrides.shell.or(self.shell),
        }
    }

    pub fn ignore_files(&self) -> Vec<String> {
        match &self.ignore_files {
            Some(files) => files.clone(),
            None => DEFAULT_IGNORE_FILES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
