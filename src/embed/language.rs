//! Comment syntax lookup for fenced code block languages.
//!
//! Maps a block's language tag (e.g. "py", "rust") to the [`CommentFamily`]
//! used to find a directive in the block's first line and to write the
//! directive header back.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// The comment syntax of a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentFamily {
    /// No comment syntax (e.g. JSON); only inline markers can carry a directive.
    None,
    /// `// comment`
    DoubleSlash,
    /// `<!-- comment -->`
    Xml,
    /// `# comment`
    Hash,
    /// `' comment`
    SingleQuote,
    /// `%% comment`
    DoublePercent,
    /// `-- comment`
    DoubleHyphen,
}

static DOUBLE_SLASH_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*//([^\r\n]*)\r?\n").unwrap());
static HASH_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*#([^\r\n]*)\r?\n").unwrap());
static SINGLE_QUOTE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*'([^\r\n]*)\r?\n").unwrap());
static DOUBLE_PERCENT_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*%%([^\r\n]*)\r?\n").unwrap());
static DOUBLE_HYPHEN_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*--([^\r\n]*)\r?\n").unwrap());
static XML_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<!--\s*?(\S*?)\s*?-->").unwrap());

impl CommentFamily {
    /// Extract the inner text of the comment that opens `code`, if any.
    ///
    /// Prefix-style families anchor on the first non-whitespace line. The XML
    /// family accepts a comment anywhere in the first non-blank line.
    /// [`CommentFamily::None`] always yields `None`.
    pub fn first_comment(self, code: &str) -> Option<String> {
        let re = match self {
            CommentFamily::None => return None,
            CommentFamily::Xml => {
                let first_line = code.lines().find(|line| !line.trim().is_empty())?;
                return XML_COMMENT
                    .captures(first_line)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string());
            }
            CommentFamily::DoubleSlash => &*DOUBLE_SLASH_COMMENT,
            CommentFamily::Hash => &*HASH_COMMENT,
            CommentFamily::SingleQuote => &*SINGLE_QUOTE_COMMENT,
            CommentFamily::DoublePercent => &*DOUBLE_PERCENT_COMMENT,
            CommentFamily::DoubleHyphen => &*DOUBLE_HYPHEN_COMMENT,
        };
        re.captures(code)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Render `directive` as a comment of this family.
    ///
    /// Returns `None` for [`CommentFamily::None`], which has no way to write one.
    pub fn render(self, directive: &str) -> Option<String> {
        let directive = directive.trim();
        match self {
            CommentFamily::None => None,
            CommentFamily::DoubleSlash => Some(format!("// {directive}")),
            CommentFamily::Xml => Some(format!("<!-- {directive} -->")),
            CommentFamily::Hash => Some(format!("# {directive}")),
            CommentFamily::SingleQuote => Some(format!("' {directive}")),
            CommentFamily::DoublePercent => Some(format!("%% {directive}")),
            CommentFamily::DoubleHyphen => Some(format!("-- {directive}")),
        }
    }
}

/// Immutable language tag -> comment family table.
pub struct LanguageTable {
    families: &'static HashMap<&'static str, CommentFamily>,
}

impl LanguageTable {
    pub fn new() -> Self {
        Self {
            families: &LANGUAGE_COMMENTS,
        }
    }

    /// Look up the comment family of a language tag (case-insensitive).
    pub fn comment_family(&self, language: &str) -> Option<CommentFamily> {
        let lower = language.trim().to_lowercase();
        self.families.get(lower.as_str()).copied()
    }

    /// All supported tags, sorted, for diagnostics.
    pub fn supported_languages(&self) -> Vec<&'static str> {
        let mut languages: Vec<&'static str> = self.families.keys().copied().collect();
        languages.sort_unstable();
        languages
    }
}

impl Default for LanguageTable {
    fn default() -> Self {
        Self::new()
    }
}

static LANGUAGE_COMMENTS: LazyLock<HashMap<&'static str, CommentFamily>> = LazyLock::new(|| {
    let groups: &[(CommentFamily, &[&str])] = &[
        (CommentFamily::None, &["json"]),
        (
            CommentFamily::DoubleSlash,
            &[
                // Plain text
                "txt", "embedme",
                // C family
                "c", "cpp", "cs", "java", "objectivec", "objc", "arduino", "ino",
                // Web
                "ts", "tsx", "js", "jsx", "re", "scss", "php", "json5",
                // Systems and JVM
                "rust", "go", "golang", "swift", "kotlin", "scala",
                // Schemas
                "proto",
            ],
        ),
        (CommentFamily::Xml, &["html", "md", "xml"]),
        (
            CommentFamily::Hash,
            &["py", "python", "bash", "sh", "shell", "yaml", "toml", "rb", "cr", "cmake"],
        ),
        (CommentFamily::SingleQuote, &["puml"]),
        (CommentFamily::DoublePercent, &["mermaid"]),
        (CommentFamily::DoubleHyphen, &["sql", "hs"]),
    ];

    let mut m = HashMap::new();
    for (family, languages) in groups {
        for language in *languages {
            m.insert(*language, *family);
        }
    }
    m
});
