use thiserror::Error;

use crate::frontmatter::FrontmatterError;

/// Source location attached to parse-boundary failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Optional file path.
    pub file: Option<String>,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
}

impl SourceLocation {
    /// Create a location without file information.
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            file: None,
            line,
            column,
        }
    }

    /// Create a location tied to a file.
    pub fn with_file(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: Some(file.into()),
            line,
            column,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// Errors surfaced by the core parsing layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// markdown-rs rejected the document.
    #[error("parse error at {location}: {message}")]
    Parse {
        /// Parser message.
        message: String,
        /// Where the parser stopped.
        location: SourceLocation,
    },
    /// Frontmatter extraction failed.
    #[error(transparent)]
    Frontmatter(#[from] FrontmatterError),
}

impl CoreError {
    /// Create a parse error at the given location.
    pub fn parse(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Parse {
            message: message.into(),
            location: SourceLocation::new(line, column),
        }
    }
}
