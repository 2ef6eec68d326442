//! Source-location tracking, sanitized for the external JSON bundle.

use std::sync::Arc;

/// A source location attached to a symbol or constraint for diagnostics.
///
/// Sanitized to `{file, line, column}` (or `null`) when serialized, per the
/// external JSON contract.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SourceLoc {
    file: Arc<str>,
    line: u32,
    column: u32,
}

impl SourceLoc {
    /// Build a new source location.
    #[must_use]
    pub fn new(file: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// The source file path as recorded by the caller.
    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// 1-indexed line number.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// 1-indexed column number.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }
}

impl std::fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
