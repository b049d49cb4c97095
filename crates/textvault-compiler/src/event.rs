//! Build events and source locations.

use std::fmt;

/// Source position attached to events and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Source file name as given to the session.
    pub file: String,
    /// One-based line number.
    pub line: u32,
}

impl Location {
    /// Create a location.
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One resolved event in the build stream.
///
/// The session consumes these in order; the directive scanner produces them
/// from annotated source text, but any collaborator may drive the session
/// directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    /// Enter a family-scoped region.
    BeginScope(String),
    /// Leave the current family-scoped region.
    EndScope,
    /// Open a named block; subsequent raw lines form its body.
    BeginBlock(String),
    /// Close the open block.
    EndBlock,
    /// One line of text, verbatim.
    RawLine(String),
}

/// How a source file encodes its directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Every line is significant; directives start with `!`.
    Directive,
    /// Directives hide in `//!` comments; block bodies in `//` comments.
    /// Other lines belong to the host language and are ignored.
    Inline,
}
