//! Error types for the build pipeline.
//!
//! Severity is data, not control flow: every [`BuildError`] carries a
//! [`Severity`] tag. Recoverable errors become [`Diagnostic`]s collected on
//! the session while the build continues; fatal errors are returned as
//! `Err` and abort the build.

use std::fmt;

use thiserror::Error;

use textvault_formats::archive::ArchiveError;

use crate::event::Location;

/// Build operation result type
pub type BuildResult<T> = Result<T, BuildError>;

/// Whether an error aborts the build or is reported and survived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Reported with context; processing continues.
    Recoverable,
    /// Returned as `Err`; the build aborts with no partial-output
    /// guarantee.
    Fatal,
}

/// Error types for scanning and building
#[derive(Debug, Error)]
pub enum BuildError {
    /// `begin-scope` while already inside a scope
    #[error("nested scope: begin of family {family:?} inside an open scope")]
    NestedScope {
        /// Family named by the inner begin-scope
        family: String,
    },

    /// `end-scope` with no open scope
    #[error("unmatched end-scope")]
    UnmatchedEndScope,

    /// `end-block` with no open block
    #[error("unmatched end-block")]
    UnmatchedEndBlock,

    /// Block body exceeded the accumulation bound
    #[error("block {name:?} too long: exceeds {limit} bytes, remaining lines discarded")]
    BlockTooLong {
        /// Name of the overflowing block
        name: String,
        /// The accumulation bound in bytes
        limit: usize,
    },

    /// Two entries share a case-folded name
    #[error("duplicate block name {name:?} (tokens {first} and {second})")]
    DuplicateName {
        /// The shared name
        name: String,
        /// Lower duplicate token
        first: usize,
        /// Higher duplicate token
        second: usize,
    },

    /// Directive word not in the grammar
    #[error("unrecognized directive: {word:?}")]
    UnrecognizedDirective {
        /// The unknown word
        word: String,
    },

    /// Directive with missing or surplus arguments
    #[error("bad arguments for directive {directive:?}: {detail}")]
    BadDirectiveArgs {
        /// The directive word
        directive: String,
        /// What was wrong
        detail: &'static str,
    },

    /// Inline block body broken by a non-comment line
    #[error("block {name:?} interrupted by a non-comment line")]
    BlockInterrupted {
        /// Name of the open block
        name: String,
    },

    /// Text outside any block where none is expected
    #[error("unexpected text outside a block: {text:?}")]
    UnexpectedText {
        /// The offending line
        text: String,
    },

    /// Archive or index failure
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// The error's severity tag.
    pub fn severity(&self) -> Severity {
        match self {
            Self::NestedScope { .. }
            | Self::UnmatchedEndScope
            | Self::UnmatchedEndBlock
            | Self::BlockTooLong { .. }
            | Self::DuplicateName { .. }
            | Self::UnrecognizedDirective { .. }
            | Self::BadDirectiveArgs { .. }
            | Self::BlockInterrupted { .. }
            | Self::UnexpectedText { .. } => Severity::Recoverable,
            // A rejected name is bad input; everything else from the
            // formats layer (capacity, I/O, corruption) aborts the build.
            Self::Archive(ArchiveError::InvalidName { .. }) => Severity::Recoverable,
            Self::Archive(_) | Self::Io(_) => Severity::Fatal,
        }
    }
}

/// A recoverable error bound to where it happened.
#[derive(Debug)]
pub struct Diagnostic {
    /// What went wrong.
    pub error: BuildError,
    /// Where, when a source position is known.
    pub location: Option<Location>,
}

impl Diagnostic {
    /// Bind an error to an optional location.
    pub fn new(error: BuildError, location: Option<Location>) -> Self {
        Self { error, location }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{location}: {}", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}
