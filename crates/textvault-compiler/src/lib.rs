//! Archive build pipeline for textvault
//!
//! This crate turns annotated source text into an archive and its index:
//!
//! 1. A [`Scanner`] resolves source lines into [`BuildEvent`]s
//! 2. A [`BuildSession`] consumes the events, selecting blocks by family
//!    scope, accumulating bodies, and driving the archive writer
//! 3. [`BuildSession::finish`] sorts the index, scans for duplicate names,
//!    and yields the writer, the index, and all collected diagnostics
//!
//! Recoverable problems (bad directives, unmatched markers, too-long
//! blocks, duplicate names) never abort a build: they are logged via
//! `tracing` and collected as [`Diagnostic`]s. Only I/O failures and index
//! capacity exhaustion are fatal.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use textvault_compiler::{BuildConfig, BuildSession, SourceKind};
//! use textvault_crypto::Obfuscator;
//! use textvault_formats::archive::ArchiveWriter;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cipher = Obfuscator::new("EXAMPLEKEY")?;
//! let writer = ArchiveWriter::new(Cursor::new(Vec::new()), cipher)?;
//! let mut session = BuildSession::new(writer, BuildConfig::new("STORY"));
//!
//! session.consume_source(
//!     "story.txt",
//!     "!begin GREETING\nHello there.\n!end\n",
//!     SourceKind::Directive,
//! )?;
//!
//! let mut output = session.finish()?;
//! assert!(output.diagnostics.is_empty());
//! assert_eq!(output.index.lookup("GREETING"), Some(0));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod error;
mod event;
mod scanner;
mod session;

pub use error::{BuildError, BuildResult, Diagnostic, Severity};
pub use event::{BuildEvent, Location, SourceKind};
pub use scanner::Scanner;
pub use session::{BuildConfig, BuildOutput, BuildSession, IgnoredBlocks};
