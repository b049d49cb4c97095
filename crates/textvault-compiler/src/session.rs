//! Build session: the event-consuming state machine.
//!
//! A session owns an [`ArchiveWriter`] and a [`BlockIndex`] and consumes a
//! [`BuildEvent`] stream. Family scopes select which blocks are recorded,
//! block bodies accumulate under a size bound, and every recoverable error
//! becomes a collected [`Diagnostic`] while the build continues. Fatal
//! errors (I/O, index capacity) return `Err` and leave the output
//! unusable.
//!
//! ```text
//!                 begin-scope(match)              begin-scope(other)
//!        Outside ───────────────────► ScopeMatch         │
//!           ▲  ▲                          │              ▼
//!           │  └──────── end-scope ───────┘         ScopeIgnore
//!           └─────────── end-scope ──────────────────────┘
//! ```
//!
//! Blocks open in `Outside` or `ScopeMatch` are recorded; blocks in
//! `ScopeIgnore` are skipped according to the configured
//! [`IgnoredBlocks`] policy.

use std::io::{Seek, Write};

use textvault_formats::archive::constants::{DEFAULT_BLOCKS, MAX_BLOCK_SIZE};
use textvault_formats::archive::{ArchiveWriter, BlockIndex};

use crate::error::{BuildError, BuildResult, Diagnostic, Severity};
use crate::event::{BuildEvent, Location, SourceKind};
use crate::scanner::Scanner;

/// What happens to block bodies inside a non-matching family scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IgnoredBlocks {
    /// Drop the body silently until its end-block. The intended behavior.
    #[default]
    Discard,
    /// Let body lines re-enter the top level, where each non-blank one
    /// produces an `UnexpectedText` diagnostic. Reproduces the warning
    /// cascade of older builds of this format.
    Reparse,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Target family; scopes naming any other family are ignored.
    /// Compared case-insensitively.
    pub family: String,
    /// Policy for block bodies inside ignored scopes.
    pub ignored_blocks: IgnoredBlocks,
    /// Accumulation bound per block, in bytes.
    pub max_block_size: usize,
    /// Index capacity.
    pub index_capacity: usize,
}

impl BuildConfig {
    /// Defaults for a target family.
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            ignored_blocks: IgnoredBlocks::default(),
            max_block_size: MAX_BLOCK_SIZE,
            index_capacity: DEFAULT_BLOCKS,
        }
    }

    /// Set the ignored-scope body policy.
    #[must_use]
    pub fn ignored_blocks(mut self, policy: IgnoredBlocks) -> Self {
        self.ignored_blocks = policy;
        self
    }

    /// Set the per-block accumulation bound.
    #[must_use]
    pub fn max_block_size(mut self, bytes: usize) -> Self {
        self.max_block_size = bytes;
        self
    }

    /// Set the index capacity.
    #[must_use]
    pub fn index_capacity(mut self, entries: usize) -> Self {
        self.index_capacity = entries;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeState {
    Outside,
    ScopeMatch,
    ScopeIgnore,
}

#[derive(Debug)]
struct PendingBlock {
    name: String,
    address: u64,
    text: String,
    overflowed: bool,
}

/// Everything a finished build session yields.
#[derive(Debug)]
pub struct BuildOutput<W> {
    /// The flushed archive writer.
    pub writer: W,
    /// The sorted index, ready for serialization.
    pub index: BlockIndex,
    /// Every recoverable error the build survived.
    pub diagnostics: Vec<Diagnostic>,
}

/// One archive-build session.
pub struct BuildSession<W: Write + Seek> {
    writer: ArchiveWriter<W>,
    index: BlockIndex,
    config: BuildConfig,
    state: ScopeState,
    pending: Option<PendingBlock>,
    skipping: bool,
    diagnostics: Vec<Diagnostic>,
}

impl<W: Write + Seek> BuildSession<W> {
    /// Start a session over an archive writer.
    pub fn new(writer: ArchiveWriter<W>, config: BuildConfig) -> Self {
        let index = BlockIndex::with_capacity(config.index_capacity);
        Self {
            writer,
            index,
            config,
            state: ScopeState::Outside,
            pending: None,
            skipping: false,
            diagnostics: Vec::new(),
        }
    }

    /// Diagnostics collected so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Scan one source file and feed its events through the session.
    pub fn consume_source(
        &mut self,
        file: &str,
        text: &str,
        kind: SourceKind,
    ) -> BuildResult<()> {
        let mut scanner = Scanner::new(kind);
        for (number, line) in text.lines().enumerate() {
            let line_number = u32::try_from(number + 1).unwrap_or(u32::MAX);
            let location = Location::new(file, line_number);
            match scanner.scan_line(line) {
                Ok(Some(event)) => self.handle(event, Some(&location))?,
                Ok(None) => {}
                Err(error) => self.report(error, Some(&location)),
            }
        }
        Ok(())
    }

    /// Consume one build event.
    pub fn handle(&mut self, event: BuildEvent, location: Option<&Location>) -> BuildResult<()> {
        match event {
            BuildEvent::BeginScope(family) => {
                if self.state != ScopeState::Outside {
                    self.report(BuildError::NestedScope { family }, location);
                    return Ok(());
                }
                if family.eq_ignore_ascii_case(&self.config.family) {
                    tracing::debug!(%family, "entering matching scope");
                    self.state = ScopeState::ScopeMatch;
                } else {
                    tracing::debug!(%family, "entering ignored scope");
                    self.state = ScopeState::ScopeIgnore;
                }
                Ok(())
            }
            BuildEvent::EndScope => {
                if self.state == ScopeState::Outside {
                    self.report(BuildError::UnmatchedEndScope, location);
                } else {
                    self.state = ScopeState::Outside;
                }
                Ok(())
            }
            BuildEvent::BeginBlock(name) => self.begin_block(name, location),
            BuildEvent::EndBlock => self.end_block(location),
            BuildEvent::RawLine(text) => self.raw_line(&text, location),
        }
    }

    fn begin_block(&mut self, name: String, location: Option<&Location>) -> BuildResult<()> {
        // A begin while a block is still open closes the open one, same
        // as end-of-input would.
        self.flush_pending()?;
        self.skipping = false;

        if self.state == ScopeState::ScopeIgnore {
            tracing::debug!(%name, "skipping block in ignored scope");
            if self.config.ignored_blocks == IgnoredBlocks::Discard {
                self.skipping = true;
            }
            return Ok(());
        }

        let address = self.writer.position();
        match self.index.add(&name, address) {
            Ok(()) => {
                self.pending = Some(PendingBlock {
                    name,
                    address,
                    text: String::new(),
                    overflowed: false,
                });
                Ok(())
            }
            Err(error) => {
                let error = BuildError::from(error);
                match error.severity() {
                    Severity::Recoverable => {
                        self.report(error, location);
                        // No entry; discard the unusable block's body.
                        self.skipping = true;
                        Ok(())
                    }
                    Severity::Fatal => Err(error),
                }
            }
        }
    }

    fn end_block(&mut self, location: Option<&Location>) -> BuildResult<()> {
        if self.skipping {
            self.skipping = false;
            return Ok(());
        }
        if self.pending.is_some() {
            return self.flush_pending();
        }
        if self.state == ScopeState::ScopeIgnore {
            // Closes a block whose begin was skipped.
            return Ok(());
        }
        self.report(BuildError::UnmatchedEndBlock, location);
        Ok(())
    }

    fn raw_line(&mut self, text: &str, location: Option<&Location>) -> BuildResult<()> {
        if self.skipping {
            return Ok(());
        }

        let limit = self.config.max_block_size;
        if let Some(block) = self.pending.as_mut() {
            if block.overflowed {
                return Ok(());
            }
            let mut line = text.trim_end();
            let continuation = line.ends_with('\\');
            if continuation {
                line = line[..line.len() - 1].trim_end();
            }
            if block.text.len() + line.len() + usize::from(!continuation) > limit {
                block.overflowed = true;
                let name = block.name.clone();
                self.report(BuildError::BlockTooLong { name, limit }, location);
            } else {
                block.text.push_str(line);
                if !continuation {
                    block.text.push('\n');
                }
            }
            return Ok(());
        }

        if text.trim().is_empty() {
            return Ok(());
        }
        self.report(
            BuildError::UnexpectedText {
                text: text.to_string(),
            },
            location,
        );
        Ok(())
    }

    /// Close any open block, sort the index, run the duplicate scan, and
    /// flush the archive.
    pub fn finish(mut self) -> BuildResult<BuildOutput<W>> {
        self.flush_pending()?;
        self.index.sort();

        let duplicate_pairs = self.index.duplicates();
        for (first, second) in duplicate_pairs {
            let name = self.index.name_at(first).unwrap_or("").to_string();
            self.report(BuildError::DuplicateName { name, first, second }, None);
        }

        let writer = self.writer.finish()?;
        Ok(BuildOutput {
            writer,
            index: self.index,
            diagnostics: self.diagnostics,
        })
    }

    fn flush_pending(&mut self) -> BuildResult<()> {
        if let Some(block) = self.pending.take() {
            let address = self.writer.append_block(&block.text)?;
            debug_assert_eq!(address, block.address);
            tracing::info!(
                name = %block.name,
                address,
                bytes = block.text.len(),
                truncated = block.overflowed,
                "block written"
            );
        }
        Ok(())
    }

    fn report(&mut self, error: BuildError, location: Option<&Location>) {
        tracing::warn!(%error, location = ?location, "recoverable build error");
        self.diagnostics.push(Diagnostic::new(error, location.cloned()));
    }
}
