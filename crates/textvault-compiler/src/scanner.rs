//! Directive scanner: annotated source lines to build events.
//!
//! Two source styles are supported. In directive style every line is
//! significant and directives start with `!`:
//!
//! ```text
//! !beginfile STORY
//! !begin ROOM_11
//! You are in a maze of twisty passages.
//! !end
//! !endfile
//! ```
//!
//! In inline style the directives hide inside the host language's comments:
//! `//!` lines carry directives, block bodies live in `//` comment lines,
//! and everything else belongs to the host and is ignored.

use crate::error::BuildError;
use crate::event::{BuildEvent, SourceKind};

/// Stateful line scanner for one source file.
///
/// The scanner tracks whether a block is open so it can tell body lines
/// from stray text; the session owns all other state.
#[derive(Debug)]
pub struct Scanner {
    kind: SourceKind,
    in_block: bool,
    block_name: String,
}

impl Scanner {
    /// Create a scanner for one source file of the given style.
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            in_block: false,
            block_name: String::new(),
        }
    }

    /// Scan one line.
    ///
    /// Returns the event the line resolves to, `None` for lines with no
    /// event (comments, blanks, host-language lines), or a recoverable
    /// error for lines the grammar rejects; rejected lines produce no
    /// event and scanning continues.
    pub fn scan_line(&mut self, line: &str) -> Result<Option<BuildEvent>, BuildError> {
        match self.kind {
            SourceKind::Directive => self.scan_directive_line(line),
            SourceKind::Inline => self.scan_inline_line(line),
        }
    }

    fn scan_directive_line(&mut self, line: &str) -> Result<Option<BuildEvent>, BuildError> {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix('!') {
            let event = parse_directive(rest)?;
            self.note(&event);
            return Ok(Some(event));
        }
        if self.in_block {
            return Ok(Some(BuildEvent::RawLine(line.to_string())));
        }
        if trimmed.is_empty() || trimmed.starts_with("//") {
            return Ok(None);
        }
        // Stray top-level text; the session decides what it means.
        Ok(Some(BuildEvent::RawLine(line.to_string())))
    }

    fn scan_inline_line(&mut self, line: &str) -> Result<Option<BuildEvent>, BuildError> {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("//!") {
            let event = parse_directive(rest)?;
            self.note(&event);
            return Ok(Some(event));
        }
        if self.in_block {
            if let Some(body) = trimmed.strip_prefix("//") {
                let body = body.strip_prefix(' ').unwrap_or(body);
                return Ok(Some(BuildEvent::RawLine(body.to_string())));
            }
            // The line is dropped; the block stays open.
            return Err(BuildError::BlockInterrupted {
                name: self.block_name.clone(),
            });
        }
        Ok(None)
    }

    fn note(&mut self, event: &BuildEvent) {
        match event {
            BuildEvent::BeginBlock(name) => {
                self.in_block = true;
                self.block_name.clone_from(name);
            }
            BuildEvent::EndBlock => self.in_block = false,
            _ => {}
        }
    }
}

/// Parse the text after the directive marker into an event.
fn parse_directive(text: &str) -> Result<BuildEvent, BuildError> {
    let mut words = text.split_whitespace();
    let word = words.next().unwrap_or("");
    let argument = words.next();
    let surplus = words.next().is_some();

    let event = match word {
        "begin" => match argument {
            Some(name) if !surplus => BuildEvent::BeginBlock(name.to_string()),
            _ => return bad_args(word, argument, surplus, "expects one block name"),
        },
        "beginfile" => match argument {
            Some(family) if !surplus => BuildEvent::BeginScope(family.to_string()),
            _ => return bad_args(word, argument, surplus, "expects one family name"),
        },
        "end" => match argument {
            None => BuildEvent::EndBlock,
            Some(_) => return bad_args(word, argument, surplus, "expects no arguments"),
        },
        "endfile" => match argument {
            None => BuildEvent::EndScope,
            Some(_) => return bad_args(word, argument, surplus, "expects no arguments"),
        },
        other => {
            return Err(BuildError::UnrecognizedDirective {
                word: other.to_string(),
            });
        }
    };
    Ok(event)
}

fn bad_args(
    directive: &str,
    _argument: Option<&str>,
    _surplus: bool,
    detail: &'static str,
) -> Result<BuildEvent, BuildError> {
    Err(BuildError::BadDirectiveArgs {
        directive: directive.to_string(),
        detail,
    })
}
