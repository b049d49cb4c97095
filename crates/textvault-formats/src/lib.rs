//! File formats for textvault archives
//!
//! This crate provides symmetric (writer and reader) implementations for the
//! on-disk artifacts of a textvault build:
//!
//! - **Archive** (`.tva`): a NUL-terminated key text followed by obfuscated,
//!   NUL-terminated text blocks
//! - **Text index** (`MAP` format): human-readable token/name/address table
//! - **Binary index** (compact format): `~` marker, record count, and
//!   addresses only — smaller, but supports token lookup only
//! - **Symbol table**: a generated C header mapping `T_<NAME>` macros to
//!   token numbers or name strings
//!
//! # Design Principles
//!
//! - **Symmetric Operations**: every format can be built and parsed
//! - **One Index Type**: the build-time name-bearing table and the run-time
//!   address-only table are the same [`archive::BlockIndex`], distinguished
//!   by whether entries carry names
//! - **Token Identity**: a block's external identity is its position after
//!   the final name sort; all three emitted artifacts agree on it
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use textvault_crypto::Obfuscator;
//! use textvault_formats::archive::{ArchiveWriter, BlockIndex};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cipher = Obfuscator::new("EXAMPLEKEY")?;
//! let mut writer = ArchiveWriter::new(Cursor::new(Vec::new()), cipher)?;
//! let mut index = BlockIndex::with_capacity(16);
//!
//! let address = writer.append_block("Hello, world!\n")?;
//! index.add("GREETING", address)?;
//!
//! index.sort();
//! let archive = writer.finish()?.into_inner();
//! assert!(archive.starts_with(b"EXAMPLEKEY\0"));
//! assert_eq!(index.lookup("greeting"), Some(0));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod archive;
