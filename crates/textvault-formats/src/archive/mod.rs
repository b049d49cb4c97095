//! Archive storage and retrieval for named text blocks
//!
//! An archive is an ordered byte stream: the raw key text terminated by a
//! NUL byte, then one obfuscated block per recorded entry, each terminated
//! by a literal NUL. The obfuscation cipher passes bytes below `0x10`
//! through unchanged, so terminators remain detectable without length
//! prefixes.
//!
//! ```text
//! [key text][00][block 0 ..][00][block 1 ..][00]...
//! ```
//!
//! The companion index maps tokens (sorted positions) and, in the
//! name-bearing format, block names to byte addresses inside the archive:
//!
//! ```text
//! Lookup flow:
//! name → BlockIndex → token → address → seek → de-obfuscate until NUL
//! ```
//!
//! # Usage
//!
//! ## Build an archive and both index formats
//!
//! ```rust,no_run
//! use std::fs::File;
//! use textvault_crypto::Obfuscator;
//! use textvault_formats::archive::{ArchiveWriter, BlockIndex};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cipher = Obfuscator::with_random_key(20);
//! let mut writer = ArchiveWriter::new(File::create("story.tva")?, cipher)?;
//! let mut index = BlockIndex::with_capacity(4096);
//!
//! let addr = writer.append_block("You are in a maze of twisty passages.\n")?;
//! index.add("ROOM_11", addr)?;
//!
//! writer.finish()?;
//! index.sort();
//! index.write_text(&mut File::create("story.map")?)?;
//! index.write_binary(&mut File::create("story.mpx")?)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Read blocks back
//!
//! ```rust,no_run
//! use textvault_formats::archive::ArchiveReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut reader = ArchiveReader::open("story.tva", "story.map")?;
//! let text = reader.get_named("ROOM_11")?;
//! assert_eq!(reader.get(0)?, text);
//! # Ok(())
//! # }
//! ```

mod error;
mod index;
mod reader;
mod symbols;
mod writer;

pub use error::{ArchiveError, ArchiveResult};
pub use index::{BlockIndex, BlockName, IndexEntry};
pub use reader::ArchiveReader;
pub use symbols::{SymbolMode, write_symbol_table, write_symbol_table_single};
pub use writer::ArchiveWriter;

/// Archive format constants
pub mod constants {
    /// Maximum number of blocks an index may describe.
    pub const MAX_BLOCKS: usize = 16384;

    /// Default index capacity when a build does not specify one.
    pub const DEFAULT_BLOCKS: usize = 4096;

    /// Maximum length of one block's accumulated text in bytes. Also the
    /// read-side buffer bound.
    pub const MAX_BLOCK_SIZE: usize = 8192;

    /// Maximum length of a block name in characters.
    pub const MAX_NAME_LEN: usize = 16;

    /// First byte of a binary (compact) index file.
    pub const BINARY_INDEX_MARKER: u8 = b'~';

    /// Header line of a text index file.
    pub const TEXT_INDEX_HEADER: &str = "MAP";

    /// Column width for names in the text index and symbol table.
    pub const NAME_COLUMN_WIDTH: usize = 18;
}
