//! Archive reader: random-access block retrieval by token or name.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use textvault_crypto::{MAX_KEY_LENGTH, Obfuscator};

use crate::archive::constants::MAX_BLOCK_SIZE;
use crate::archive::error::{ArchiveError, ArchiveResult};
use crate::archive::index::BlockIndex;

/// Random-access reader over an archive and its companion index.
///
/// Opening recovers the cipher from the archive's key header. Retrieval
/// seeks to a block's address, reads up to the block-size bound or the NUL
/// terminator, and de-obfuscates. Name retrieval requires a name-bearing
/// index; an index loaded from the binary form supports tokens only.
#[derive(Debug)]
pub struct ArchiveReader<R: BufRead + Seek> {
    reader: R,
    cipher: Obfuscator,
    index: BlockIndex,
}

impl ArchiveReader<BufReader<File>> {
    /// Open an archive file and its index file.
    ///
    /// The index format is auto-detected from its first byte.
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(
        archive: P,
        index: Q,
    ) -> ArchiveResult<Self> {
        let index = BlockIndex::load(index)?;
        Self::from_parts(BufReader::new(File::open(archive)?), index)
    }
}

impl<R: BufRead + Seek> ArchiveReader<R> {
    /// Wrap an archive stream positioned at its start, with a loaded index.
    pub fn from_parts(mut reader: R, index: BlockIndex) -> ArchiveResult<Self> {
        let mut key_text = Vec::new();
        (&mut reader)
            .take(MAX_KEY_LENGTH as u64 + 1)
            .read_until(0, &mut key_text)?;
        if key_text.pop() != Some(0) {
            return Err(ArchiveError::InvalidFormat(
                "archive key header is missing its terminator".to_string(),
            ));
        }
        let key_text = String::from_utf8(key_text).map_err(|_| {
            ArchiveError::InvalidFormat("archive key header is not valid text".to_string())
        })?;
        let cipher = Obfuscator::new(&key_text)?;

        Ok(Self {
            reader,
            cipher,
            index,
        })
    }

    /// Number of blocks the index describes.
    pub fn count(&self) -> usize {
        self.index.len()
    }

    /// Name recorded for a token, when the index carries names.
    pub fn name_of(&self, token: usize) -> Option<&str> {
        self.index.name_at(token)
    }

    /// Retrieve a block by token.
    pub fn get(&mut self, token: usize) -> ArchiveResult<String> {
        self.get_with_limit(token, MAX_BLOCK_SIZE)
    }

    /// Retrieve a block by token, truncating at `max_len` bytes.
    ///
    /// Reading stops at the block's NUL terminator or at the length bound,
    /// whichever comes first. A block that hits the bound is returned
    /// truncated, never failed.
    pub fn get_with_limit(&mut self, token: usize, max_len: usize) -> ArchiveResult<String> {
        let address = self.index.address_at(token)?;
        self.reader.seek(SeekFrom::Start(address))?;

        let mut body = Vec::new();
        (&mut self.reader)
            .take(max_len as u64 + 1)
            .read_until(0, &mut body)?;
        if body.last() == Some(&0) {
            body.pop();
        } else {
            body.truncate(max_len);
        }

        self.cipher.reset();
        self.cipher.apply_in_place(&mut body);

        String::from_utf8(body).map_err(|_| ArchiveError::InvalidBlockText { address })
    }

    /// Retrieve a block by name.
    ///
    /// Fails with [`ArchiveError::NameLookupUnsupported`] when the index was
    /// loaded from the binary (address-only) form.
    pub fn get_named(&mut self, name: &str) -> ArchiveResult<String> {
        if !self.index.has_names() {
            return Err(ArchiveError::NameLookupUnsupported);
        }
        let token = self
            .index
            .lookup(name)
            .ok_or_else(|| ArchiveError::BlockNotFound(name.to_string()))?;
        self.get(token)
    }
}
