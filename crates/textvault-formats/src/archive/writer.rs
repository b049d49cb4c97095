//! Archive writer: key header plus obfuscated, NUL-terminated blocks.

use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use textvault_crypto::Obfuscator;

use crate::archive::error::ArchiveResult;

/// Sequential writer for the archive byte stream.
///
/// Construction emits the header: the cipher's raw key text followed by a
/// NUL byte. Each appended block is obfuscated with the cipher reset to its
/// start position and terminated with a literal NUL, which the cipher
/// passes through unchanged. The writer reports each block's starting byte
/// address so the caller can record it in a [`crate::archive::BlockIndex`].
#[derive(Debug)]
pub struct ArchiveWriter<W: Write + Seek> {
    writer: W,
    cipher: Obfuscator,
    position: u64,
}

impl ArchiveWriter<File> {
    /// Create an archive file at `path` and write the key header.
    pub fn create<P: AsRef<Path>>(path: P, cipher: Obfuscator) -> ArchiveResult<Self> {
        Self::new(File::create(path)?, cipher)
    }
}

impl<W: Write + Seek> ArchiveWriter<W> {
    /// Wrap a writer and emit the key header.
    ///
    /// The key text is stored in the clear; readers recover the cipher from
    /// it. An empty key text writes a lone NUL and yields an archive whose
    /// blocks are stored verbatim.
    pub fn new(mut writer: W, cipher: Obfuscator) -> ArchiveResult<Self> {
        let key_text = cipher.key_text();
        writer.write_all(key_text.as_bytes())?;
        writer.write_all(&[0])?;
        let position = key_text.len() as u64 + 1;
        Ok(Self {
            writer,
            cipher,
            position,
        })
    }

    /// Append one block and return its starting byte address.
    ///
    /// The cipher position is reset before the block, so every block is
    /// obfuscated independently of its predecessors and can be recovered
    /// from its address alone.
    pub fn append_block(&mut self, text: &str) -> ArchiveResult<u64> {
        let address = self.position;

        self.cipher.reset();
        let mut bytes = text.as_bytes().to_vec();
        self.cipher.apply_in_place(&mut bytes);
        bytes.push(0);

        self.writer.write_all(&bytes)?;
        self.position += bytes.len() as u64;
        Ok(address)
    }

    /// Byte address where the next block would start.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> ArchiveResult<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_is_key_text_and_nul() {
        let cipher = Obfuscator::new("SECRET").expect("valid key");
        let writer =
            ArchiveWriter::new(Cursor::new(Vec::new()), cipher).expect("header write");
        let bytes = writer.finish().expect("finish").into_inner();
        assert_eq!(bytes, b"SECRET\0");
    }

    #[test]
    fn test_empty_key_stores_blocks_verbatim() {
        let cipher = Obfuscator::new("").expect("empty key is valid");
        let mut writer =
            ArchiveWriter::new(Cursor::new(Vec::new()), cipher).expect("header write");
        let addr = writer.append_block("plain\n").expect("append");
        assert_eq!(addr, 1);
        let bytes = writer.finish().expect("finish").into_inner();
        assert_eq!(bytes, b"\0plain\n\0");
    }

    #[test]
    fn test_blocks_are_obfuscated_and_nul_terminated() {
        let cipher = Obfuscator::new("KEY").expect("valid key");
        let mut writer =
            ArchiveWriter::new(Cursor::new(Vec::new()), cipher).expect("header write");
        writer.append_block("attack at dawn").expect("append");
        let bytes = writer.finish().expect("finish").into_inner();

        let body = &bytes[4..]; // past "KEY\0"
        assert_eq!(*body.last().expect("terminator"), 0);
        assert_ne!(&body[..body.len() - 1], b"attack at dawn");
        // No interior NUL: the terminator is unambiguous.
        assert_eq!(body.iter().filter(|&&b| b == 0).count(), 1);
    }

    #[test]
    fn test_addresses_are_sequential_and_reported_before_body() {
        let cipher = Obfuscator::new("KEY").expect("valid key");
        let mut writer =
            ArchiveWriter::new(Cursor::new(Vec::new()), cipher).expect("header write");

        assert_eq!(writer.position(), 4);
        let first = writer.append_block("one").expect("append");
        let second = writer.append_block("two!").expect("append");
        assert_eq!(first, 4);
        assert_eq!(second, 4 + 3 + 1);
        assert_eq!(writer.position(), second + 4 + 1);
    }

    #[test]
    fn test_cipher_resets_per_block() {
        let cipher = Obfuscator::new("KEY").expect("valid key");
        let mut writer =
            ArchiveWriter::new(Cursor::new(Vec::new()), cipher).expect("header write");
        let first = writer.append_block("same text").expect("append");
        let second = writer.append_block("same text").expect("append");
        let bytes = writer.finish().expect("finish").into_inner();

        let (a, b) = (first as usize, second as usize);
        assert_eq!(bytes[a..a + 9], bytes[b..b + 9]);
    }
}
