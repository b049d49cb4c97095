//! Block index: token/name/address table with two serialized forms.
//!
//! The index is built in insertion order while the archive is written, then
//! sorted exactly once by case-folded name before anything is emitted. A
//! block's *token* — its external identity in every artifact — is its
//! position after that sort, never its insertion position. Sorting permutes
//! an indirection vector of entry indices; the entries themselves never
//! move.
//!
//! Two interchangeable on-disk forms exist:
//!
//! - the text (`MAP`) form keeps names and supports name lookup after load
//! - the binary (`~`) form keeps addresses only and is token-lookup-only
//!
//! Both list addresses in final sorted-token order, so readers of either
//! form agree on `address_at(token)` for every token.

use std::io::{BufRead, Read, Seek, Write};
use std::path::Path;

use binrw::{BinReaderExt, BinWriterExt};

use crate::archive::constants::{
    BINARY_INDEX_MARKER, MAX_BLOCKS, MAX_NAME_LEN, NAME_COLUMN_WIDTH, TEXT_INDEX_HEADER,
};
use crate::archive::error::{ArchiveError, ArchiveResult};

/// Bounded, case-folded block name.
///
/// Names are 1 to 16 characters, ASCII identifiers (letters, digits,
/// underscore), and are stored upper-cased so that all comparisons are
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlockName(String);

impl BlockName {
    /// Validate and case-fold a raw name.
    pub fn new(raw: &str) -> ArchiveResult<Self> {
        if raw.is_empty() {
            return Err(ArchiveError::InvalidName {
                name: raw.to_string(),
                reason: "empty",
            });
        }
        if raw.len() > MAX_NAME_LEN {
            return Err(ArchiveError::InvalidName {
                name: raw.to_string(),
                reason: "longer than 16 characters",
            });
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return Err(ArchiveError::InvalidName {
                name: raw.to_string(),
                reason: "not an ASCII identifier",
            });
        }
        Ok(Self(raw.to_ascii_uppercase()))
    }

    /// The folded name text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlockName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One index record: an archive byte address and, in the name-bearing
/// form, the block's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Byte offset of the block within the archive.
    pub address: u64,
    /// Block name; `None` for entries loaded from the binary form.
    pub name: Option<BlockName>,
}

impl IndexEntry {
    fn name_key(&self) -> &str {
        self.name.as_ref().map_or("", BlockName::as_str)
    }
}

/// Token/name/address table for one archive.
///
/// One type serves both roles the formats need: the build-time table (all
/// entries named, populated by `add`) and the run-time address-only table
/// (loaded from the binary form, `name: None` throughout). Serialization
/// and lookup branch on whether names are present.
#[derive(Debug, Clone)]
pub struct BlockIndex {
    /// Entries in insertion order. Never reordered.
    entries: Vec<IndexEntry>,
    /// Indirection: `order[token]` is the entry index for that token.
    order: Vec<usize>,
    /// Fixed at construction; `add` fails once reached.
    capacity: usize,
    /// Whether `order` currently reflects the name sort.
    sorted: bool,
}

impl BlockIndex {
    /// Create an empty index with a fixed capacity.
    ///
    /// Capacity is clamped to [`MAX_BLOCKS`].
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(MAX_BLOCKS);
        Self {
            entries: Vec::new(),
            order: Vec::new(),
            capacity,
            sorted: true,
        }
    }

    /// Append a named entry in build order.
    ///
    /// The name is validated and case-folded here. Adding marks the index
    /// unsorted; a re-sort happens automatically before lookup or
    /// serialization.
    pub fn add(&mut self, name: &str, address: u64) -> ArchiveResult<()> {
        let name = BlockName::new(name)?;
        self.push(IndexEntry {
            address,
            name: Some(name),
        })
    }

    /// Append an address-only entry (binary-form load path).
    pub fn add_address(&mut self, address: u64) -> ArchiveResult<()> {
        self.push(IndexEntry {
            address,
            name: None,
        })
    }

    fn push(&mut self, entry: IndexEntry) -> ArchiveResult<()> {
        if self.entries.len() >= self.capacity {
            return Err(ArchiveError::IndexFull(self.capacity));
        }
        self.order.push(self.entries.len());
        self.entries.push(entry);
        self.sorted = false;
        Ok(())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether every entry carries a name (name lookup possible).
    pub fn has_names(&self) -> bool {
        self.entries.iter().all(|e| e.name.is_some())
    }

    /// Whether the indirection vector currently reflects the name sort.
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Stable-sort the indirection vector by case-folded name.
    ///
    /// Idempotent; entries never move. Insertion order breaks ties, which
    /// keeps duplicate names in discovery order.
    pub fn sort(&mut self) {
        let entries = &self.entries;
        self.order.sort_by(|&a, &b| {
            entries[a]
                .name_key()
                .cmp(entries[b].name_key())
                .then(a.cmp(&b))
        });
        self.sorted = true;
    }

    fn ensure_sorted(&mut self) {
        if !self.sorted {
            self.sort();
        }
    }

    /// Resolve a name to its token by binary search.
    ///
    /// Case-insensitive. Sorts first if the index is dirty. Returns `None`
    /// for names absent from the table, including probes lexicographically
    /// before the first or after the last entry, and on empty tables. With
    /// duplicate names the lowest matching token is returned.
    pub fn lookup(&mut self, name: &str) -> Option<usize> {
        self.ensure_sorted();
        let probe = name.to_ascii_uppercase();
        let entries = &self.entries;
        let mut token = self
            .order
            .binary_search_by(|&i| entries[i].name_key().cmp(probe.as_str()))
            .ok()?;
        while token > 0 && entries[self.order[token - 1]].name_key() == probe {
            token -= 1;
        }
        Some(token)
    }

    /// Archive address for a token.
    pub fn address_at(&self, token: usize) -> ArchiveResult<u64> {
        self.entry_at(token).map(|e| e.address)
    }

    /// Name for a token, if the index carries names.
    pub fn name_at(&self, token: usize) -> Option<&str> {
        self.entry_at(token)
            .ok()
            .and_then(|e| e.name.as_ref())
            .map(BlockName::as_str)
    }

    fn entry_at(&self, token: usize) -> ArchiveResult<&IndexEntry> {
        self.order
            .get(token)
            .map(|&i| &self.entries[i])
            .ok_or(ArchiveError::TokenOutOfRange {
                token,
                count: self.entries.len(),
            })
    }

    /// Adjacent token pairs whose case-folded names are equal.
    ///
    /// Duplicate names are a warning condition, never an error: both blocks
    /// stay retrievable by token, only name lookup becomes ambiguous.
    pub fn duplicates(&mut self) -> Vec<(usize, usize)> {
        self.ensure_sorted();
        let entries = &self.entries;
        self.order
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| {
                let a = entries[pair[0]].name_key();
                a == entries[pair[1]].name_key() && !a.is_empty()
            })
            .map(|(i, _)| (i, i + 1))
            .collect()
    }

    fn check_count(count: usize) -> ArchiveResult<()> {
        if count < 1 || count > MAX_BLOCKS {
            return Err(ArchiveError::InvalidBlockCount(count));
        }
        Ok(())
    }

    /// Write the text (`MAP`) form.
    ///
    /// Line 1 is the literal header, line 2 the record count, then one line
    /// per token: right-justified token, left-justified name in an 18-wide
    /// column, decimal address. Requires names; sorts first if dirty.
    pub fn write_text<W: Write>(&mut self, writer: &mut W) -> ArchiveResult<()> {
        self.ensure_sorted();
        let n = self.entries.len();
        Self::check_count(n)?;

        let token_width = n.to_string().len();
        writeln!(writer, "{TEXT_INDEX_HEADER}")?;
        writeln!(writer, "{n}")?;
        for token in 0..n {
            let entry = &self.entries[self.order[token]];
            let name = entry.name.as_ref().ok_or_else(|| {
                ArchiveError::InvalidFormat("text index requires named entries".to_string())
            })?;
            writeln!(
                writer,
                "{token:>token_width$} {name:<NAME_COLUMN_WIDTH$} {address}",
                name = name.as_str(),
                address = entry.address,
            )?;
        }
        Ok(())
    }

    /// Parse the text (`MAP`) form.
    pub fn read_text<R: BufRead>(reader: R) -> ArchiveResult<Self> {
        let mut lines = reader.lines();
        let header = lines
            .next()
            .transpose()?
            .ok_or_else(|| ArchiveError::InvalidFormat("empty text index".to_string()))?;
        if header.trim() != TEXT_INDEX_HEADER {
            return Err(ArchiveError::InvalidFormat(format!(
                "bad text index header: {header:?}"
            )));
        }

        let count_line = lines
            .next()
            .transpose()?
            .ok_or_else(|| ArchiveError::InvalidFormat("missing record count".to_string()))?;
        let count: usize = count_line.trim().parse().map_err(|_| {
            ArchiveError::InvalidFormat(format!("bad record count: {count_line:?}"))
        })?;
        Self::check_count(count)?;

        let mut index = Self::with_capacity(count);
        for record in 0..count {
            let line = lines.next().transpose()?.ok_or_else(|| {
                ArchiveError::InvalidFormat(format!("truncated text index at record {record}"))
            })?;
            let mut fields = line.split_whitespace();
            let (Some(_token), Some(name), Some(address)) =
                (fields.next(), fields.next(), fields.next())
            else {
                return Err(ArchiveError::InvalidFormat(format!(
                    "malformed index record: {line:?}"
                )));
            };
            let address: u64 = address.parse().map_err(|_| {
                ArchiveError::InvalidFormat(format!("bad address in record: {line:?}"))
            })?;
            index.add(name, address)?;
        }

        // Records were listed in final token order already.
        index.sort();
        Ok(index)
    }

    /// Write the binary (compact) form: marker byte, native-endian `u32`
    /// count, native-endian `u64` addresses in token order. No names.
    pub fn write_binary<W: Write + Seek>(&mut self, writer: &mut W) -> ArchiveResult<()> {
        self.ensure_sorted();
        let n = self.entries.len();
        Self::check_count(n)?;

        writer.write_ne(&BINARY_INDEX_MARKER)?;
        writer.write_ne(&(n as u32))?;
        for &i in &self.order {
            writer.write_ne(&self.entries[i].address)?;
        }
        Ok(())
    }

    /// Parse the binary (compact) form.
    ///
    /// The count is validated before any address is read, so a corrupt
    /// count cannot drive allocation.
    pub fn read_binary<R: Read + Seek>(reader: &mut R) -> ArchiveResult<Self> {
        let marker: u8 = reader.read_ne()?;
        if marker != BINARY_INDEX_MARKER {
            return Err(ArchiveError::InvalidFormat(format!(
                "bad binary index marker: {marker:#04x}"
            )));
        }
        let count: u32 = reader.read_ne()?;
        Self::check_count(count as usize)?;

        let mut index = Self::with_capacity(count as usize);
        for _ in 0..count {
            let address: u64 = reader.read_ne()?;
            index.add_address(address)?;
        }
        // Addresses arrive in token order; insertion order is final.
        index.sorted = true;
        Ok(index)
    }

    /// Load an index file, auto-detecting the form from its first byte.
    pub fn load<P: AsRef<Path>>(path: P) -> ArchiveResult<Self> {
        let data = std::fs::read(path)?;
        match data.first() {
            None => Err(ArchiveError::InvalidFormat("empty index file".to_string())),
            Some(&BINARY_INDEX_MARKER) => {
                Self::read_binary(&mut std::io::Cursor::new(&data))
            }
            Some(_) => Self::read_text(data.as_slice()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq as assert_eq_pretty;
    use std::io::Cursor;

    fn sample_index() -> BlockIndex {
        let mut index = BlockIndex::with_capacity(16);
        index.add("ZETA", 40).expect("add should succeed");
        index.add("ALPHA", 12).expect("add should succeed");
        index.add("MU", 27).expect("add should succeed");
        index
    }

    #[test]
    fn test_sort_orders_by_folded_name() {
        let mut index = sample_index();
        index.sort();
        assert_eq!(index.name_at(0), Some("ALPHA"));
        assert_eq!(index.name_at(1), Some("MU"));
        assert_eq!(index.name_at(2), Some("ZETA"));
    }

    #[test]
    fn test_sort_is_idempotent() {
        let mut index = sample_index();
        index.sort();
        let first: Vec<_> = (0..3).map(|t| index.name_at(t).map(str::to_string)).collect();
        index.sort();
        let second: Vec<_> = (0..3).map(|t| index.name_at(t).map(str::to_string)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_address_fidelity_after_sort() {
        let mut index = sample_index();
        index.sort();
        let alpha = index.lookup("ALPHA").expect("present");
        let mu = index.lookup("MU").expect("present");
        let zeta = index.lookup("ZETA").expect("present");
        assert_eq!(index.address_at(alpha).expect("in range"), 12);
        assert_eq!(index.address_at(mu).expect("in range"), 27);
        assert_eq!(index.address_at(zeta).expect("in range"), 40);
    }

    #[test]
    fn test_lookup_case_folds() {
        let mut index = sample_index();
        assert_eq!(index.lookup("alpha"), index.lookup("ALPHA"));
        let mut lower = BlockIndex::with_capacity(4);
        lower.add("room_11", 5).expect("add should succeed");
        assert_eq!(lower.name_at(0), Some("ROOM_11"));
    }

    #[test]
    fn test_lookup_misses() {
        let mut index = sample_index();
        // Before the first entry, between entries, after the last entry.
        assert_eq!(index.lookup("AARDVARK"), None);
        assert_eq!(index.lookup("OMEGA"), None);
        assert_eq!(index.lookup("ZZTOP"), None);
    }

    #[test]
    fn test_lookup_tiny_tables() {
        let mut empty = BlockIndex::with_capacity(4);
        assert_eq!(empty.lookup("ANY"), None);

        let mut one = BlockIndex::with_capacity(4);
        one.add("ONLY", 9).expect("add should succeed");
        assert_eq!(one.lookup("ONLY"), Some(0));
        assert_eq!(one.lookup("AAA"), None);
        assert_eq!(one.lookup("ZZZ"), None);
    }

    #[test]
    fn test_add_after_sort_resorts_on_lookup() {
        let mut index = sample_index();
        index.sort();
        index.add("BETA", 99).expect("add should succeed");
        assert!(!index.is_sorted());
        assert_eq!(index.lookup("BETA"), Some(1));
        assert!(index.is_sorted());
        assert_eq!(index.name_at(0), Some("ALPHA"));
    }

    #[test]
    fn test_capacity_exhaustion() {
        let mut index = BlockIndex::with_capacity(2);
        index.add("A", 1).expect("add should succeed");
        index.add("B", 2).expect("add should succeed");
        assert!(matches!(index.add("C", 3), Err(ArchiveError::IndexFull(2))));
    }

    #[test]
    fn test_duplicates_reported_not_fatal() {
        let mut index = BlockIndex::with_capacity(8);
        index.add("FOO", 1).expect("add should succeed");
        index.add("BAR", 2).expect("add should succeed");
        index.add("foo", 3).expect("add should succeed");

        let dups = index.duplicates();
        assert_eq!(dups, vec![(1, 2)]);

        // Both remain retrievable by token, in discovery order.
        assert_eq!(index.address_at(1).expect("in range"), 1);
        assert_eq!(index.address_at(2).expect("in range"), 3);
        // Name lookup resolves to the first match.
        assert_eq!(index.lookup("FOO"), Some(1));
    }

    #[test]
    fn test_name_validation() {
        assert!(matches!(
            BlockName::new(""),
            Err(ArchiveError::InvalidName { .. })
        ));
        assert!(matches!(
            BlockName::new("SEVENTEEN_CHARS_X"),
            Err(ArchiveError::InvalidName { .. })
        ));
        assert!(matches!(
            BlockName::new("BAD NAME"),
            Err(ArchiveError::InvalidName { .. })
        ));
        assert!(BlockName::new("SIXTEEN_CHARS_OK").is_ok());
    }

    #[test]
    fn test_token_out_of_range() {
        let index = BlockIndex::with_capacity(4);
        assert!(matches!(
            index.address_at(0),
            Err(ArchiveError::TokenOutOfRange { token: 0, count: 0 })
        ));
    }

    #[test]
    fn test_text_format_shape() {
        let mut index = BlockIndex::with_capacity(8);
        index.add("ALPHA", 2).expect("add should succeed");
        index.add("ZETA", 16).expect("add should succeed");

        let mut out = Vec::new();
        index.write_text(&mut out).expect("write should succeed");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq_pretty!(
            text,
            "MAP\n2\n0 ALPHA              2\n1 ZETA               16\n"
        );
    }

    #[test]
    fn test_text_round_trip() {
        let mut index = sample_index();
        let mut out = Vec::new();
        index.write_text(&mut out).expect("write should succeed");

        let mut back = BlockIndex::read_text(out.as_slice()).expect("read should succeed");
        assert_eq!(back.len(), 3);
        for token in 0..3 {
            assert_eq!(back.name_at(token), index.name_at(token));
            assert_eq!(
                back.address_at(token).expect("in range"),
                index.address_at(token).expect("in range")
            );
        }
        assert_eq!(back.lookup("MU"), Some(1));
    }

    #[test]
    fn test_text_header_required() {
        let result = BlockIndex::read_text("XAP\n1\n0 A 1\n".as_bytes());
        assert!(matches!(result, Err(ArchiveError::InvalidFormat(_))));
    }

    #[test]
    fn test_binary_round_trip() {
        let mut index = sample_index();
        let mut buf = Cursor::new(Vec::new());
        index.write_binary(&mut buf).expect("write should succeed");

        buf.set_position(0);
        let compact = BlockIndex::read_binary(&mut buf).expect("read should succeed");
        assert_eq!(compact.len(), 3);
        assert!(!compact.has_names());
        for token in 0..3 {
            assert_eq!(
                compact.address_at(token).expect("in range"),
                index.address_at(token).expect("in range")
            );
        }
    }

    #[test]
    fn test_binary_layout() {
        let mut index = BlockIndex::with_capacity(4);
        index.add("ONLY", 77).expect("add should succeed");
        let mut buf = Cursor::new(Vec::new());
        index.write_binary(&mut buf).expect("write should succeed");

        let bytes = buf.into_inner();
        assert_eq!(bytes[0], b'~');
        assert_eq!(bytes.len(), 1 + 4 + 8);
        assert_eq!(u32::from_ne_bytes(bytes[1..5].try_into().expect("4 bytes")), 1);
        assert_eq!(
            u64::from_ne_bytes(bytes[5..13].try_into().expect("8 bytes")),
            77
        );
    }

    #[test]
    fn test_binary_count_validated_before_read() {
        // Marker + absurd count, no addresses at all.
        let mut bytes = vec![b'~'];
        bytes.extend_from_slice(&u32::MAX.to_ne_bytes());
        let result = BlockIndex::read_binary(&mut Cursor::new(bytes));
        assert!(matches!(result, Err(ArchiveError::InvalidBlockCount(_))));
    }

    #[test]
    fn test_empty_index_not_serializable() {
        let mut index = BlockIndex::with_capacity(4);
        let mut out = Vec::new();
        assert!(matches!(
            index.write_text(&mut out),
            Err(ArchiveError::InvalidBlockCount(0))
        ));
    }

    #[test]
    fn test_load_autodetects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let text_path = dir.path().join("index.map");
        let binary_path = dir.path().join("index.mpx");

        let mut index = sample_index();
        let mut text_file = std::fs::File::create(&text_path).expect("create");
        index.write_text(&mut text_file).expect("write text");
        let mut binary_file = std::fs::File::create(&binary_path).expect("create");
        index.write_binary(&mut binary_file).expect("write binary");
        drop((text_file, binary_file));

        let mut from_text = BlockIndex::load(&text_path).expect("load text");
        let from_binary = BlockIndex::load(&binary_path).expect("load binary");

        assert!(from_text.has_names());
        assert!(!from_binary.has_names());
        for token in 0..3 {
            assert_eq!(
                from_text.address_at(token).expect("in range"),
                from_binary.address_at(token).expect("in range")
            );
        }
        assert_eq!(from_text.lookup("ZETA"), Some(2));
    }

    #[test]
    fn test_name_column_padding_wide_names() {
        // A 16-char name overflows nothing; the address still follows a space.
        let mut index = BlockIndex::with_capacity(4);
        index.add("SIXTEEN_CHARS_OK", 3).expect("add should succeed");
        let mut out = Vec::new();
        index.write_text(&mut out).expect("write should succeed");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.ends_with("0 SIXTEEN_CHARS_OK   3\n"));
    }
}
