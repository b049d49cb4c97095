//! Error types for archive operations

use thiserror::Error;

/// Archive operation result type
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Error types for archive, index, and symbol-table operations
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Token outside the index's valid range
    #[error("token {token} out of range (index holds {count} entries)")]
    TokenOutOfRange {
        /// Requested token
        token: usize,
        /// Number of entries in the index
        count: usize,
    },

    /// No entry with the requested name
    #[error("block not found: {0}")]
    BlockNotFound(String),

    /// Name lookup attempted against an address-only index
    #[error("name lookup unsupported: index carries no names")]
    NameLookupUnsupported,

    /// Index capacity exhausted
    #[error("index full: capacity {0} exhausted")]
    IndexFull(usize),

    /// Record count outside the valid range
    #[error("invalid block count: {0} (must be 1..={max})", max = super::constants::MAX_BLOCKS)]
    InvalidBlockCount(usize),

    /// Block name rejected
    #[error("invalid block name {name:?}: {reason}")]
    InvalidName {
        /// The offending name
        name: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Malformed index or archive content
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Archive block is not valid UTF-8 text
    #[error("block at address {address} is not valid UTF-8")]
    InvalidBlockText {
        /// Archive byte offset of the block
        address: u64,
    },

    /// Key handling error
    #[error("key error: {0}")]
    Key(#[from] textvault_crypto::ObfuscatorError),

    /// Binary read/write error
    #[error("binary format error: {0}")]
    BinRead(#[from] binrw::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// Whether this error indicates malformed on-disk data rather than a
    /// bad request or an environmental failure.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidBlockCount(_)
                | Self::InvalidFormat(_)
                | Self::InvalidBlockText { .. }
                | Self::BinRead(_)
        )
    }
}
