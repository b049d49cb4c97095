//! Obfuscation cipher for textvault archives
//!
//! This crate provides the keyed positional-XOR transform used when writing
//! and reading archive blocks. It is deliberately low strength: the goal is
//! deterring casual inspection of archive files, not resisting a serious
//! attack. Anything that needs real confidentiality should not live in a
//! textvault archive.
//!
//! # Components
//!
//! - [`Obfuscator`] - the reversible, stateful byte transform
//! - [`random_key_text`] - random uppercase key-text generation
//!
//! # Examples
//!
//! ```
//! use textvault_crypto::Obfuscator;
//!
//! let mut cipher = Obfuscator::new("SWORDFISH").expect("valid key text");
//!
//! let mut data = b"Hello, World!".to_vec();
//! cipher.apply_in_place(&mut data);
//!
//! // The transform is self-inverse: reset and apply again to decode.
//! cipher.reset();
//! cipher.apply_in_place(&mut data);
//! assert_eq!(&data, b"Hello, World!");
//! ```

#![warn(missing_docs)]

pub mod obfuscator;

pub use obfuscator::{
    DEFAULT_KEY_LENGTH, MAX_KEY_LENGTH, Obfuscator, ObfuscatorError, PASSTHROUGH_LIMIT,
    random_key_text,
};
