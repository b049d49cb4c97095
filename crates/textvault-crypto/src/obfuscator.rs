//! Positional XOR obfuscation cipher.
//!
//! The cipher XORs each byte with a key byte selected by an internal
//! position counter. Bytes below [`PASSTHROUGH_LIMIT`] pass through
//! untouched in both directions, which guarantees that the NUL block
//! terminators written into an archive survive obfuscation and can be
//! detected without knowing block lengths in advance.
//!
//! The working key is never the caller's text. It is derived per character
//! as `(byte ^ 0x07) & 0x0F`, with zero results remapped to 1, so no derived
//! key byte falls below the passthrough limit. An empty key text derives the
//! single working byte `0`, which turns the transform into the identity.
//!
//! ## Usage
//!
//! ```rust
//! use textvault_crypto::Obfuscator;
//!
//! let mut cipher = Obfuscator::new("MYKEY").expect("valid key text");
//! let encoded: Vec<u8> = b"some text".iter().map(|&b| cipher.apply(b)).collect();
//!
//! // Reset position before decoding; the same operation inverts itself.
//! cipher.reset();
//! let decoded: Vec<u8> = encoded.iter().map(|&b| cipher.apply(b)).collect();
//! assert_eq!(&decoded, b"some text");
//! ```

use rand::RngExt;
use thiserror::Error;

/// Maximum length of a key text in bytes.
pub const MAX_KEY_LENGTH: usize = 32;

/// Default length for generated key texts.
pub const DEFAULT_KEY_LENGTH: usize = 20;

/// Bytes below this value pass through the cipher unchanged.
pub const PASSTHROUGH_LIMIT: u8 = 0x10;

/// Constant XORed into each key-text byte during key derivation.
const KEY_DERIVE_XOR: u8 = 0x07;

/// Mask applied after the derivation XOR.
const KEY_DERIVE_MASK: u8 = 0x0F;

/// Errors that can occur when installing a key.
#[derive(Error, Debug)]
pub enum ObfuscatorError {
    /// Key text exceeds [`MAX_KEY_LENGTH`] bytes.
    #[error("key text too long: {0} bytes (maximum {MAX_KEY_LENGTH})")]
    KeyTooLong(usize),

    /// Key text contains a byte that cannot be stored in the archive header.
    #[error("key text contains a non-printable or non-ASCII byte at offset {0}")]
    InvalidKeyText(usize),
}

/// Reversible, keyed, stateful byte transform.
///
/// One `Obfuscator` instance serves both writing and reading. Call
/// [`reset`](Self::reset) before each independent unit (in an archive, each
/// block) so both sides start the keystream at position zero.
#[derive(Debug, Clone)]
pub struct Obfuscator {
    /// Derived working key. Never empty; `[0]` when transformation is off.
    key: Vec<u8>,
    /// Raw key text as stored in the archive header.
    key_text: String,
    /// Position into the working key.
    position: usize,
}

impl Obfuscator {
    /// Create a cipher from a key text.
    ///
    /// An empty text disables transformation entirely.
    ///
    /// # Errors
    ///
    /// Returns [`ObfuscatorError::KeyTooLong`] for texts over
    /// [`MAX_KEY_LENGTH`] bytes and [`ObfuscatorError::InvalidKeyText`] for
    /// texts with non-ASCII or control bytes.
    pub fn new(key_text: &str) -> Result<Self, ObfuscatorError> {
        let mut cipher = Self {
            key: vec![0],
            key_text: String::new(),
            position: 0,
        };
        cipher.set_key(key_text)?;
        Ok(cipher)
    }

    /// Create a cipher with a freshly generated random key text.
    pub fn with_random_key(length: usize) -> Self {
        let text = random_key_text(length);
        Self {
            key: derive_key(text.as_bytes()),
            key_text: text,
            position: 0,
        }
    }

    /// Install a new key text, deriving the working key from it.
    ///
    /// Resets the keystream position.
    pub fn set_key(&mut self, key_text: &str) -> Result<(), ObfuscatorError> {
        if key_text.len() > MAX_KEY_LENGTH {
            return Err(ObfuscatorError::KeyTooLong(key_text.len()));
        }
        if let Some(pos) = key_text
            .bytes()
            .position(|b| !b.is_ascii() || b < PASSTHROUGH_LIMIT)
        {
            return Err(ObfuscatorError::InvalidKeyText(pos));
        }

        self.key = derive_key(key_text.as_bytes());
        self.key_text = key_text.to_string();
        self.reset();
        Ok(())
    }

    /// Reset the keystream position to zero.
    ///
    /// Must be called before obfuscating or de-obfuscating any independent
    /// unit.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Transform one byte.
    ///
    /// Bytes below [`PASSTHROUGH_LIMIT`] return unchanged and do not advance
    /// the keystream position; all other bytes are XORed with the current
    /// key byte and advance the position modulo the key length.
    pub fn apply(&mut self, byte: u8) -> u8 {
        if byte < PASSTHROUGH_LIMIT {
            return byte;
        }
        let out = byte ^ self.key[self.position];
        self.position = (self.position + 1) % self.key.len();
        out
    }

    /// Transform a buffer in place.
    pub fn apply_in_place(&mut self, data: &mut [u8]) {
        for byte in data {
            *byte = self.apply(*byte);
        }
    }

    /// The raw key text, as written to the archive header.
    pub fn key_text(&self) -> &str {
        &self.key_text
    }

    /// Whether the cipher currently transforms anything at all.
    pub fn is_active(&self) -> bool {
        !self.key_text.is_empty()
    }
}

impl Default for Obfuscator {
    fn default() -> Self {
        Self {
            key: vec![0],
            key_text: String::new(),
            position: 0,
        }
    }
}

/// Derive a working key from raw key-text bytes.
///
/// The derived key never contains a zero byte, so "XOR with 0" remains
/// reserved for the disabled (empty key text) state.
fn derive_key(text: &[u8]) -> Vec<u8> {
    if text.is_empty() {
        return vec![0];
    }

    text.iter()
        .map(|&b| {
            let k = (b ^ KEY_DERIVE_XOR) & KEY_DERIVE_MASK;
            if k == 0 { 1 } else { k }
        })
        .collect()
}

/// Generate a random key text of uppercase letters.
///
/// Lengths over [`MAX_KEY_LENGTH`] are capped; zero yields an empty text
/// (transformation disabled).
pub fn random_key_text(length: usize) -> String {
    let length = length.min(MAX_KEY_LENGTH);
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(rng.random_range(b'A'..=b'Z')))
        .collect()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_round_trip() {
        let mut cipher = Obfuscator::new("SWORDFISH").expect("valid key");
        let plaintext = b"Hello, obfuscated world!";

        let mut data = plaintext.to_vec();
        cipher.apply_in_place(&mut data);
        assert_ne!(&data[..], &plaintext[..]);

        cipher.reset();
        cipher.apply_in_place(&mut data);
        assert_eq!(&data[..], &plaintext[..]);
    }

    #[test]
    fn test_control_bytes_pass_through() {
        let mut cipher = Obfuscator::new("KEY").expect("valid key");
        for b in 0..PASSTHROUGH_LIMIT {
            assert_eq!(cipher.apply(b), b);
        }
        // Passthrough bytes must not advance the keystream: the first real
        // byte still meets key position 0.
        let first = cipher.apply(b'A');
        let mut fresh = Obfuscator::new("KEY").expect("valid key");
        assert_eq!(first, fresh.apply(b'A'));
    }

    #[test]
    fn test_nul_terminator_survives() {
        let mut cipher = Obfuscator::new("TERMCHECK").expect("valid key");
        let mut data = b"block text\x00".to_vec();
        cipher.apply_in_place(&mut data);
        assert_eq!(data.last(), Some(&0u8));
        assert_eq!(data.iter().filter(|&&b| b == 0).count(), 1);
    }

    #[test]
    fn test_empty_key_disables_transform() {
        let mut cipher = Obfuscator::new("").expect("empty key is valid");
        assert!(!cipher.is_active());
        let mut data = b"untouched text".to_vec();
        cipher.apply_in_place(&mut data);
        assert_eq!(&data[..], b"untouched text");
    }

    #[test]
    fn test_derived_key_never_below_limit() {
        for text in ["AAAA", "key text", "0123456789", "ZZZZZZZZ"] {
            let key = derive_key(text.as_bytes());
            assert!(key.iter().all(|&k| k >= 1 && k <= 0x0F), "text {text:?}");
        }
    }

    #[test]
    fn test_key_too_long_rejected() {
        let text = "A".repeat(MAX_KEY_LENGTH + 1);
        assert!(matches!(
            Obfuscator::new(&text),
            Err(ObfuscatorError::KeyTooLong(_))
        ));
        assert!(Obfuscator::new(&"A".repeat(MAX_KEY_LENGTH)).is_ok());
    }

    #[test]
    fn test_control_bytes_in_key_rejected() {
        assert!(matches!(
            Obfuscator::new("AB\u{7}CD"),
            Err(ObfuscatorError::InvalidKeyText(2))
        ));
    }

    #[test]
    fn test_random_key_text() {
        let text = random_key_text(DEFAULT_KEY_LENGTH);
        assert_eq!(text.len(), DEFAULT_KEY_LENGTH);
        assert!(text.bytes().all(|b| b.is_ascii_uppercase()));

        assert_eq!(random_key_text(100).len(), MAX_KEY_LENGTH);
        assert!(random_key_text(0).is_empty());
    }

    #[test]
    fn test_same_key_text_same_stream() {
        let mut a = Obfuscator::new("REPEATABLE").expect("valid key");
        let mut b = Obfuscator::new("REPEATABLE").expect("valid key");
        let data = b"deterministic output expected";
        let ea: Vec<u8> = data.iter().map(|&x| a.apply(x)).collect();
        let eb: Vec<u8> = data.iter().map(|&x| b.apply(x)).collect();
        assert_eq!(ea, eb);
    }

    proptest! {
        #[test]
        fn prop_self_inverse(key in "[A-Z0-9 ]{0,32}", data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let mut cipher = Obfuscator::new(&key).expect("generated key is valid");
            let mut buf = data.clone();
            cipher.apply_in_place(&mut buf);
            cipher.reset();
            cipher.apply_in_place(&mut buf);
            prop_assert_eq!(buf, data);
        }

        #[test]
        fn prop_passthrough(key in "[A-Z]{1,32}", b in 0u8..0x10) {
            let mut cipher = Obfuscator::new(&key).expect("generated key is valid");
            prop_assert_eq!(cipher.apply(b), b);
        }
    }
}
