//! Save file codec.
//!
//! This module wraps the transform between the encrypted binary save format
//! and its editable plain-text (YAML) form.
//!
//! # Architecture
//!
//! * [`Codec`]: The capability trait the sync engine depends on. Any pure
//!   `decode`/`encode` pair can be plugged in, which keeps the engine testable
//!   without real save files.
//! * [`key`]: Derivation of the per-user [`UserKey`] from an account id.
//! * [`save`]: [`SaveCodec`], the real save format implementation.
//!
//! # Example
//!
//! ```
//! use bl4_auto_crypter::codec::{Codec, SaveCodec, UserKey};
//!
//! let key = UserKey::from_user_id("72057594037927937").unwrap();
//! let codec = SaveCodec::new();
//!
//! let binary = codec.encode(b"state: {}\n", &key).unwrap();
//! assert_eq!(codec.decode(&binary, &key).unwrap(), b"state: {}\n");
//! ```

pub mod key;
pub mod save;

pub use key::{KeyError, UserKey, KEY_LEN};
pub use save::SaveCodec;

/// Errors produced when a binary save cannot be turned into text.
///
/// Every variant describes malformed input; none of them indicate a bug in
/// the caller, and decoding never panics on arbitrary bytes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    /// Input is empty or not a whole number of cipher blocks.
    #[error("invalid length {0}: not a non-empty multiple of the block size")]
    BadLength(usize),

    /// The trailing padding is inconsistent (usually a wrong key).
    #[error("invalid padding")]
    BadPadding,

    /// The decrypted payload is too short to hold the length trailer.
    #[error("payload truncated: {0} bytes")]
    Truncated(usize),

    /// The compressed stream could not be inflated.
    #[error("decompression failed: {0}")]
    Decompress(String),

    /// The inflated text does not match the length stored in the trailer.
    #[error("size mismatch: trailer declares {declared} bytes, got {actual}")]
    SizeMismatch {
        /// Length recorded in the save file
        declared: u32,
        /// Length actually produced
        actual: usize,
    },
}

/// Errors produced when text cannot be turned back into a binary save.
#[derive(thiserror::Error, Debug)]
pub enum EncodeFailure {
    /// The text exceeds what the length trailer can represent.
    #[error("text too large to encode: {0} bytes")]
    TooLarge(usize),

    /// The compressor reported an error.
    #[error("compression failed: {0}")]
    Compression(#[source] std::io::Error),
}

/// A pure, keyed transform between binary saves and their text form.
///
/// Implementations must not hold hidden state: the same input and key always
/// produce the same output. `decode` must return [`DecodeFailure`] rather than
/// panic for any byte sequence, because the sync engine relies on it to route
/// unreadable files to quarantine.
pub trait Codec {
    /// Decode a binary save into its text representation.
    fn decode(&self, data: &[u8], key: &UserKey) -> Result<Vec<u8>, DecodeFailure>;

    /// Encode a text representation into a binary save.
    fn encode(&self, text: &[u8], key: &UserKey) -> Result<Vec<u8>, EncodeFailure>;
}

impl<C: Codec + ?Sized> Codec for &C {
    fn decode(&self, data: &[u8], key: &UserKey) -> Result<Vec<u8>, DecodeFailure> {
        (**self).decode(data, key)
    }

    fn encode(&self, text: &[u8], key: &UserKey) -> Result<Vec<u8>, EncodeFailure> {
        (**self).encode(text, key)
    }
}
