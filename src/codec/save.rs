//! The binary save format.
//!
//! A save file is laid out as:
//!
//! ```text
//! AES-256-ECB( zlib(text) | u32 LE text length | padding )
//! ```
//!
//! Padding always adds between 1 and 16 bytes, each holding the padding
//! length. Decoding checks every layer and reports the first inconsistency
//! as a [`DecodeFailure`].

use std::io::{Read, Write};

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::{Codec, DecodeFailure, EncodeFailure, UserKey};

/// Cipher block size in bytes.
pub const BLOCK_SIZE: usize = 16;

const TRAILER_LEN: usize = std::mem::size_of::<u32>();

/// Codec for real save files.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveCodec {
    _private: (),
}

impl SaveCodec {
    /// Create a new save codec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Codec for SaveCodec {
    fn decode(&self, data: &[u8], key: &UserKey) -> Result<Vec<u8>, DecodeFailure> {
        if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
            return Err(DecodeFailure::BadLength(data.len()));
        }

        let mut plain = data.to_vec();
        let cipher = Aes256::new(GenericArray::from_slice(key.as_bytes()));
        for block in plain.chunks_exact_mut(BLOCK_SIZE) {
            cipher.decrypt_block(GenericArray::from_mut_slice(block));
        }

        let body_len = strip_padding(&plain)?;
        if body_len < TRAILER_LEN {
            return Err(DecodeFailure::Truncated(body_len));
        }

        let compressed_len = body_len - TRAILER_LEN;
        let mut trailer = [0u8; TRAILER_LEN];
        trailer.copy_from_slice(&plain[compressed_len..body_len]);
        let declared = u32::from_le_bytes(trailer);

        // Read at most one byte past the declared size so oversized streams are caught
        let mut text = Vec::new();
        ZlibDecoder::new(&plain[..compressed_len])
            .take(u64::from(declared) + 1)
            .read_to_end(&mut text)
            .map_err(|e| DecodeFailure::Decompress(e.to_string()))?;

        if text.len() != declared as usize {
            return Err(DecodeFailure::SizeMismatch {
                declared,
                actual: text.len(),
            });
        }

        Ok(text)
    }

    fn encode(&self, text: &[u8], key: &UserKey) -> Result<Vec<u8>, EncodeFailure> {
        let declared = u32::try_from(text.len()).map_err(|_| EncodeFailure::TooLarge(text.len()))?;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text).map_err(EncodeFailure::Compression)?;
        let mut payload = encoder.finish().map_err(EncodeFailure::Compression)?;

        payload.extend_from_slice(&declared.to_le_bytes());

        let padding = BLOCK_SIZE - (payload.len() % BLOCK_SIZE);
        payload.resize(payload.len() + padding, padding as u8);

        let cipher = Aes256::new(GenericArray::from_slice(key.as_bytes()));
        for block in payload.chunks_exact_mut(BLOCK_SIZE) {
            cipher.encrypt_block(GenericArray::from_mut_slice(block));
        }

        Ok(payload)
    }
}

/// Validate the padding and return the length of the data before it.
fn strip_padding(plain: &[u8]) -> Result<usize, DecodeFailure> {
    let padding = match plain.last() {
        Some(&p) => p as usize,
        None => return Err(DecodeFailure::BadPadding),
    };

    if padding == 0 || padding > BLOCK_SIZE || padding > plain.len() {
        return Err(DecodeFailure::BadPadding);
    }

    let body_len = plain.len() - padding;
    if plain[body_len..].iter().any(|&b| b as usize != padding) {
        return Err(DecodeFailure::BadPadding);
    }

    Ok(body_len)
}
