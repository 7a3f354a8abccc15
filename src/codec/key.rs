//! Per-user key derivation.
//!
//! Save files are encrypted with a fixed base key mixed with the owner's
//! account id. Two account id shapes are accepted:
//!
//! - Epic account ids: exactly 32 hex characters. The id is XORed in as
//!   UTF-16LE, so only the first 16 characters land in the key.
//! - Steam ids: a 64-bit decimal integer above `0x0100_0000_0000_0000`,
//!   XORed in as little-endian bytes.

use std::fmt;

/// Length of a derived key in bytes.
pub const KEY_LEN: usize = 32;

const EPIC_ID_LEN: usize = 32;

/// Lowest value accepted as a Steam id (exclusive).
const STEAM_ID_FLOOR: u64 = 0x0100_0000_0000_0000;

const BASE_KEY: [u8; KEY_LEN] = [
    0x35, 0xec, 0x33, 0x77, 0xf3, 0x5d, 0xb0, 0xea, 0xbe, 0x6b, 0x83, 0x11, 0x54, 0x03, 0xeb, 0xfb,
    0x27, 0x25, 0x64, 0x2e, 0xd5, 0x49, 0x06, 0x29, 0x05, 0x78, 0xbd, 0x60, 0xba, 0x4a, 0xa7, 0x87,
];

/// Errors returned when a user id cannot be turned into a key.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The id is longer than any supported account id.
    #[error("user id too long ({0} characters)")]
    TooLong(usize),

    /// The id is neither an Epic nor a Steam account id.
    #[error("unrecognised user id: {0:?}")]
    Unrecognised(String),
}

/// A 256-bit key bound to one user's saves.
#[derive(Clone, PartialEq, Eq)]
pub struct UserKey([u8; KEY_LEN]);

impl UserKey {
    /// Derive the key for the given account id.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] if the id is not a recognised account id.
    ///
    /// # Examples
    ///
    /// ```
    /// use bl4_auto_crypter::codec::UserKey;
    ///
    /// assert!(UserKey::from_user_id("72057594037927937").is_ok());
    /// assert!(UserKey::from_user_id("not-an-id").is_err());
    /// ```
    pub fn from_user_id(user_id: &str) -> Result<Self, KeyError> {
        let mut key = BASE_KEY;

        if user_id.len() > EPIC_ID_LEN {
            return Err(KeyError::TooLong(user_id.len()));
        }

        if user_id.len() == EPIC_ID_LEN {
            // UTF-16LE doubles the length, so the second half falls off the end
            for (i, byte) in user_id.bytes().take(KEY_LEN / 2).enumerate() {
                key[2 * i] ^= byte;
            }
            return Ok(Self(key));
        }

        match user_id.parse::<u64>() {
            Ok(steam_id) if steam_id > STEAM_ID_FLOOR => {
                for (slot, byte) in key.iter_mut().zip(steam_id.to_le_bytes()) {
                    *slot ^= byte;
                }
                Ok(Self(key))
            }
            _ => Err(KeyError::Unrecognised(user_id.to_string())),
        }
    }

    /// Wrap raw key bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UserKey(<redacted>)")
    }
}
