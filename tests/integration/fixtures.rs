//! Shared helpers for building save folders.

#![allow(dead_code)]

use bl4_auto_crypter::codec::{Codec, SaveCodec, UserKey};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Steam id used by every fixture.
pub const USER_ID: &str = "72057594037927937";

/// An Epic account id, exactly 32 characters.
pub const EPIC_USER_ID: &str = "0123456789abcdef0123456789abcdef";

pub const CHARACTER_YAML: &[u8] = b"state:\n  class: DarkSiren\n  level: 12\n  currencies:\n    cash: 1045\n";
pub const PROFILE_YAML: &[u8] = b"domains:\n  local:\n    shared_progress: []\n";

/// Seconds since the epoch used as a baseline for explicit timestamps.
pub const BASE_TIME: i64 = 1_700_000_000;

pub fn key() -> UserKey {
    UserKey::from_user_id(USER_ID).unwrap()
}

pub fn encode(text: &[u8]) -> Vec<u8> {
    SaveCodec::new().encode(text, &key()).unwrap()
}

pub fn decode(binary: &[u8]) -> Vec<u8> {
    SaveCodec::new().decode(binary, &key()).unwrap()
}

/// Write `content` to `folder/name` and pin its modification time.
pub fn write_at(folder: &Path, name: &str, content: &[u8], secs: i64) -> PathBuf {
    let path = folder.join(name);
    fs::write(&path, content).unwrap();
    stamp(&path, secs);
    path
}

pub fn stamp(path: &Path, secs: i64) {
    set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
}

pub fn mtime(path: &Path) -> FileTime {
    FileTime::from_last_modification_time(&fs::metadata(path).unwrap())
}

/// Write `content` to `folder/name` and date it `ahead` seconds in the future,
/// so it is newer than anything written by a sync pass.
pub fn write_ahead(folder: &Path, name: &str, content: &[u8], ahead: u64) -> PathBuf {
    let path = folder.join(name);
    fs::write(&path, content).unwrap();
    let when = SystemTime::now() + Duration::from_secs(ahead);
    set_file_mtime(&path, FileTime::from_system_time(when)).unwrap();
    path
}

/// Base name of the reference pair under `tests/fixtures`.
pub const REFERENCE_NAME: &str = "1_72057594037927937";

/// Save/YAML pair written by zlib and AES outside this crate.
pub fn reference_pair() -> (Vec<u8>, Vec<u8>) {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures");
    (
        fs::read(dir.join(format!("{REFERENCE_NAME}.sav"))).unwrap(),
        fs::read(dir.join(format!("{REFERENCE_NAME}.yaml"))).unwrap(),
    )
}
