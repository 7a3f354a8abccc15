use super::fixtures::*;
use bl4_auto_crypter::codec::SaveCodec;
use bl4_auto_crypter::sync::{ErrorVault, Quarantined, SyncEngine, ERRORS_DIR_NAME};
use std::fs;
use tempfile::TempDir;

const CORRUPT: [u8; 4] = [0x01, 0x02, 0x03, 0x04];
const CORRUPT_SHA1: &str = "12dada1fff4d4787ade3333147202c3b443e376f";

#[test]
fn test_corrupt_binary_is_backed_up_and_left_alone() {
    let dir = TempDir::new().unwrap();
    let sav = write_at(dir.path(), "broken.sav", &CORRUPT, BASE_TIME);

    let report = SyncEngine::new(SaveCodec::new())
        .run_once(dir.path(), &key())
        .unwrap();

    assert_eq!(report.quarantined.len(), 1);
    assert!(!report.has_failures());
    assert_eq!(fs::read(&sav).unwrap(), CORRUPT);
    assert_eq!(mtime(&sav).unix_seconds(), BASE_TIME);
    assert!(!dir.path().join("broken.yaml").exists());

    let backup = dir
        .path()
        .join(ERRORS_DIR_NAME)
        .join(format!("{CORRUPT_SHA1}.sav.b4ac"));
    assert_eq!(fs::read(&backup).unwrap(), CORRUPT);
    assert_eq!(report.quarantined[0].backup, Quarantined::Created(backup));
}

#[test]
fn test_repeated_passes_keep_a_single_backup() {
    let dir = TempDir::new().unwrap();
    write_at(dir.path(), "a.sav", &CORRUPT, BASE_TIME);
    write_at(dir.path(), "b.sav", &CORRUPT, BASE_TIME);

    let engine = SyncEngine::new(SaveCodec::new());
    let first = engine.run_once(dir.path(), &key()).unwrap();
    let second = engine.run_once(dir.path(), &key()).unwrap();

    assert_eq!(first.quarantined.len(), 2);
    assert!(second.is_noop());
    let backups: Vec<_> = fs::read_dir(dir.path().join(ERRORS_DIR_NAME))
        .unwrap()
        .collect();
    assert_eq!(backups.len(), 1);
}

#[test]
fn test_corrupt_binary_keeps_existing_text() {
    let dir = TempDir::new().unwrap();
    let yaml = write_at(dir.path(), "1.yaml", CHARACTER_YAML, BASE_TIME);
    write_at(dir.path(), "1.sav", &CORRUPT, BASE_TIME + 10);

    SyncEngine::new(SaveCodec::new())
        .run_once(dir.path(), &key())
        .unwrap();

    assert_eq!(fs::read(&yaml).unwrap(), CHARACTER_YAML);
    assert_eq!(fs::read(dir.path().join("1.sav")).unwrap(), CORRUPT);
}

#[test]
fn test_corrupt_pair_does_not_block_others() {
    let dir = TempDir::new().unwrap();
    write_at(dir.path(), "1.sav", &CORRUPT, BASE_TIME);
    write_at(dir.path(), "2.sav", &encode(PROFILE_YAML), BASE_TIME);

    let report = SyncEngine::new(SaveCodec::new())
        .run_once(dir.path(), &key())
        .unwrap();

    assert_eq!(report.quarantined.len(), 1);
    assert_eq!(report.updated.len(), 1);
    assert_eq!(fs::read(dir.path().join("2.yaml")).unwrap(), PROFILE_YAML);
}

#[test]
fn test_save_for_another_user_is_quarantined() {
    let dir = TempDir::new().unwrap();
    let foreign = SaveCodec::new();
    let other_key = bl4_auto_crypter::codec::UserKey::from_user_id(EPIC_USER_ID).unwrap();
    let binary = bl4_auto_crypter::codec::Codec::encode(&foreign, CHARACTER_YAML, &other_key).unwrap();
    write_at(dir.path(), "1.sav", &binary, BASE_TIME);

    let report = SyncEngine::new(SaveCodec::new())
        .run_once(dir.path(), &key())
        .unwrap();

    assert_eq!(report.quarantined.len(), 1);
    let backup = dir
        .path()
        .join(ERRORS_DIR_NAME)
        .join(ErrorVault::backup_name(&binary));
    assert_eq!(fs::read(backup).unwrap(), binary);
}
