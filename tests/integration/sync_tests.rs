use super::fixtures::*;
use bl4_auto_crypter::codec::SaveCodec;
use bl4_auto_crypter::sync::{Action, SyncEngine, SyncError, ERRORS_DIR_NAME};
use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::TempDir;

fn engine() -> SyncEngine<SaveCodec> {
    SyncEngine::new(SaveCodec::new())
}

#[test]
fn test_binary_only_produces_matching_text() {
    let dir = TempDir::new().unwrap();
    let binary = encode(CHARACTER_YAML);
    let sav = write_at(dir.path(), "1.sav", &binary, BASE_TIME);

    let report = engine().run_once(dir.path(), &key()).unwrap();

    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.updated[0].action, Action::Decode);
    assert_eq!(fs::read(dir.path().join("1.yaml")).unwrap(), CHARACTER_YAML);
    assert_eq!(fs::read(&sav).unwrap(), binary);
    assert_eq!(mtime(&sav).unix_seconds(), BASE_TIME);
}

#[test]
fn test_text_only_produces_matching_binary() {
    let dir = TempDir::new().unwrap();
    let yaml = write_at(dir.path(), "profile.yaml", PROFILE_YAML, BASE_TIME);

    let report = engine().run_once(dir.path(), &key()).unwrap();

    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.updated[0].action, Action::Encode);
    let sav = fs::read(dir.path().join("profile.sav")).unwrap();
    assert_eq!(decode(&sav), PROFILE_YAML);
    assert_eq!(sav, encode(PROFILE_YAML));
    assert_eq!(fs::read(&yaml).unwrap(), PROFILE_YAML);
}

#[test]
fn test_newer_binary_overwrites_text() {
    let dir = TempDir::new().unwrap();
    write_at(dir.path(), "1.yaml", PROFILE_YAML, BASE_TIME);
    write_at(dir.path(), "1.sav", &encode(CHARACTER_YAML), BASE_TIME + 10);

    engine().run_once(dir.path(), &key()).unwrap();

    assert_eq!(fs::read(dir.path().join("1.yaml")).unwrap(), CHARACTER_YAML);
    assert_eq!(decode(&fs::read(dir.path().join("1.sav")).unwrap()), CHARACTER_YAML);
}

#[test]
fn test_newer_text_overwrites_binary() {
    let dir = TempDir::new().unwrap();
    write_at(dir.path(), "1.sav", &encode(PROFILE_YAML), BASE_TIME);
    write_at(dir.path(), "1.yaml", CHARACTER_YAML, BASE_TIME + 10);

    engine().run_once(dir.path(), &key()).unwrap();

    assert_eq!(decode(&fs::read(dir.path().join("1.sav")).unwrap()), CHARACTER_YAML);
    assert_eq!(fs::read(dir.path().join("1.yaml")).unwrap(), CHARACTER_YAML);
}

#[test]
fn test_equal_timestamps_favor_binary() {
    let dir = TempDir::new().unwrap();
    write_at(dir.path(), "1.sav", &encode(CHARACTER_YAML), BASE_TIME);
    write_at(dir.path(), "1.yaml", PROFILE_YAML, BASE_TIME);

    let report = engine().run_once(dir.path(), &key()).unwrap();

    assert_eq!(report.updated[0].action, Action::Decode);
    assert_eq!(fs::read(dir.path().join("1.yaml")).unwrap(), CHARACTER_YAML);
}

#[test]
fn test_independent_pairs_resolve_in_opposite_directions() {
    let dir = TempDir::new().unwrap();
    // Pair "1": binary newer
    write_at(dir.path(), "1.yaml", b"old: 1\n", BASE_TIME);
    write_at(dir.path(), "1.sav", &encode(CHARACTER_YAML), BASE_TIME + 5);
    // Pair "2": text newer
    write_at(dir.path(), "2.sav", &encode(b"old: 2\n"), BASE_TIME);
    write_at(dir.path(), "2.yaml", PROFILE_YAML, BASE_TIME + 5);

    let report = engine().run_once(dir.path(), &key()).unwrap();

    assert_eq!(report.updated.len(), 2);
    assert_eq!(fs::read(dir.path().join("1.yaml")).unwrap(), CHARACTER_YAML);
    assert_eq!(decode(&fs::read(dir.path().join("1.sav")).unwrap()), CHARACTER_YAML);
    assert_eq!(fs::read(dir.path().join("2.yaml")).unwrap(), PROFILE_YAML);
    assert_eq!(decode(&fs::read(dir.path().join("2.sav")).unwrap()), PROFILE_YAML);
}

#[test]
fn test_second_pass_is_a_noop() {
    let dir = TempDir::new().unwrap();
    write_at(dir.path(), "1.sav", &encode(CHARACTER_YAML), BASE_TIME);
    write_at(dir.path(), "2.yaml", PROFILE_YAML, BASE_TIME);

    engine().run_once(dir.path(), &key()).unwrap();
    let yaml_time = mtime(&dir.path().join("1.yaml"));
    let sav_time = mtime(&dir.path().join("2.sav"));

    let report = engine().run_once(dir.path(), &key()).unwrap();

    assert!(report.is_noop());
    assert_eq!(report.unchanged.len(), 2);
    assert_eq!(mtime(&dir.path().join("1.yaml")), yaml_time);
    assert_eq!(mtime(&dir.path().join("2.sav")), sav_time);
}

#[test]
fn test_unrelated_files_are_ignored() {
    let dir = TempDir::new().unwrap();
    write_at(dir.path(), "notes.txt", b"keep me", BASE_TIME);
    write_at(dir.path(), "1.sav", &encode(CHARACTER_YAML), BASE_TIME);
    fs::create_dir(dir.path().join("nested.sav")).unwrap();

    let report = engine().run_once(dir.path(), &key()).unwrap();

    assert_eq!(report.total(), 1);
    assert_eq!(fs::read(dir.path().join("notes.txt")).unwrap(), b"keep me");
    assert!(!dir.path().join("notes.yaml").exists());
}

#[test]
fn test_epic_user_id_roundtrips_through_sync() {
    let dir = TempDir::new().unwrap();
    let epic_key = bl4_auto_crypter::codec::UserKey::from_user_id(EPIC_USER_ID).unwrap();
    write_at(dir.path(), "1.yaml", CHARACTER_YAML, BASE_TIME);

    engine().run_once(dir.path(), &epic_key).unwrap();
    fs::remove_file(dir.path().join("1.yaml")).unwrap();
    engine().run_once(dir.path(), &epic_key).unwrap();

    assert_eq!(fs::read(dir.path().join("1.yaml")).unwrap(), CHARACTER_YAML);
}

#[test]
fn test_missing_folder_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = engine().run_once(&dir.path().join("absent"), &key());
    assert!(matches!(result, Err(SyncError::Resolve(_))));
}

#[test]
fn test_shutdown_flag_stops_the_pass() {
    let dir = TempDir::new().unwrap();
    write_at(dir.path(), "1.yaml", CHARACTER_YAML, BASE_TIME);

    let engine = engine().with_shutdown_flag(Arc::new(AtomicBool::new(true)));
    let result = engine.run_once(dir.path(), &key());

    assert!(matches!(result, Err(SyncError::Interrupted)));
    assert!(!dir.path().join("1.sav").exists());
}

#[test]
fn test_clean_folder_has_no_errors_dir() {
    let dir = TempDir::new().unwrap();
    write_at(dir.path(), "1.sav", &encode(CHARACTER_YAML), BASE_TIME);

    engine().run_once(dir.path(), &key()).unwrap();

    assert!(!dir.path().join(ERRORS_DIR_NAME).exists());
}

#[test]
fn test_reference_pair_roundtrips() {
    let (sav, yaml) = reference_pair();
    assert_eq!(decode(&sav), yaml);
    assert_eq!(encode(&yaml), sav);
}

#[test]
fn test_text_only_reference_matches_reference_save() {
    let dir = TempDir::new().unwrap();
    let (sav, yaml) = reference_pair();
    write_at(dir.path(), &format!("{REFERENCE_NAME}.yaml"), &yaml, BASE_TIME);

    engine().run_once(dir.path(), &key()).unwrap();

    let produced = fs::read(dir.path().join(format!("{REFERENCE_NAME}.sav"))).unwrap();
    assert!(produced == sav, "generated save differs from the reference save");
}

#[test]
fn test_binary_only_reference_matches_reference_text() {
    let dir = TempDir::new().unwrap();
    let (sav, yaml) = reference_pair();
    write_at(dir.path(), &format!("{REFERENCE_NAME}.sav"), &sav, BASE_TIME);

    engine().run_once(dir.path(), &key()).unwrap();

    assert_eq!(
        fs::read(dir.path().join(format!("{REFERENCE_NAME}.yaml"))).unwrap(),
        yaml
    );
}

#[test]
fn test_consistent_reference_pair_with_newer_text_is_untouched() {
    let dir = TempDir::new().unwrap();
    let (sav, yaml) = reference_pair();
    let sav_path = write_at(dir.path(), &format!("{REFERENCE_NAME}.sav"), &sav, BASE_TIME);
    write_at(dir.path(), &format!("{REFERENCE_NAME}.yaml"), &yaml, BASE_TIME + 1);

    let report = engine().run_once(dir.path(), &key()).unwrap();

    assert!(report.updated.is_empty());
    assert_eq!(report.unchanged, vec![REFERENCE_NAME.to_string()]);
    assert_eq!(fs::read(&sav_path).unwrap(), sav);
    assert_eq!(mtime(&sav_path).unix_seconds(), BASE_TIME);
}

#[cfg(unix)]
#[test]
fn test_symlinked_text_is_written_through() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("store");
    fs::create_dir(&store).unwrap();
    let real = write_at(&store, "slot.yaml", b"old: 1\n", BASE_TIME);
    let link = dir.path().join("1.yaml");
    std::os::unix::fs::symlink(&real, &link).unwrap();
    write_at(dir.path(), "1.sav", &encode(CHARACTER_YAML), BASE_TIME + 10);

    let report = engine().run_once(dir.path(), &key()).unwrap();

    assert_eq!(report.updated.len(), 1);
    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(fs::read(&real).unwrap(), CHARACTER_YAML);
}
