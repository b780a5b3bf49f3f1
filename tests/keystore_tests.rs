//! KeyStore integration tests.
//!
//! These tests require the `keystore` feature to be enabled.

#![cfg(feature = "keystore")]

use keysteward::{generate_key, CipherSuite, Error, KeyStore};
use tempfile::tempdir;

const TEST_PASSWORD: &str = "test-password-123";

fn create_test_key(uid: &str) -> (Vec<u8>, String) {
    let key = generate_key(TEST_PASSWORD, &[uid], CipherSuite::default()).unwrap();
    (key.secret_key, key.fingerprint)
}

#[test]
fn test_store_create() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");

    let store = KeyStore::open(&db_path).unwrap();
    assert!(db_path.exists());
    assert_eq!(store.count().unwrap(), 0);
    drop(store);
}

#[test]
fn test_import_and_get_secret_key() {
    let store = KeyStore::open_in_memory().unwrap();

    let (secret_key, fingerprint) = create_test_key("Test <test@example.com>");
    let imported = store.import_secret_key(&secret_key).unwrap();
    assert_eq!(imported, fingerprint);

    let record = store.secret_key(&fingerprint).unwrap();
    assert_eq!(record.fingerprint, fingerprint);
    assert_eq!(record.user_ids, vec!["Test <test@example.com>"]);
    // Key material is stored verbatim
    assert_eq!(record.key_data, secret_key);
}

#[test]
fn test_import_duplicate_replaces() {
    let store = KeyStore::open_in_memory().unwrap();

    let (secret_key, fingerprint) = create_test_key("Dup <dup@example.com>");
    store.import_secret_key(&secret_key).unwrap();
    store.set_association("dup@example.com", &fingerprint).unwrap();

    let again = store.import_secret_key(&secret_key).unwrap();
    assert_eq!(again, fingerprint);
    assert_eq!(store.count().unwrap(), 1);

    let record = store.secret_key(&fingerprint).unwrap();
    assert_eq!(record.user_ids.len(), 1);

    // Re-importing a key must not drop its associations
    assert_eq!(store.associations_for(&fingerprint).unwrap().len(), 1);
}

#[test]
fn test_list_secret_keys_ordered_by_fingerprint() {
    let store = KeyStore::open_in_memory().unwrap();

    let (key_a, _) = create_test_key("A <a@example.com>");
    let (key_b, _) = create_test_key("B <b@example.com>");
    store.import_secret_key(&key_a).unwrap();
    store.import_secret_key(&key_b).unwrap();

    let records = store.list_secret_keys().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0].fingerprint < records[1].fingerprint);
}

#[test]
fn test_contains() {
    let store = KeyStore::open_in_memory().unwrap();

    let (secret_key, fingerprint) = create_test_key("Here <here@example.com>");
    assert!(!store.contains(&fingerprint).unwrap());

    store.import_secret_key(&secret_key).unwrap();
    assert!(store.contains(&fingerprint).unwrap());
}

#[test]
fn test_delete_cascades_associations() {
    let store = KeyStore::open_in_memory().unwrap();

    let (secret_key, fingerprint) = create_test_key("Gone <gone@example.com>");
    store.import_secret_key(&secret_key).unwrap();
    store.set_association("gone@example.com", &fingerprint).unwrap();
    assert_eq!(store.associations_for(&fingerprint).unwrap().len(), 1);

    store.delete_secret_key(&fingerprint).unwrap();

    assert!(!store.contains(&fingerprint).unwrap());
    assert!(store.associations_for(&fingerprint).unwrap().is_empty());
    assert!(store.list_associations().unwrap().is_empty());
}

#[test]
fn test_delete_nonexistent_key() {
    let store = KeyStore::open_in_memory().unwrap();

    let result = store.delete_secret_key("0000000000000000");
    assert!(matches!(result, Err(Error::KeyNotFound(_))));
}

#[test]
fn test_association_requires_stored_key() {
    let store = KeyStore::open_in_memory().unwrap();

    let result = store.set_association("nobody@example.com", "0000000000000000");
    assert!(matches!(result, Err(Error::KeyNotFound(_))));
}

#[test]
fn test_associations_ordered_by_email() {
    let store = KeyStore::open_in_memory().unwrap();

    let (secret_key, fingerprint) = create_test_key("Multi <multi@example.com>");
    store.import_secret_key(&secret_key).unwrap();

    store.set_association("zoe@example.com", &fingerprint).unwrap();
    store.set_association("ann@example.com", &fingerprint).unwrap();
    store.set_association("mid@example.com", &fingerprint).unwrap();

    let emails: Vec<String> = store
        .associations_for(&fingerprint)
        .unwrap()
        .into_iter()
        .map(|a| a.email)
        .collect();
    assert_eq!(
        emails,
        vec!["ann@example.com", "mid@example.com", "zoe@example.com"]
    );
}

#[test]
fn test_association_moves_between_keys() {
    let store = KeyStore::open_in_memory().unwrap();

    let (key1, fpr1) = create_test_key("One <one@example.com>");
    let (key2, fpr2) = create_test_key("Two <two@example.com>");
    store.import_secret_key(&key1).unwrap();
    store.import_secret_key(&key2).unwrap();

    // An address maps to at most one key
    store.set_association("shared@example.com", &fpr1).unwrap();
    store.set_association("shared@example.com", &fpr2).unwrap();

    assert!(store.associations_for(&fpr1).unwrap().is_empty());
    assert_eq!(store.associations_for(&fpr2).unwrap().len(), 1);
}

#[test]
fn test_remove_association() {
    let store = KeyStore::open_in_memory().unwrap();

    let (secret_key, fingerprint) = create_test_key("Assoc <assoc@example.com>");
    store.import_secret_key(&secret_key).unwrap();
    store.set_association("assoc@example.com", &fingerprint).unwrap();

    store.remove_association("assoc@example.com").unwrap();
    assert!(store.associations_for(&fingerprint).unwrap().is_empty());

    // Removing a missing association is not an error
    store.remove_association("assoc@example.com").unwrap();
}

#[test]
fn test_persistence_across_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("persist.db");

    let (secret_key, fingerprint) = create_test_key("Keep <keep@example.com>");
    let created_at = {
        let store = KeyStore::open(&db_path).unwrap();
        store.import_secret_key(&secret_key).unwrap();
        store.set_association("keep@example.com", &fingerprint).unwrap();
        store.secret_key(&fingerprint).unwrap().created_at
    };

    let store = KeyStore::open(&db_path).unwrap();
    let record = store.secret_key(&fingerprint).unwrap();
    assert_eq!(record.created_at, created_at);
    assert_eq!(record.user_ids, vec!["Keep <keep@example.com>"]);
    assert_eq!(store.associations_for(&fingerprint).unwrap().len(), 1);
}

#[test]
fn test_get_nonexistent_key() {
    let store = KeyStore::open_in_memory().unwrap();

    let result = store.secret_key("DOES-NOT-EXIST");
    assert!(matches!(result, Err(Error::KeyNotFound(_))));
}

#[test]
fn test_in_memory_has_no_path() {
    let store = KeyStore::open_in_memory().unwrap();
    assert!(store.path().is_none());
}
