//! End-to-end workflow tests against the real SQLite store.

#![cfg(feature = "keystore")]

use keysteward::{
    generate_key, CipherSuite, ConfirmationPrompt, Error, KeyStatus, KeyStore, KeyWorkflow,
    SetupMessageBackup, StoreImporter,
};

const TEST_PASSWORD: &str = "test-password-123";

fn import_test_key(store: &KeyStore, uid: &str) -> String {
    let key = generate_key(TEST_PASSWORD, &[uid], CipherSuite::default()).unwrap();
    store.import_secret_key(&key.secret_key).unwrap()
}

/// One active and one archived key.
fn seeded_store() -> (KeyStore, String, String) {
    let store = KeyStore::open_in_memory().unwrap();
    let active = import_test_key(&store, "Alice <alice@example.com>");
    let archived = import_test_key(&store, "Old Alice <old@example.com>");
    store.set_association("alice@example.com", &active).unwrap();
    (store, active, archived)
}

#[test]
fn test_refresh_ranks_active_first() {
    let (store, active, archived) = seeded_store();
    let mut workflow = KeyWorkflow::new(&store);

    let summaries = workflow.refresh().unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].fingerprint, active);
    assert_eq!(summaries[0].status, KeyStatus::Active);
    assert_eq!(summaries[1].fingerprint, archived);
    assert_eq!(summaries[1].status, KeyStatus::Archived);
}

#[test]
fn test_describe_derives_display_fields() {
    let (store, active, _) = seeded_store();
    let mut workflow = KeyWorkflow::new(&store);
    workflow.refresh().unwrap();

    let detail = workflow.describe(&active).unwrap();
    assert_eq!(detail.summary.used_for_label(), "alice@example.com");
    assert_eq!(detail.summary.created_for_label(), "alice@example.com");
    assert!(detail.summary.is_active);
    // Formatted fingerprint groups the 40 hex chars four by four
    assert_eq!(detail.summary.formatted_fingerprint.len(), 49);
    assert_eq!(
        detail.summary.formatted_fingerprint.replace(' ', ""),
        active
    );
}

#[test]
fn test_backup_and_restore_round_trip() {
    let (store, active, _) = seeded_store();
    let mut workflow = KeyWorkflow::new(&store);
    workflow.refresh().unwrap();
    workflow.describe(&active).unwrap();
    assert!(workflow.can_backup());

    let backup = workflow.backup(&active, &SetupMessageBackup).unwrap();

    // Restore on a "second device"
    let other = KeyStore::open_in_memory().unwrap();
    let importer = StoreImporter::new(&other).with_passcode(&backup.passphrase);
    let mut other_workflow = KeyWorkflow::new(&other);

    let imported = other_workflow
        .import_backup(&importer, backup.message.as_bytes())
        .unwrap();
    assert!(imported);

    other_workflow.refresh().unwrap();
    assert_eq!(other_workflow.summaries().len(), 1);
    assert_eq!(other_workflow.summaries()[0].fingerprint, active);
}

#[test]
fn test_import_raw_secret_key() {
    let store = KeyStore::open_in_memory().unwrap();
    let workflow = KeyWorkflow::new(&store);
    let importer = StoreImporter::new(&store);

    let key = generate_key(TEST_PASSWORD, &["Raw <raw@example.com>"], CipherSuite::default())
        .unwrap();
    assert!(workflow.import_backup(&importer, &key.secret_key).unwrap());
    assert!(store.contains(&key.fingerprint).unwrap());
}

#[test]
fn test_import_unrecognized_content() {
    let (store, _, _) = seeded_store();
    let mut workflow = KeyWorkflow::new(&store);
    workflow.refresh().unwrap();
    let importer = StoreImporter::new(&store);

    let imported = workflow
        .import_backup(&importer, b"<html>not a key backup at all</html>")
        .unwrap();
    assert!(!imported);
    assert_eq!(store.count().unwrap(), 2);
}

#[test]
fn test_import_setup_message_needs_passcode() {
    let (store, active, _) = seeded_store();
    let mut workflow = KeyWorkflow::new(&store);
    workflow.refresh().unwrap();
    workflow.describe(&active).unwrap();

    let backup = workflow.backup(&active, &SetupMessageBackup).unwrap();

    let other = KeyStore::open_in_memory().unwrap();
    let importer = StoreImporter::new(&other);
    let result = workflow.import_backup(&importer, backup.message.as_bytes());
    assert!(matches!(result, Err(Error::PasscodeRequired)));
}

#[test]
fn test_forget_end_to_end() {
    let (store, active, archived) = seeded_store();
    let mut workflow = KeyWorkflow::new(&store);
    workflow.refresh().unwrap();

    // The active key is protected
    workflow.describe(&active).unwrap();
    assert!(!workflow.can_forget());
    assert!(matches!(workflow.forget(&active), Err(Error::KeyInUse(_))));

    // The archived key can go
    workflow.describe(&archived).unwrap();
    assert!(workflow.can_forget());
    workflow.forget(&archived).unwrap();

    let removing = workflow
        .summaries()
        .iter()
        .find(|s| s.fingerprint == archived)
        .unwrap();
    assert_eq!(removing.status, KeyStatus::Removing);

    workflow.complete_removal().unwrap();
    assert!(!store.contains(&archived).unwrap());
    assert!(workflow
        .summaries()
        .iter()
        .all(|s| s.fingerprint != archived));
}

#[test]
fn test_forget_confirmed_with_token_prompt() {
    struct TypedToken(String);
    impl ConfirmationPrompt for TypedToken {
        fn ask(&self, expected_token: &str) -> bool {
            self.0 == expected_token
        }
    }

    let (store, _, archived) = seeded_store();
    let mut workflow = KeyWorkflow::new(&store);
    workflow.refresh().unwrap();
    workflow.describe(&archived).unwrap();

    // User typed the wrong token
    let wrong = TypedToken("nope".to_string());
    assert!(!workflow.forget_confirmed(&archived, &wrong).unwrap());
    assert!(store.contains(&archived).unwrap());

    // User typed the last four characters, lowercased
    let token = archived[archived.len() - 4..].to_lowercase();
    let right = TypedToken(token);
    assert!(workflow.forget_confirmed(&archived, &right).unwrap());
    workflow.complete_removal().unwrap();
    assert!(!store.contains(&archived).unwrap());
}

#[test]
fn test_stale_selection_after_external_mutation() {
    let (store, _, archived) = seeded_store();
    let mut workflow = KeyWorkflow::new(&store);
    workflow.refresh().unwrap();

    // Key vanishes behind the workflow's back
    store.delete_secret_key(&archived).unwrap();
    workflow.refresh().unwrap();

    let result = workflow.describe(&archived);
    assert!(matches!(result, Err(Error::KeyNotFound(_))));
}
