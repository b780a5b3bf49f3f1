//! # keysteward
//!
//! Management of OpenPGP/Autocrypt secret keys: list and rank keys by
//! their Autocrypt usage, back a key up into an encrypted setup message,
//! import backups or raw keys, and forget (delete) archived keys behind a
//! confirmation step.
//!
//! The center of the crate is [`KeyWorkflow`], which derives a
//! display-ready, deterministically ordered [`KeySummary`] list from the
//! backing stores and drives the select/backup/import/forget state
//! machine. Keys in active Autocrypt use rank first and cannot be
//! forgotten; archived keys follow, oldest first.
//!
//! ## Quick Start
//!
//! ```no_run
//! use keysteward::{
//!     generate_key, CipherSuite, KeyStore, KeyWorkflow, SetupMessageBackup, StoreImporter,
//! };
//!
//! // A store with one key, marked as in use for an address
//! let store = KeyStore::open("keys.db").unwrap();
//! let key = generate_key("password", &["Alice <alice@example.com>"], CipherSuite::default()).unwrap();
//! let fingerprint = store.import_secret_key(&key.secret_key).unwrap();
//! store.set_association("alice@example.com", &fingerprint).unwrap();
//!
//! // Rank and display
//! let mut workflow = KeyWorkflow::new(&store);
//! workflow.refresh().unwrap();
//! let detail = workflow.describe(&fingerprint).unwrap();
//! println!("{}: {}", detail.summary.status, detail.summary.formatted_fingerprint);
//!
//! // Back the key up; the passphrase is shown to the user once
//! let backup = workflow.backup(&fingerprint, &SetupMessageBackup).unwrap();
//! println!("passphrase: {}", backup.passphrase);
//!
//! // Restore it elsewhere
//! let other = KeyStore::open_in_memory().unwrap();
//! let importer = StoreImporter::new(&other).with_passcode(&backup.passphrase);
//! let other_workflow = KeyWorkflow::new(&other);
//! assert!(other_workflow.import_backup(&importer, backup.message.as_bytes()).unwrap());
//! ```
//!
//! ## Features
//!
//! - `keystore` (default): the SQLite-backed [`KeyStore`] and
//!   [`StoreImporter`] (requires `rusqlite`). Without it, the crate
//!   provides the workflow, codecs, and traits only, and callers bring
//!   their own store implementations.

// Modules
mod error;
mod internal;
mod types;

mod keygen;
mod setup_message;
mod workflow;

#[cfg(feature = "keystore")]
mod import;
#[cfg(feature = "keystore")]
pub mod keystore;

// Re-export error types
pub use error::{Error, Result};

// Re-export all public types
pub use types::{
    AutocryptAssociation, CipherSuite, GeneratedKey, ImportOutcome, KeyDetail, KeyStatus,
    KeySummary, MoreLabel, SecretKeyRecord, SetupMessage,
};

// Re-export the workflow and its collaborator seams
pub use workflow::{
    confirmation_token, AutocryptStore, BackupCodec, ConfirmationPrompt, ImportCodec, KeyWorkflow,
    SecretKeyStore,
};

// Re-export setup message functions
pub use setup_message::{
    create_setup_message, generate_passcode, is_setup_message, open_setup_message,
    open_setup_message_file, write_setup_message_file, SetupMessageBackup,
};

// Re-export key generation
pub use keygen::generate_key;

// Re-export store types when the feature is enabled
#[cfg(feature = "keystore")]
pub use import::StoreImporter;
#[cfg(feature = "keystore")]
pub use keystore::KeyStore;
