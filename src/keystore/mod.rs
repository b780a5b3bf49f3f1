//! SQLite-backed storage for secret keys and Autocrypt associations.
//!
//! This module persists OpenPGP secret keys together with the Autocrypt
//! association map (which address each key is currently preferred for).
//! It backs both store seams the workflow consumes: the secret-key store
//! and the Autocrypt association store.
//!
//! # Basic Usage
//!
//! ```no_run
//! use keysteward::{KeyStore, generate_key, CipherSuite};
//!
//! // Open or create a store
//! let store = KeyStore::open("~/.myapp/keys.db").unwrap();
//!
//! // Generate and import a key
//! let key = generate_key("password", &["Alice <alice@example.com>"], CipherSuite::default()).unwrap();
//! let fingerprint = store.import_secret_key(&key.secret_key).unwrap();
//!
//! // Mark it as the preferred key for an address
//! store.set_association("alice@example.com", &fingerprint).unwrap();
//!
//! for record in store.list_secret_keys().unwrap() {
//!     println!("  {} - {:?}", record.fingerprint, record.user_ids);
//! }
//! ```

mod schema;
mod store;

pub use store::KeyStore;
