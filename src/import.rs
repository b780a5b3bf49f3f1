//! Import of key backups and raw secret keys.
//!
//! The importer recognizes two payload formats: Autocrypt Setup Messages
//! (which need the passcode shown when the backup was created) and raw
//! OpenPGP secret keys, armored or binary. Anything else is reported as
//! unrecognized - a normal outcome when the user picks the wrong file,
//! not an error.

use tracing::debug;

use crate::error::{Error, Result};
use crate::internal::parse_secret_key;
use crate::keystore::KeyStore;
use crate::setup_message::{is_setup_message, open_setup_message};
use crate::types::ImportOutcome;
use crate::workflow::ImportCodec;

/// Importer that persists recognized payloads into a [`KeyStore`].
///
/// # Example
///
/// ```no_run
/// use keysteward::{ImportOutcome, KeyStore, StoreImporter};
///
/// let store = KeyStore::open_in_memory().unwrap();
/// let content = std::fs::read("backup.htm").unwrap();
///
/// let importer = StoreImporter::new(&store).with_passcode("1234-...-5678");
/// match importer.import_content(&content).unwrap() {
///     ImportOutcome::Imported { fingerprint } => println!("imported {}", fingerprint),
///     ImportOutcome::Unrecognized => println!("file format could not be recognized"),
/// }
/// ```
pub struct StoreImporter<'a> {
    store: &'a KeyStore,
    passcode: Option<String>,
}

impl<'a> StoreImporter<'a> {
    /// Create an importer writing into the given store.
    pub fn new(store: &'a KeyStore) -> Self {
        Self {
            store,
            passcode: None,
        }
    }

    /// Supply the passcode used for setup-message payloads.
    pub fn with_passcode(mut self, passcode: impl Into<String>) -> Self {
        self.passcode = Some(passcode.into());
        self
    }

    /// Recognize and import a payload.
    ///
    /// # Returns
    /// [`ImportOutcome::Imported`] with the key's fingerprint, or
    /// [`ImportOutcome::Unrecognized`] with no state change.
    ///
    /// # Errors
    /// [`Error::PasscodeRequired`] when a setup message is recognized but
    /// no passcode was supplied; [`Error::InvalidPasscode`] when the
    /// supplied one does not decrypt it.
    pub fn import_content(&self, raw: &[u8]) -> Result<ImportOutcome> {
        if is_setup_message(raw) {
            let passcode = self.passcode.as_deref().ok_or(Error::PasscodeRequired)?;
            let key_data = open_setup_message(raw, passcode)?;
            let fingerprint = self.store.import_secret_key(&key_data)?;
            debug!(%fingerprint, "imported key from setup message");
            return Ok(ImportOutcome::Imported { fingerprint });
        }

        if parse_secret_key(raw).is_ok() {
            let fingerprint = self.store.import_secret_key(raw)?;
            debug!(%fingerprint, "imported raw secret key");
            return Ok(ImportOutcome::Imported { fingerprint });
        }

        debug!("import content matched no recognized format");
        Ok(ImportOutcome::Unrecognized)
    }
}

impl ImportCodec for StoreImporter<'_> {
    fn import(&self, raw: &[u8]) -> Result<ImportOutcome> {
        self.import_content(raw)
    }
}
