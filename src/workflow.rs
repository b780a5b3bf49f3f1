//! Key ranking, selection, and the backup/import/forget state machine.
//!
//! [`KeyWorkflow`] pulls secret keys and their Autocrypt associations from
//! the backing stores, derives a display-ready [`KeySummary`] list ranked
//! with active keys first, and drives the actions a key-management screen
//! offers: select a key, back it up to an encrypted setup message, import
//! a backup, and forget (delete) an archived key with a confirmation step.
//!
//! The workflow consumes its collaborators through the narrow traits
//! defined here; it contains no cryptographic, parsing, or storage logic
//! of its own.
//!
//! Operations mutate `&mut self` in place, so the borrow checker enforces
//! the one-operation-at-a-time contract for a single workflow instance.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::internal::{format_fingerprint, strip_email};
use crate::types::{
    AutocryptAssociation, ImportOutcome, KeyDetail, KeyStatus, KeySummary, MoreLabel,
    SecretKeyRecord, SetupMessage,
};

/// Read and delete access to stored secret keys.
pub trait SecretKeyStore {
    /// All secret keys, in the store's canonical order.
    fn list_secret_keys(&self) -> Result<Vec<SecretKeyRecord>>;

    /// A single secret key by fingerprint.
    fn secret_key(&self, fingerprint: &str) -> Result<SecretKeyRecord>;

    /// Delete a secret key.
    fn delete_secret_key(&self, fingerprint: &str) -> Result<()>;
}

/// Read access to the Autocrypt association map.
pub trait AutocryptStore {
    /// Associations referencing a fingerprint, in the store's ordering.
    ///
    /// The first entry becomes the primary "used for" address of the
    /// derived summary.
    fn associations_for(&self, fingerprint: &str) -> Result<Vec<AutocryptAssociation>>;
}

/// Produces encrypted key backups.
pub trait BackupCodec {
    /// Encrypt `record` into a setup message with a fresh passphrase.
    fn create_backup(&self, record: &SecretKeyRecord) -> Result<SetupMessage>;
}

/// Recognizes and persists key backup payloads.
pub trait ImportCodec {
    /// Import a payload, reporting whether its format was recognized.
    fn import(&self, raw: &[u8]) -> Result<ImportOutcome>;
}

/// Asks the user to confirm a destructive action by typing a token.
pub trait ConfirmationPrompt {
    /// Present the expected token and return whether the user confirmed.
    fn ask(&self, expected_token: &str) -> bool;
}

impl<T: SecretKeyStore + ?Sized> SecretKeyStore for &T {
    fn list_secret_keys(&self) -> Result<Vec<SecretKeyRecord>> {
        (**self).list_secret_keys()
    }

    fn secret_key(&self, fingerprint: &str) -> Result<SecretKeyRecord> {
        (**self).secret_key(fingerprint)
    }

    fn delete_secret_key(&self, fingerprint: &str) -> Result<()> {
        (**self).delete_secret_key(fingerprint)
    }
}

impl<T: AutocryptStore + ?Sized> AutocryptStore for &T {
    fn associations_for(&self, fingerprint: &str) -> Result<Vec<AutocryptAssociation>> {
        (**self).associations_for(fingerprint)
    }
}

/// Derive the confirmation token for forgetting a key: the last four
/// characters of the fingerprint, lowercased.
///
/// A low-friction guard against accidental deletion, not a security
/// boundary.
///
/// # Example
/// ```
/// assert_eq!(keysteward::confirmation_token("A1B2C3D4E5F6"), "e5f6");
/// ```
pub fn confirmation_token(fingerprint: &str) -> String {
    let chars: Vec<char> = fingerprint.chars().collect();
    let start = chars.len().saturating_sub(4);
    chars[start..].iter().collect::<String>().to_lowercase()
}

/// The key management workflow.
///
/// Holds the current summary list and selection. Summaries are rebuilt on
/// every [`refresh`](Self::refresh); any action that changes the backing
/// stores invalidates the list, and the workflow re-derives instead of
/// patching stale entries.
///
/// # Example
///
/// ```no_run
/// use keysteward::{KeyStore, KeyWorkflow, SetupMessageBackup};
///
/// let store = KeyStore::open("keys.db").unwrap();
/// let mut workflow = KeyWorkflow::new(&store);
///
/// workflow.refresh().unwrap();
/// for summary in workflow.summaries() {
///     println!("{} {} {}", summary.status, summary.formatted_fingerprint, summary.created_display);
/// }
///
/// // Select the first key and back it up
/// let fingerprint = workflow.summaries()[0].fingerprint.clone();
/// let detail = workflow.describe(&fingerprint).unwrap();
/// let backup = workflow.backup(&fingerprint, &SetupMessageBackup).unwrap();
/// println!("passphrase: {}", backup.passphrase);
/// # let _ = detail;
/// ```
pub struct KeyWorkflow<S> {
    store: S,
    summaries: Vec<KeySummary>,
    selected: Option<String>,
    pending_removal: Option<String>,
}

impl<S: SecretKeyStore + AutocryptStore> KeyWorkflow<S> {
    /// Create a workflow over the given store.
    ///
    /// The summary list starts empty; call [`refresh`](Self::refresh)
    /// before rendering.
    pub fn new(store: S) -> Self {
        Self {
            store,
            summaries: Vec::new(),
            selected: None,
            pending_removal: None,
        }
    }

    /// Rebuild the summary list from the backing stores.
    ///
    /// Association lookups follow the key order returned by the store;
    /// the derived summaries are then sorted with active keys first and
    /// ascending creation time within each group. The selection and any
    /// pending-removal bookkeeping are cleared.
    ///
    /// Calling this twice with unchanged stores yields an identical
    /// ordered sequence.
    pub fn refresh(&mut self) -> Result<&[KeySummary]> {
        debug!("refreshing key list");

        let records = self.store.list_secret_keys()?;

        let mut summaries = Vec::with_capacity(records.len());
        for record in &records {
            let associations = self.store.associations_for(&record.fingerprint)?;
            summaries.push(derive_summary(record, &associations));
        }

        // Fingerprint as final tie-break keeps the order total, so equal
        // creation times cannot reorder between refreshes
        summaries.sort_by(|a, b| {
            b.is_active
                .cmp(&a.is_active)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
        });

        self.summaries = summaries;
        self.selected = None;
        self.pending_removal = None;

        Ok(&self.summaries)
    }

    /// The current summary list, in display order.
    pub fn summaries(&self) -> &[KeySummary] {
        &self.summaries
    }

    /// The currently selected summary, if any.
    pub fn selected(&self) -> Option<&KeySummary> {
        let fingerprint = self.selected.as_deref()?;
        self.summary(fingerprint)
    }

    /// Access the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Select a key and build its detail view.
    ///
    /// # Errors
    /// [`Error::KeyNotFound`] when the fingerprint is absent from the
    /// current summaries (stale selection after an external mutation).
    pub fn describe(&mut self, fingerprint: &str) -> Result<KeyDetail> {
        debug!(%fingerprint, "describing key");

        let summary = self
            .summary(fingerprint)
            .cloned()
            .ok_or_else(|| Error::KeyNotFound(fingerprint.to_string()))?;

        self.selected = Some(summary.fingerprint.clone());

        Ok(KeyDetail {
            used_for_more: more_label(&summary.used_for_all),
            created_for_more: more_label(&summary.created_for_all),
            summary,
        })
    }

    /// Whether the backup action is available: a selection exists.
    pub fn can_backup(&self) -> bool {
        self.selected().is_some()
    }

    /// Whether the forget action is available.
    ///
    /// A key in active Autocrypt use must not be deleted without first
    /// being deactivated elsewhere; removal is restricted to archived
    /// keys.
    pub fn can_forget(&self) -> bool {
        match self.selected() {
            Some(summary) => !summary.is_active && summary.status != KeyStatus::Removing,
            None => false,
        }
    }

    /// Back up the selected key to an encrypted setup message.
    ///
    /// Has no effect on the summary list.
    ///
    /// # Errors
    /// [`Error::KeyNotFound`] when the fingerprint is absent,
    /// [`Error::InvalidInput`] when it is not the current selection, and
    /// [`Error::BackupFailed`] from the codec, propagated without retry.
    pub fn backup(&self, fingerprint: &str, codec: &impl BackupCodec) -> Result<SetupMessage> {
        if self.summary(fingerprint).is_none() {
            return Err(Error::KeyNotFound(fingerprint.to_string()));
        }
        if self.selected.as_deref() != Some(fingerprint) {
            return Err(Error::InvalidInput(format!(
                "key {} is not the current selection",
                fingerprint
            )));
        }

        debug!(%fingerprint, "creating key backup");
        let record = self.store.secret_key(fingerprint)?;
        codec.create_backup(&record)
    }

    /// Import a key backup or raw key payload.
    ///
    /// Returns `Ok(true)` when a key was imported - the caller must
    /// [`refresh`](Self::refresh) afterwards (the workflow does not do it
    /// internally, so the caller controls timing and UI feedback).
    /// Returns `Ok(false)` when the payload matched no recognized format;
    /// nothing changed.
    pub fn import_backup(&self, codec: &impl ImportCodec, raw: &[u8]) -> Result<bool> {
        debug!(len = raw.len(), "importing key backup");

        match codec.import(raw)? {
            ImportOutcome::Imported { fingerprint } => {
                debug!(%fingerprint, "import succeeded, caller should refresh");
                Ok(true)
            }
            ImportOutcome::Unrecognized => {
                // Expected outcome when the user picks the wrong file
                debug!("import content not recognized");
                Ok(false)
            }
        }
    }

    /// Phase one of forgetting a key.
    ///
    /// Marks the summary as [`KeyStatus::Removing`] and clears the
    /// selection, so the UI shows immediate feedback and no further
    /// action can target the key. The store is not touched until
    /// [`complete_removal`](Self::complete_removal).
    ///
    /// The caller is responsible for having confirmed the action first
    /// (see [`forget_confirmed`](Self::forget_confirmed) and
    /// [`confirmation_token`]).
    ///
    /// # Errors
    /// [`Error::KeyNotFound`] for unknown fingerprints,
    /// [`Error::KeyInUse`] for active keys, and
    /// [`Error::RemovalPending`] when a removal is already pending.
    pub fn forget(&mut self, fingerprint: &str) -> Result<()> {
        debug!(%fingerprint, "forget requested");

        if let Some(pending) = &self.pending_removal {
            return Err(Error::RemovalPending(pending.clone()));
        }

        let summary = self
            .summary_mut(fingerprint)
            .ok_or_else(|| Error::KeyNotFound(fingerprint.to_string()))?;
        if summary.is_active {
            return Err(Error::KeyInUse(fingerprint.to_string()));
        }
        summary.status = KeyStatus::Removing;

        self.selected = None;
        self.pending_removal = Some(fingerprint.to_string());

        Ok(())
    }

    /// Phase two of forgetting a key: delete it from the store, then
    /// refresh.
    ///
    /// On failure the summary is marked [`KeyStatus::RemovalFailed`] and
    /// the error is propagated - the workflow never silently reverts to
    /// the pre-delete state, which would mask a failed destructive
    /// operation as success.
    pub fn complete_removal(&mut self) -> Result<()> {
        let fingerprint = self
            .pending_removal
            .take()
            .ok_or_else(|| Error::InvalidInput("no removal is pending".to_string()))?;

        debug!(fingerprint = %fingerprint, "completing removal");

        match self.store.delete_secret_key(&fingerprint) {
            Ok(()) => {
                self.refresh()?;
                Ok(())
            }
            Err(e) => {
                warn!(fingerprint = %fingerprint, error = %e, "key deletion failed");
                let reason = e.to_string();
                if let Some(summary) = self.summary_mut(&fingerprint) {
                    summary.status = KeyStatus::RemovalFailed;
                }
                Err(Error::DeleteFailed {
                    fingerprint,
                    reason,
                })
            }
        }
    }

    /// Ask for confirmation, then start forgetting the key.
    ///
    /// Returns whether the user confirmed; when they did, the key is in
    /// [`KeyStatus::Removing`] state and
    /// [`complete_removal`](Self::complete_removal) performs the
    /// deletion.
    pub fn forget_confirmed(
        &mut self,
        fingerprint: &str,
        prompt: &impl ConfirmationPrompt,
    ) -> Result<bool> {
        let token = confirmation_token(fingerprint);
        if !prompt.ask(&token) {
            debug!(%fingerprint, "forget not confirmed");
            return Ok(false);
        }

        self.forget(fingerprint)?;
        Ok(true)
    }

    fn summary(&self, fingerprint: &str) -> Option<&KeySummary> {
        self.summaries.iter().find(|s| s.fingerprint == fingerprint)
    }

    fn summary_mut(&mut self, fingerprint: &str) -> Option<&mut KeySummary> {
        self.summaries
            .iter_mut()
            .find(|s| s.fingerprint == fingerprint)
    }
}

/// Derive the display summary for one key.
fn derive_summary(record: &SecretKeyRecord, associations: &[AutocryptAssociation]) -> KeySummary {
    let used_for_all: Vec<String> = associations.iter().map(|a| a.email.clone()).collect();
    let used_for = used_for_all.first().cloned();

    let mut created_for_all: Vec<String> =
        record.user_ids.iter().map(|uid| strip_email(uid)).collect();
    created_for_all.sort();
    let created_for = created_for_all.first().cloned();

    let is_active = !used_for_all.is_empty();

    KeySummary {
        fingerprint: record.fingerprint.clone(),
        formatted_fingerprint: format_fingerprint(&record.fingerprint),
        created_at: record.created_at,
        created_display: record.created_at.format("%Y-%m-%d").to_string(),
        created_full_display: record.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        used_for,
        used_for_all,
        created_for,
        created_for_all,
        is_active,
        status: if is_active {
            KeyStatus::Active
        } else {
            KeyStatus::Archived
        },
    }
}

/// Build the "and N more" overflow label for a list with more than one
/// entry.
fn more_label(all: &[String]) -> Option<MoreLabel> {
    if all.len() > 1 {
        Some(MoreLabel {
            label: format!("and {} more", all.len() - 1),
            tooltip: all.join("\n"),
        })
    } else {
        None
    }
}
