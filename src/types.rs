//! Public type definitions for the keysteward library.
//!
//! This module contains the data structures used throughout the library for
//! representing secret keys, their Autocrypt associations, and the derived
//! display model the workflow hands to a UI layer.

use chrono::{DateTime, Utc};

/// A secret key as returned by the key store.
///
/// Records are read-only to the workflow; all mutation happens through the
/// store that owns them.
#[derive(Debug, Clone)]
pub struct SecretKeyRecord {
    /// Primary key fingerprint as canonical uppercase hex
    pub fingerprint: String,
    /// User IDs in certificate order (e.g., "Alice <alice@example.com>")
    pub user_ids: Vec<String>,
    /// When the key was created
    pub created_at: DateTime<Utc>,
    /// The OpenPGP secret key material (armored or binary)
    pub key_data: Vec<u8>,
}

/// A single Autocrypt association: an email address mapped to the
/// fingerprint of the key currently preferred for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutocryptAssociation {
    /// Fingerprint of the associated secret key
    pub fingerprint: String,
    /// Address this fingerprint is currently preferred for
    pub email: String,
}

/// Display status of a key within the current refresh cycle.
///
/// `Active` and `Archived` are derived from the Autocrypt associations;
/// `Removing` and `RemovalFailed` are transient workflow-local states set
/// during the two-phase forget operation. They never reach the backing
/// store and do not survive a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    /// At least one Autocrypt association references this key
    Active,
    /// No association references this key
    Archived,
    /// A forget operation has been accepted but not yet completed
    Removing,
    /// The store failed to delete this key
    RemovalFailed,
}

impl KeyStatus {
    /// Human-readable status label.
    pub fn label(&self) -> &'static str {
        match self {
            KeyStatus::Active => "Active",
            KeyStatus::Archived => "Archived",
            KeyStatus::Removing => "Removing",
            KeyStatus::RemovalFailed => "Removal failed",
        }
    }
}

impl std::fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Derived, display-ready view of one secret key.
///
/// Summaries exist only within one refresh cycle. Any action that changes
/// the backing stores invalidates the whole list; the workflow re-derives
/// rather than patching a stale summary in place.
#[derive(Debug, Clone)]
pub struct KeySummary {
    /// Primary key fingerprint, canonical uppercase hex
    pub fingerprint: String,
    /// Fingerprint grouped in blocks of four for human display
    pub formatted_fingerprint: String,
    /// Key creation time
    pub created_at: DateTime<Utc>,
    /// Creation date for list display (e.g., "2020-01-01")
    pub created_display: String,
    /// Full creation timestamp for detail display
    pub created_full_display: String,
    /// First address this key is actively used for, by store ordering
    pub used_for: Option<String>,
    /// All addresses this key is actively used for, one per association
    pub used_for_all: Vec<String>,
    /// Lexicographically smallest email extracted from the user IDs
    pub created_for: Option<String>,
    /// All emails extracted from the user IDs, sorted ascending
    pub created_for_all: Vec<String>,
    /// True iff at least one Autocrypt association references this key
    pub is_active: bool,
    /// Current display status
    pub status: KeyStatus,
}

impl KeySummary {
    /// The "used for" address, or the "None" sentinel for display.
    pub fn used_for_label(&self) -> &str {
        self.used_for.as_deref().unwrap_or("None")
    }

    /// The "created for" address, or the "None" sentinel for display.
    pub fn created_for_label(&self) -> &str {
        self.created_for.as_deref().unwrap_or("None")
    }
}

/// An "and N more" overflow label with the full list as tooltip text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoreLabel {
    /// Short label, e.g. "and 2 more"
    pub label: String,
    /// The complete address list, newline-joined
    pub tooltip: String,
}

/// Detail view of a selected key, as produced by
/// [`describe`](crate::KeyWorkflow::describe).
#[derive(Debug, Clone)]
pub struct KeyDetail {
    /// The summary this detail was derived from
    pub summary: KeySummary,
    /// Overflow label when the key is used for more than one address
    pub used_for_more: Option<MoreLabel>,
    /// Overflow label when the key was created for more than one address
    pub created_for_more: Option<MoreLabel>,
}

/// An encrypted key backup produced by the setup-message codec.
#[derive(Debug, Clone)]
pub struct SetupMessage {
    /// ASCII-armored setup message payload
    pub message: String,
    /// Human-presentable passphrase in numeric9x4 format
    pub passphrase: String,
}

/// Outcome of an import attempt.
///
/// An unrecognized payload is a normal, expected outcome (the user picked
/// the wrong file), not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The payload was recognized and the key persisted
    Imported {
        /// Fingerprint of the imported key
        fingerprint: String,
    },
    /// The payload matched neither recognized format
    Unrecognized,
}

impl ImportOutcome {
    /// True if a key was imported.
    pub fn is_imported(&self) -> bool {
        matches!(self, ImportOutcome::Imported { .. })
    }
}

/// Cipher suite options for key generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CipherSuite {
    /// Curve25519 (EdDSA for signing, ECDH for encryption)
    #[default]
    Cv25519,
    /// RSA with 2048-bit keys
    Rsa2k,
}

impl CipherSuite {
    /// Get a human-readable name for the cipher suite.
    pub fn name(&self) -> &'static str {
        match self {
            CipherSuite::Cv25519 => "Curve25519",
            CipherSuite::Rsa2k => "RSA 2048",
        }
    }
}

/// Result of key generation.
#[derive(Debug)]
pub struct GeneratedKey {
    /// ASCII-armored public key
    pub public_key: String,
    /// Binary secret key data
    pub secret_key: Vec<u8>,
    /// Key fingerprint as hex string
    pub fingerprint: String,
}
