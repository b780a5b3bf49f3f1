//! Error types for the keysteward library.
//!
//! This module provides a single error type covering all failure modes of
//! key management, backup, import, and removal operations.

use thiserror::Error;

/// The main error type for keysteward operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Requested key is not present in the current summaries or the store
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// The setup-message service could not produce a backup payload
    #[error("Backup failed: {0}")]
    BackupFailed(String),

    /// The key store failed to delete a secret key
    #[error("Failed to delete key {fingerprint}: {reason}")]
    DeleteFailed {
        /// Fingerprint of the key that could not be deleted
        fingerprint: String,
        /// Reason reported by the key store
        reason: String,
    },

    /// Attempted to forget a key that is still in active Autocrypt use
    #[error("Key {0} is in active use and cannot be forgotten")]
    KeyInUse(String),

    /// A removal is already pending; the workflow accepts one at a time
    #[error("Removal of key {0} is already in progress")]
    RemovalPending(String),

    /// A setup message was supplied without the passcode needed to open it
    #[error("A passcode is required to open this setup message")]
    PasscodeRequired,

    /// The passcode did not decrypt the setup message
    #[error("Invalid passcode for setup message")]
    InvalidPasscode,

    /// Certificate parsing failed
    #[error("Certificate parsing failed: {0}")]
    Parse(String),

    /// Cryptographic operation failed
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error (keystore feature)
    #[cfg(feature = "keystore")]
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// rpgp OpenPGP error
    #[error("OpenPGP error: {0}")]
    OpenPgp(#[from] pgp::errors::Error),

    /// Generic error from anyhow
    #[error("Error: {0}")]
    Generic(#[from] anyhow::Error),
}

/// A specialized Result type for keysteward operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Crypto(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Crypto(s.to_string())
    }
}
