//! KeyStore implementation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::internal::{record_from_key_bytes, strip_email};
use crate::types::{AutocryptAssociation, SecretKeyRecord};
use crate::workflow::{AutocryptStore, SecretKeyStore};

use super::schema::init_schema;

/// SQLite-backed storage for secret keys and their Autocrypt associations.
///
/// # Database Schema
///
/// The store uses three tables:
/// - `secret_keys`: raw key material and creation time, keyed by fingerprint
/// - `user_ids`: per-key identity strings with extracted email addresses
/// - `autocrypt_settings`: the address-to-fingerprint association map
///
/// # Thread Safety
///
/// The `KeyStore` is not `Sync` due to the underlying SQLite connection.
/// For multi-threaded access, create a separate `KeyStore` instance per
/// thread or use external synchronization.
pub struct KeyStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl KeyStore {
    /// Open or create a key store at the given path.
    ///
    /// If the database file doesn't exist, it will be created with the
    /// appropriate schema. Parent directories must already exist.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;

        // Enable foreign keys
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        init_schema(&conn)?;

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Create an in-memory key store.
    ///
    /// Creates a temporary store that exists only in memory. Useful for
    /// testing or when persistence is not needed.
    ///
    /// # Example
    ///
    /// ```
    /// use keysteward::KeyStore;
    ///
    /// let store = KeyStore::open_in_memory().unwrap();
    /// assert!(store.path().is_none());
    /// assert_eq!(store.count().unwrap(), 0);
    /// ```
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        init_schema(&conn)?;

        Ok(Self { conn, path: None })
    }

    /// Import a secret key into the store.
    ///
    /// Parses the key material (armored or binary), stores it verbatim, and
    /// indexes its user IDs. If a key with the same fingerprint already
    /// exists, it is replaced.
    ///
    /// # Arguments
    /// * `key_data` - OpenPGP secret key material
    ///
    /// # Returns
    /// The fingerprint of the imported key.
    pub fn import_secret_key(&self, key_data: &[u8]) -> Result<String> {
        let record = record_from_key_bytes(key_data)?;

        // Upsert rather than REPLACE: replacing the row would fire the
        // delete cascade and drop the key's Autocrypt associations
        self.conn.execute(
            "INSERT INTO secret_keys (fingerprint, key_data, created_at, imported_at)
             VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
             ON CONFLICT(fingerprint) DO UPDATE SET
                 key_data = excluded.key_data,
                 imported_at = CURRENT_TIMESTAMP",
            params![
                &record.fingerprint,
                key_data,
                record.created_at.to_rfc3339(),
            ],
        )?;

        // Re-index user IDs
        self.conn.execute(
            "DELETE FROM user_ids WHERE fingerprint = ?1",
            params![&record.fingerprint],
        )?;
        for uid in &record.user_ids {
            let email = strip_email(uid);
            let email = if email.contains('@') { Some(email) } else { None };
            self.conn.execute(
                "INSERT OR IGNORE INTO user_ids (fingerprint, uid, email)
                 VALUES (?1, ?2, ?3)",
                params![&record.fingerprint, uid, email],
            )?;
        }

        Ok(record.fingerprint)
    }

    /// List all secret keys, ordered by fingerprint.
    pub fn list_secret_keys(&self) -> Result<Vec<SecretKeyRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT fingerprint, key_data, created_at FROM secret_keys ORDER BY fingerprint",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (fingerprint, key_data, created_at) = row?;
            records.push(SecretKeyRecord {
                user_ids: self.user_ids_for(&fingerprint)?,
                created_at: parse_stored_time(&created_at)?,
                fingerprint,
                key_data,
            });
        }

        Ok(records)
    }

    /// Get a single secret key by fingerprint.
    ///
    /// # Errors
    /// [`Error::KeyNotFound`] if no key with this fingerprint is stored.
    pub fn secret_key(&self, fingerprint: &str) -> Result<SecretKeyRecord> {
        let row = self
            .conn
            .query_row(
                "SELECT key_data, created_at FROM secret_keys WHERE fingerprint = ?1",
                params![fingerprint],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let (key_data, created_at) =
            row.ok_or_else(|| Error::KeyNotFound(fingerprint.to_string()))?;

        Ok(SecretKeyRecord {
            fingerprint: fingerprint.to_string(),
            user_ids: self.user_ids_for(fingerprint)?,
            created_at: parse_stored_time(&created_at)?,
            key_data,
        })
    }

    /// Check whether a key with this fingerprint is stored.
    pub fn contains(&self, fingerprint: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM secret_keys WHERE fingerprint = ?1",
            params![fingerprint],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Number of secret keys in the store.
    pub fn count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM secret_keys", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Delete a secret key and everything indexed under it.
    ///
    /// User-ID rows and Autocrypt associations referencing the key are
    /// removed by the schema's cascade rules.
    ///
    /// # Errors
    /// [`Error::KeyNotFound`] if no key with this fingerprint is stored.
    pub fn delete_secret_key(&self, fingerprint: &str) -> Result<()> {
        let affected = self.conn.execute(
            "DELETE FROM secret_keys WHERE fingerprint = ?1",
            params![fingerprint],
        )?;
        if affected == 0 {
            return Err(Error::KeyNotFound(fingerprint.to_string()));
        }
        Ok(())
    }

    /// Record `fingerprint` as the preferred key for `email`.
    ///
    /// An address maps to at most one key; a previous association for the
    /// same address is replaced.
    ///
    /// # Errors
    /// Fails if the fingerprint is not present in the store (the
    /// association map only references stored keys).
    pub fn set_association(&self, email: &str, fingerprint: &str) -> Result<()> {
        if !self.contains(fingerprint)? {
            return Err(Error::KeyNotFound(fingerprint.to_string()));
        }
        self.conn.execute(
            "INSERT OR REPLACE INTO autocrypt_settings (email, fingerprint, updated_at)
             VALUES (?1, ?2, CURRENT_TIMESTAMP)",
            params![email, fingerprint],
        )?;
        Ok(())
    }

    /// Remove the association for an address, if any.
    pub fn remove_association(&self, email: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM autocrypt_settings WHERE email = ?1",
            params![email],
        )?;
        Ok(())
    }

    /// All associations referencing a fingerprint, ordered by email.
    ///
    /// This ordering is what makes the first entry the "primary" used-for
    /// address in the derived view.
    pub fn associations_for(&self, fingerprint: &str) -> Result<Vec<AutocryptAssociation>> {
        let mut stmt = self.conn.prepare(
            "SELECT email, fingerprint FROM autocrypt_settings
             WHERE fingerprint = ?1 ORDER BY email",
        )?;
        let rows = stmt.query_map(params![fingerprint], |row| {
            Ok(AutocryptAssociation {
                email: row.get(0)?,
                fingerprint: row.get(1)?,
            })
        })?;

        let mut associations = Vec::new();
        for row in rows {
            associations.push(row?);
        }
        Ok(associations)
    }

    /// All associations in the store, ordered by email.
    pub fn list_associations(&self) -> Result<Vec<AutocryptAssociation>> {
        let mut stmt = self.conn.prepare(
            "SELECT email, fingerprint FROM autocrypt_settings ORDER BY email",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(AutocryptAssociation {
                email: row.get(0)?,
                fingerprint: row.get(1)?,
            })
        })?;

        let mut associations = Vec::new();
        for row in rows {
            associations.push(row?);
        }
        Ok(associations)
    }

    /// Path of the backing database file, or `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// User IDs for a fingerprint, in certificate order.
    fn user_ids_for(&self, fingerprint: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT uid FROM user_ids WHERE fingerprint = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![fingerprint], |row| row.get::<_, String>(0))?;

        let mut uids = Vec::new();
        for row in rows {
            uids.push(row?);
        }
        Ok(uids)
    }
}

/// Parse a timestamp stored as RFC 3339 text.
fn parse_stored_time(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("bad stored timestamp {:?}: {}", text, e)))
}

impl SecretKeyStore for KeyStore {
    fn list_secret_keys(&self) -> Result<Vec<SecretKeyRecord>> {
        KeyStore::list_secret_keys(self)
    }

    fn secret_key(&self, fingerprint: &str) -> Result<SecretKeyRecord> {
        KeyStore::secret_key(self, fingerprint)
    }

    fn delete_secret_key(&self, fingerprint: &str) -> Result<()> {
        KeyStore::delete_secret_key(self, fingerprint)
    }
}

impl AutocryptStore for KeyStore {
    fn associations_for(&self, fingerprint: &str) -> Result<Vec<AutocryptAssociation>> {
        KeyStore::associations_for(self, fingerprint)
    }
}
