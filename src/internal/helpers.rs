//! Internal helper functions.

use std::io::Cursor;

use pgp::composed::{Deserializable, SignedPublicKey, SignedSecretKey};
use pgp::ser::Serialize;
use pgp::types::{KeyDetails, PublicKeyTrait};

use crate::error::{Error, Result};
use crate::types::SecretKeyRecord;

/// Parse a secret key from bytes (armored or binary).
pub(crate) fn parse_secret_key(data: &[u8]) -> Result<SignedSecretKey> {
    // Try armored first, then binary
    let cursor = Cursor::new(data);
    match SignedSecretKey::from_armor_single(cursor) {
        Ok((key, _headers)) => Ok(key),
        Err(_) => {
            let cursor = Cursor::new(data);
            SignedSecretKey::from_bytes(cursor).map_err(|e| Error::Parse(e.to_string()))
        }
    }
}

/// Serialize a secret key to binary format.
pub(crate) fn secret_key_to_bytes(key: &SignedSecretKey) -> Result<Vec<u8>> {
    key.to_bytes().map_err(|e| Error::Crypto(e.to_string()))
}

/// Serialize a public key to ASCII-armored format.
pub(crate) fn public_key_to_armored(key: &SignedPublicKey) -> Result<String> {
    key.to_armored_string(None.into())
        .map_err(|e| Error::Crypto(e.to_string()))
}

/// Get the fingerprint as a hex string (uppercase, no spaces).
pub(crate) fn fingerprint_to_hex(key: &impl KeyDetails) -> String {
    hex::encode_upper(key.fingerprint().as_bytes())
}

/// Convert a SystemTime to chrono DateTime.
pub(crate) fn system_time_to_datetime(st: std::time::SystemTime) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from(st)
}

/// Build a [`SecretKeyRecord`] from raw secret key material.
///
/// The record keeps the input bytes verbatim so that re-exporting a key
/// returns exactly what was imported.
pub(crate) fn record_from_key_bytes(data: &[u8]) -> Result<SecretKeyRecord> {
    let secret_key = parse_secret_key(data)?;
    let public_key = secret_key.signed_public_key();

    let fingerprint = fingerprint_to_hex(&public_key.primary_key);
    let user_ids: Vec<String> = public_key
        .details
        .users
        .iter()
        .map(|u| String::from_utf8_lossy(u.id.id()).to_string())
        .collect();
    let created_at = system_time_to_datetime((*public_key.primary_key.created_at()).into());

    Ok(SecretKeyRecord {
        fingerprint,
        user_ids,
        created_at,
        key_data: data.to_vec(),
    })
}

/// Group a hex fingerprint in blocks of four for human display.
pub(crate) fn format_fingerprint(fingerprint: &str) -> String {
    let mut out = String::with_capacity(fingerprint.len() + fingerprint.len() / 4);
    for (i, c) in fingerprint.chars().enumerate() {
        if i > 0 && i % 4 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

/// Extract the bare email address from a raw user ID.
///
/// User IDs usually look like "Name <addr@example.com>"; a bare address is
/// returned trimmed.
pub(crate) fn strip_email(user_id: &str) -> String {
    if let (Some(start), Some(end)) = (user_id.rfind('<'), user_id.rfind('>')) {
        if start < end {
            return user_id[start + 1..end].trim().to_string();
        }
    }
    user_id.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_fingerprint_groups_of_four() {
        assert_eq!(format_fingerprint("A1B2C3D4E5F6"), "A1B2 C3D4 E5F6");
        assert_eq!(format_fingerprint(""), "");
        assert_eq!(format_fingerprint("ABC"), "ABC");
    }

    #[test]
    fn test_strip_email_angle_brackets() {
        assert_eq!(strip_email("Alice <alice@example.com>"), "alice@example.com");
        assert_eq!(strip_email("<bob@example.com>"), "bob@example.com");
    }

    #[test]
    fn test_strip_email_bare_address() {
        assert_eq!(strip_email("  carol@example.com  "), "carol@example.com");
        assert_eq!(strip_email("no brackets here"), "no brackets here");
    }
}
