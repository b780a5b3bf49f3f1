//! Key generation.
//!
//! Generates the secret keys the store manages: a certifying/signing
//! primary key with one encryption subkey.

use pgp::composed::{KeyType, SecretKeyParamsBuilder, SubkeyParamsBuilder};
use pgp::crypto::ecc_curve::ECCCurve;
use rand::thread_rng;

use crate::error::{Error, Result};
use crate::internal::{fingerprint_to_hex, public_key_to_armored, secret_key_to_bytes};
use crate::types::{CipherSuite, GeneratedKey};

// rpgp type conversions

impl CipherSuite {
    fn primary_key_type(&self) -> KeyType {
        match self {
            CipherSuite::Cv25519 => KeyType::Ed25519Legacy,
            CipherSuite::Rsa2k => KeyType::Rsa(2048),
        }
    }

    fn encryption_key_type(&self) -> KeyType {
        match self {
            CipherSuite::Cv25519 => KeyType::ECDH(ECCCurve::Curve25519),
            CipherSuite::Rsa2k => KeyType::Rsa(2048),
        }
    }
}

/// Generate a new OpenPGP key pair.
///
/// # Arguments
/// * `password` - Password to protect the secret key (empty for none)
/// * `user_ids` - List of user IDs (e.g., "Name <email@example.com>")
/// * `suite` - Cipher suite to use
///
/// # Returns
/// The generated key with public key (armored), secret key (binary), and
/// fingerprint.
///
/// # Example
/// ```no_run
/// use keysteward::{generate_key, CipherSuite};
///
/// let key = generate_key("password", &["Alice <alice@example.com>"], CipherSuite::default()).unwrap();
/// println!("Fingerprint: {}", key.fingerprint);
/// ```
pub fn generate_key(
    password: &str,
    user_ids: &[&str],
    suite: CipherSuite,
) -> Result<GeneratedKey> {
    if user_ids.is_empty() {
        return Err(Error::InvalidInput(
            "At least one user ID is required".to_string(),
        ));
    }

    let mut rng = thread_rng();

    // Encryption subkey
    let mut enc_builder = SubkeyParamsBuilder::default();
    enc_builder
        .key_type(suite.encryption_key_type())
        .can_encrypt(true)
        .can_sign(false)
        .can_authenticate(false);
    if !password.is_empty() {
        enc_builder.passphrase(Some(password.to_string()));
    }
    let enc_subkey = enc_builder
        .build()
        .map_err(|e| Error::Crypto(e.to_string()))?;

    // Primary key params
    let mut key_params = SecretKeyParamsBuilder::default();
    key_params
        .key_type(suite.primary_key_type())
        .can_certify(true)
        .can_sign(true)
        .can_encrypt(false)
        .primary_user_id(user_ids[0].to_string());

    if user_ids.len() > 1 {
        let additional_uids: Vec<String> = user_ids[1..].iter().map(|s| s.to_string()).collect();
        key_params.user_ids(additional_uids);
    }

    if !password.is_empty() {
        key_params.passphrase(Some(password.to_string()));
    }

    key_params.subkeys(vec![enc_subkey]);

    // Generate the key
    let secret_key_params = key_params
        .build()
        .map_err(|e| Error::Crypto(e.to_string()))?;

    let secret_key = secret_key_params
        .generate(&mut rng)
        .map_err(|e| Error::Crypto(e.to_string()))?;

    let secret_key = secret_key
        .sign(&mut rng, &password.into())
        .map_err(|e| Error::Crypto(e.to_string()))?;

    let public_key = secret_key.signed_public_key();
    let public_key_armored = public_key_to_armored(&public_key)?;
    let fingerprint = fingerprint_to_hex(&public_key.primary_key);
    let secret_key_bytes = secret_key_to_bytes(&secret_key)?;

    Ok(GeneratedKey {
        public_key: public_key_armored,
        secret_key: secret_key_bytes,
        fingerprint,
    })
}
