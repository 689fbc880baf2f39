//! Credential decoding.
//!
//! # Responsibilities
//! - Resolve a credential reference (inline value or file path)
//! - Decode the credential envelope
//! - Decrypt passphrase-protected credentials
//!
//! # Format
//! A credential is URL-safe base64 (no padding) of a JSON envelope:
//! ```text
//! {"type":"plain","endpoint":"https://secrets.example.com","token":"..."}
//! {"type":"encrypted","salt":"..","nonce":"..","ciphertext":".."}
//! ```
//! The ciphertext of an encrypted envelope is AES-256-GCM over the JSON of
//! a plain envelope, keyed with Argon2id(passphrase, salt).

use std::fmt;
use std::path::Path;

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use argon2::Argon2;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use zeroize::Zeroizing;

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const SALT_SIZE: usize = 16;

/// Errors that can occur while loading a credential.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("could not read credential file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("credential is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("credential is malformed: {0}")]
    Malformed(String),

    #[error("credential endpoint is not a valid URL: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("credential is encrypted and requires a passphrase")]
    PassphraseRequired,

    #[error("credential could not be decrypted, check the passphrase")]
    Decryption,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
}

/// A decoded credential for the secret service.
#[derive(Clone)]
pub struct Credential {
    endpoint: Url,
    token: Zeroizing<String>,
}

impl Credential {
    pub fn new(endpoint: &str, token: impl Into<String>) -> Result<Self, CredentialError> {
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            token: Zeroizing::new(token.into()),
        })
    }

    /// Base URL of the secret service.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Bearer token presented to the secret service.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Encode as a plain credential string.
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.plain_json())
    }

    /// Encode as a passphrase-protected credential string.
    pub fn encrypt(&self, passphrase: &str) -> Result<String, CredentialError> {
        let mut salt = [0u8; SALT_SIZE];
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut nonce);

        let key = derive_key(passphrase, &salt)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice()));
        let plaintext = self.plain_json();
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|e| CredentialError::Malformed(format!("encryption failed: {e}")))?;

        let envelope = Envelope::Encrypted {
            salt: URL_SAFE_NO_PAD.encode(salt),
            nonce: URL_SAFE_NO_PAD.encode(nonce),
            ciphertext: URL_SAFE_NO_PAD.encode(ciphertext),
        };
        let json = serde_json::to_vec(&envelope)
            .map_err(|e| CredentialError::Malformed(e.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    fn plain_json(&self) -> Zeroizing<Vec<u8>> {
        let envelope = Envelope::Plain {
            endpoint: self.endpoint.to_string(),
            token: self.token.to_string(),
        };
        // Serializing two strings cannot fail.
        Zeroizing::new(serde_json::to_vec(&envelope).unwrap_or_default())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("endpoint", &self.endpoint.as_str())
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Envelope {
    Plain {
        endpoint: String,
        token: String,
    },
    Encrypted {
        salt: String,
        nonce: String,
        ciphertext: String,
    },
}

/// Load a credential from `reference`, which is either the path of a file
/// holding the credential or the credential itself.
pub fn load(reference: &str, passphrase: Option<&str>) -> Result<Credential, CredentialError> {
    let path = Path::new(reference);
    if path.is_file() {
        let contents = Zeroizing::new(std::fs::read_to_string(path).map_err(|source| {
            CredentialError::Io {
                path: path.display().to_string(),
                source,
            }
        })?);
        return decode(contents.trim(), passphrase);
    }
    decode(reference.trim(), passphrase)
}

/// Decode a credential string, decrypting it with `passphrase` if needed.
pub fn decode(encoded: &str, passphrase: Option<&str>) -> Result<Credential, CredentialError> {
    let raw = Zeroizing::new(URL_SAFE_NO_PAD.decode(encoded)?);
    match parse_envelope(&raw)? {
        Envelope::Plain { endpoint, token } => Credential::new(&endpoint, token),
        Envelope::Encrypted {
            salt,
            nonce,
            ciphertext,
        } => {
            let passphrase = passphrase
                .filter(|p| !p.is_empty())
                .ok_or(CredentialError::PassphraseRequired)?;
            let plaintext = decrypt(passphrase, &salt, &nonce, &ciphertext)?;
            match parse_envelope(&plaintext)? {
                Envelope::Plain { endpoint, token } => Credential::new(&endpoint, token),
                Envelope::Encrypted { .. } => Err(CredentialError::Malformed(
                    "encrypted credential contains another encrypted credential".into(),
                )),
            }
        }
    }
}

fn parse_envelope(raw: &[u8]) -> Result<Envelope, CredentialError> {
    serde_json::from_slice(raw).map_err(|e| CredentialError::Malformed(e.to_string()))
}

fn decrypt(
    passphrase: &str,
    salt: &str,
    nonce: &str,
    ciphertext: &str,
) -> Result<Zeroizing<Vec<u8>>, CredentialError> {
    let salt = URL_SAFE_NO_PAD.decode(salt)?;
    let nonce = URL_SAFE_NO_PAD.decode(nonce)?;
    let ciphertext = URL_SAFE_NO_PAD.decode(ciphertext)?;
    if nonce.len() != NONCE_SIZE {
        return Err(CredentialError::Malformed(format!(
            "nonce must be {NONCE_SIZE} bytes, got {}",
            nonce.len()
        )));
    }

    let key = derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice()));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
        .map_err(|_| CredentialError::Decryption)?;
    Ok(Zeroizing::new(plaintext))
}

fn derive_key(passphrase: &str, salt: &[u8]) -> Result<Zeroizing<[u8; KEY_SIZE]>, CredentialError> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
        .map_err(|e| CredentialError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample() -> Credential {
        Credential::new("https://secrets.example.com", "s3cr3t-token").unwrap()
    }

    #[test]
    fn test_plain_roundtrip() {
        let encoded = sample().encode();
        let decoded = decode(&encoded, None).unwrap();
        assert_eq!(decoded.endpoint().as_str(), "https://secrets.example.com/");
        assert_eq!(decoded.token(), "s3cr3t-token");
    }

    #[test]
    fn test_encrypted_credential_requires_correct_passphrase() {
        let encoded = sample().encrypt("correct horse").unwrap();

        assert!(matches!(decode(&encoded, None), Err(CredentialError::PassphraseRequired)));
        assert!(matches!(decode(&encoded, Some("")), Err(CredentialError::PassphraseRequired)));
        assert!(matches!(
            decode(&encoded, Some("wrong horse")),
            Err(CredentialError::Decryption)
        ));

        let decoded = decode(&encoded, Some("correct horse")).unwrap();
        assert_eq!(decoded.token(), "s3cr3t-token");
    }

    #[test]
    fn test_passphrase_is_ignored_for_plain_credentials() {
        let decoded = decode(&sample().encode(), Some("unused")).unwrap();
        assert_eq!(decoded.token(), "s3cr3t-token");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(decode("not base64 !!", None), Err(CredentialError::Encoding(_))));

        let not_json = URL_SAFE_NO_PAD.encode(b"hello");
        assert!(matches!(decode(&not_json, None), Err(CredentialError::Malformed(_))));

        let bad_url = URL_SAFE_NO_PAD.encode(br#"{"type":"plain","endpoint":"nope","token":"t"}"#);
        assert!(matches!(decode(&bad_url, None), Err(CredentialError::Endpoint(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample().encode()).unwrap();

        let decoded = load(file.path().to_str().unwrap(), None).unwrap();
        assert_eq!(decoded.token(), "s3cr3t-token");
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", sample());
        assert!(!debug.contains("s3cr3t-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
