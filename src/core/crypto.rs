//! Symmetric payload encryption.
//!
//! Each envelope's payload is sealed with a fresh 256-bit data key using
//! AES-256-GCM. A random 12-byte nonce is prepended to the ciphertext:
//!
//! ```text
//! [ 12-byte nonce | ciphertext + 16-byte auth tag ]
//! ```

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use rand::RngCore;
use tracing::trace;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Data key length in bytes.
pub const KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;

/// A 256-bit data key, wiped from memory on drop.
pub struct DataKey(Zeroizing<[u8; KEY_LEN]>);

impl DataKey {
    /// Generate a key from the OS random number generator.
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        rand::rngs::OsRng.fill_bytes(&mut *key);
        Self(key)
    }

    /// Text form handed to wrap methods (URL-safe base64, padded).
    pub fn encoded(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(URL_SAFE.encode(&self.0[..]).into_bytes())
    }

    /// Parse the text form produced by [`DataKey::encoded`].
    ///
    /// Surrounding whitespace is ignored; wrapping tools may append a newline.
    pub fn from_encoded(text: &[u8]) -> Result<Self, CryptoError> {
        let text = text.trim_ascii();
        let decoded = Zeroizing::new(
            URL_SAFE
                .decode(text)
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?,
        );
        if decoded.len() != KEY_LEN {
            return Err(CryptoError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                decoded.len()
            )));
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(&decoded);
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DataKey(..)")
    }
}

/// Encrypt `plaintext` under `key`, returning `nonce || ciphertext`.
pub fn seal(plaintext: &[u8], key: &DataKey) -> Result<Vec<u8>, CryptoError> {
    trace!(plaintext_len = plaintext.len(), "sealing payload");

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt data produced by [`seal`].
///
/// Any authentication failure, including truncated input, is reported as
/// [`CryptoError::DecryptionFailed`].
pub fn open(sealed: &[u8], key: &DataKey) -> Result<Vec<u8>, CryptoError> {
    trace!(ciphertext_len = sealed.len(), "opening payload");

    if sealed.len() < NONCE_LEN {
        return Err(CryptoError::DecryptionFailed);
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}
