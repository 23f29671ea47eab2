//! [`SecretKey`]: the process-wide symmetric key derived from the operator secret.

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Errors produced while deriving the key.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The configured secret is absent or whitespace only.
    #[error("encryption secret must not be empty")]
    EmptySecret,
}

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// Built once at startup and owned by the [`super::CipherEngine`]. When this
/// type is dropped, the memory is overwritten with zeroes.
pub struct SecretKey(Box<[u8; KEY_LEN]>);

impl SecretKey {
    /// Derive the key as the SHA-256 digest of the UTF-8 bytes of `secret`.
    ///
    /// The same secret always yields the same key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::EmptySecret`] if `secret` is empty or blank.
    pub fn derive(secret: &str) -> Result<Self, KeyError> {
        if secret.trim().is_empty() {
            return Err(KeyError::EmptySecret);
        }
        let digest = Sha256::digest(secret.as_bytes());
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(&digest);
        Ok(Self(buf))
    }

    /// Borrow the raw key bytes.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("SecretKey([REDACTED])")
    }
}
