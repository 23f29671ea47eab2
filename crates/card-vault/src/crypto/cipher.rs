//! AES-256-GCM-SIV escrow encryption and SHA-256 lookup hashing of card numbers.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) with a random 96-bit nonce
//! per call and a 128-bit tag. Because every call draws a fresh nonce, two
//! encryptions of the same card number never produce the same blob; the
//! searchable identity of a card is its lookup hash, not its ciphertext.

use aes_gcm_siv::{
    aead::{Aead, KeyInit, OsRng},
    Aes256GcmSiv, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::key::SecretKey;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the authentication tag (16 bytes = 128 bits).
pub const TAG_LEN: usize = 16;

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key could not be loaded into the AEAD.
    #[error("invalid key length")]
    InvalidKeyLength,

    /// AES-GCM-SIV encryption failed, or decryption failed to authenticate.
    #[error("aead operation failed")]
    AeadFailure,

    /// The blob is not valid base64 or is too short to hold a nonce and tag.
    #[error("invalid ciphertext blob format")]
    InvalidFormat,

    /// The decrypted bytes are not valid UTF-8.
    #[error("decrypted payload is not valid UTF-8")]
    InvalidUtf8,
}

/// A decoded ciphertext blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext + authentication tag bytes.
    pub ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    /// Encode as base64 of `nonce || ciphertext || tag`.
    pub fn encode(&self) -> String {
        let mut combined = Vec::with_capacity(NONCE_LEN + self.ciphertext.len());
        combined.extend_from_slice(&self.nonce);
        combined.extend_from_slice(&self.ciphertext);
        STANDARD.encode(combined)
    }

    /// Split an encoded blob back into nonce and ciphertext.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidFormat`] if the string is not base64 or the
    /// decoded bytes are shorter than a nonce plus a tag.
    pub fn decode(s: &str) -> Result<Self, CipherError> {
        let combined = STANDARD
            .decode(s.trim())
            .map_err(|_| CipherError::InvalidFormat)?;
        if combined.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::InvalidFormat);
        }
        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);
        Ok(Self {
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Encrypts, decrypts and hashes card numbers under a single immutable key.
///
/// Safe to share across threads behind an `Arc`; no method takes `&mut self`.
#[derive(Debug)]
pub struct CipherEngine {
    key: SecretKey,
}

impl CipherEngine {
    /// Build an engine around an already-derived key.
    pub fn new(key: SecretKey) -> Self {
        Self { key }
    }

    /// Encrypt `plain_text` and return the encoded blob.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::AeadFailure`] on an internal AEAD error (should be
    /// unreachable with a valid key and nonce).
    pub fn encrypt(&self, plain_text: &str) -> Result<String, CipherError> {
        let cipher = self.build_cipher()?;

        use aes_gcm_siv::aead::rand_core::RngCore;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plain_text.as_bytes())
            .map_err(|_| CipherError::AeadFailure)?;

        Ok(EncryptedBlob {
            nonce: nonce_bytes,
            ciphertext,
        }
        .encode())
    }

    /// Decrypt an encoded blob back to the original text.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidFormat`] for a malformed blob and
    /// [`CipherError::AeadFailure`] if the tag does not verify (wrong key or
    /// tampered data).
    // Only the out-of-band recovery process reads escrowed payloads back.
    #[allow(dead_code)]
    pub fn decrypt(&self, blob: &str) -> Result<String, CipherError> {
        let blob = EncryptedBlob::decode(blob)?;
        let cipher = self.build_cipher()?;
        let plain = cipher
            .decrypt(Nonce::from_slice(&blob.nonce), blob.ciphertext.as_ref())
            .map_err(|_| CipherError::AeadFailure)?;
        String::from_utf8(plain).map_err(|_| CipherError::InvalidUtf8)
    }

    /// SHA-256 of the UTF-8 bytes of `plain_text` as 64 lowercase hex chars.
    pub fn hash(&self, plain_text: &str) -> String {
        hex::encode(Sha256::digest(plain_text.as_bytes()))
    }

    fn build_cipher(&self) -> Result<Aes256GcmSiv, CipherError> {
        Aes256GcmSiv::new_from_slice(self.key.as_bytes()).map_err(|_| CipherError::InvalidKeyLength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(secret: &str) -> CipherEngine {
        CipherEngine::new(SecretKey::derive(secret).unwrap())
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let engine = engine("test-secret");
        for card in ["4456897922969999", "4111111111111", "4456897999999999124"] {
            let blob = engine.encrypt(card).unwrap();
            assert_eq!(engine.decrypt(&blob).unwrap(), card);
        }
    }

    #[test]
    fn same_plaintext_encrypts_differently() {
        let engine = engine("test-secret");
        let a = engine.encrypt("4456897922969999").unwrap();
        let b = engine.encrypt("4456897922969999").unwrap();
        assert_ne!(a, b);
        assert_eq!(engine.decrypt(&a).unwrap(), engine.decrypt(&b).unwrap());
    }

    #[test]
    fn blob_layout_is_nonce_ciphertext_tag() {
        let engine = engine("test-secret");
        let card = "4456897922969999";
        let blob = engine.encrypt(card).unwrap();
        let raw = STANDARD.decode(&blob).unwrap();
        assert_eq!(raw.len(), NONCE_LEN + card.len() + TAG_LEN);
    }

    #[test]
    fn ciphertext_does_not_contain_plaintext() {
        let engine = engine("test-secret");
        let blob = engine.encrypt("4456897922969999").unwrap();
        assert!(!blob.contains("4456897922969999"));
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let blob = engine("secret-one").encrypt("4456897922969999").unwrap();
        assert!(matches!(
            engine("secret-two").decrypt(&blob),
            Err(CipherError::AeadFailure)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let engine = engine("test-secret");
        let blob = engine.encrypt("tamper me").unwrap();
        let mut raw = STANDARD.decode(&blob).unwrap();
        raw[NONCE_LEN] ^= 0xFF;
        let tampered = STANDARD.encode(raw);
        assert!(matches!(
            engine.decrypt(&tampered),
            Err(CipherError::AeadFailure)
        ));
    }

    #[test]
    fn tampered_nonce_fails_auth() {
        let engine = engine("test-secret");
        let blob = engine.encrypt("4456897922969999").unwrap();
        let mut raw = STANDARD.decode(&blob).unwrap();
        raw[0] ^= 0x01;
        assert!(engine.decrypt(&STANDARD.encode(raw)).is_err());
    }

    #[test]
    fn rejects_bad_base64() {
        assert!(matches!(
            engine("k").decrypt("!!!not base64!!!"),
            Err(CipherError::InvalidFormat)
        ));
    }

    #[test]
    fn rejects_truncated_blob() {
        let short = STANDARD.encode([0u8; NONCE_LEN + TAG_LEN - 1]);
        assert!(matches!(
            engine("k").decrypt(&short),
            Err(CipherError::InvalidFormat)
        ));
    }

    #[test]
    fn blob_decode_splits_nonce() {
        let blob = EncryptedBlob {
            nonce: [7u8; NONCE_LEN],
            ciphertext: vec![1u8; TAG_LEN + 4],
        };
        let decoded = EncryptedBlob::decode(&blob.encode()).unwrap();
        assert_eq!(decoded, blob);
    }

    #[test]
    fn hash_is_deterministic_lowercase_hex() {
        let engine = engine("test-secret");
        let a = engine.hash("4456897922969999");
        let b = engine.hash("4456897922969999");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn hash_is_key_independent_sha256() {
        assert_eq!(
            engine("one").hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(engine("one").hash("abc"), engine("two").hash("abc"));
    }

    #[test]
    fn distinct_cards_hash_differently() {
        let engine = engine("test-secret");
        assert_ne!(
            engine.hash("4456897922969999"),
            engine.hash("4456897999999999")
        );
    }

    #[test]
    fn concurrent_encryptions_never_share_a_nonce() {
        use std::collections::HashSet;
        use std::sync::Arc;

        let engine = Arc::new(engine("test-secret"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| {
                            let blob = engine.encrypt("4456897922969999").unwrap();
                            EncryptedBlob::decode(&blob).unwrap().nonce
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for nonce in handle.join().unwrap() {
                assert!(seen.insert(nonce), "nonce reused");
            }
        }
        assert_eq!(seen.len(), 400);
    }
}
