//! Card number protection: one-way lookup hashing and AEAD escrow encryption.
//!
//! This module is intentionally free of storage and HTTP dependencies.
//!
//! # Ciphertext format
//!
//! ```text
//! base64(nonce[12] || ciphertext || tag[16])
//! ```
//!
//! # Security invariants
//!
//! - The derived key is immutable once built and is never logged or traced.
//! - Every encryption draws a fresh nonce from the OS CSPRNG.
//! - Lookup hashes are SHA-256 over the normalised card number and are only
//!   ever compared, never reversed.

pub mod cipher;
pub mod key;

pub use cipher::{CipherEngine, CipherError};
pub use key::SecretKey;
