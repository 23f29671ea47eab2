//! Storage contract for card records, plus the bundled in-memory store.
//!
//! The registry only needs two primitives: an atomic insert-or-fetch keyed by
//! lookup hash, and a read by lookup hash. Anything that can honour
//! [`CardStore`] (a SQL table with a unique index, a KV store with CAS) can be
//! plugged in at startup.

pub mod memory;

pub use memory::MemoryCardStore;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// The persisted unit. Created once per distinct card number and never mutated.
// Payload, batch and timestamp are only read back by the out-of-band recovery process.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRecord {
    /// Random caller-facing identifier, never derived from the card number.
    pub public_id: Uuid,
    /// Base64 `nonce || ciphertext || tag` of the normalised card number.
    pub encrypted_payload: String,
    /// SHA-256 hex of the normalised card number. Unique across records.
    pub lookup_hash: String,
    /// Origin batch, present only for records created by batch ingestion.
    pub batch_id: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl CardRecord {
    /// Build a fresh record with a new random public identifier.
    pub fn new(lookup_hash: String, encrypted_payload: String, batch_id: Option<String>) -> Self {
        Self {
            public_id: Uuid::new_v4(),
            encrypted_payload,
            lookup_hash,
            batch_id,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of [`CardStore::insert_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was stored.
    Inserted,
    /// A record with the same lookup hash already exists; it is returned untouched.
    AlreadyExists(CardRecord),
}

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend cannot currently serve requests.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend failed in an unexpected way.
    // Raised by database-backed stores; the in-memory store never fails this way.
    #[allow(dead_code)]
    #[error("store error: {0}")]
    Internal(String),
}

/// Key-value style storage keyed by lookup hash.
#[cfg_attr(test, mockall::automock)]
pub trait CardStore: Send + Sync {
    /// Store `record` unless a record with the same `lookup_hash` exists.
    ///
    /// Must be atomic against concurrent inserts of the same hash: exactly one
    /// caller observes [`InsertOutcome::Inserted`].
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend fails.
    fn insert_if_absent(&self, record: CardRecord) -> Result<InsertOutcome, StoreError>;

    /// Fetch the record stored under `lookup_hash`, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend fails.
    fn find_by_hash(&self, lookup_hash: &str) -> Result<Option<CardRecord>, StoreError>;

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend fails.
    fn count(&self) -> Result<usize, StoreError>;
}
