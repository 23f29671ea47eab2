//! Card registration, lookup and batch ingestion with at-most-one record per card.
//!
//! # Lifecycle of a card number
//!
//! 1. Normalise (trim surrounding whitespace).
//! 2. Hash with [`CipherEngine::hash`] and look the hash up in the store.
//! 3. If absent, encrypt, build a [`CardRecord`] and hand it to
//!    [`CardStore::insert_if_absent`]. Losing an insert race is reported as
//!    [`RegistrationStatus::AlreadyRegistered`] with the winner's identifier.
//!
//! Single registrations are fail-fast; batch ingestion records per-card
//! failures and keeps going.

use std::sync::Arc;

use common::protocol::BatchUploadResponse;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::batch;
use crate::crypto::{CipherEngine, CipherError};
use crate::store::{CardRecord, CardStore, InsertOutcome, StoreError};

/// Errors surfaced by single-card operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Encrypting the card number failed.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// The storage collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Whether [`CardRegistry::register`] created a record or found one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    /// A new record was stored.
    Registered,
    /// A record for this card already existed; nothing was written.
    AlreadyRegistered,
}

/// Result of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Public identifier of the (new or existing) record.
    pub public_id: Uuid,
    /// Whether the record was created by this call.
    pub status: RegistrationStatus,
}

/// Accounting for one batch ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub batch_id: String,
    pub batch_name: String,
    pub batch_date: String,
    pub expected_count: i32,
    /// Card numbers extracted by the parser.
    pub total_submitted: usize,
    /// Cards newly registered or already present.
    pub total_accepted: usize,
    /// Parser diagnostics plus per-card failures.
    pub total_failed: usize,
    pub failure_details: Vec<String>,
}

impl From<BatchOutcome> for BatchUploadResponse {
    fn from(outcome: BatchOutcome) -> Self {
        Self {
            batch_id: outcome.batch_id,
            batch_name: outcome.batch_name,
            batch_date: outcome.batch_date,
            expected_count: outcome.expected_count,
            total_processed: outcome.total_submitted,
            total_success: outcome.total_accepted,
            total_errors: outcome.total_failed,
            errors: outcome.failure_details,
        }
    }
}

/// Single source of truth for turning card numbers into [`CardRecord`]s.
pub struct CardRegistry {
    cipher: Arc<CipherEngine>,
    store: Arc<dyn CardStore>,
}

impl CardRegistry {
    /// Compose a registry from an engine and a store.
    pub fn new(cipher: Arc<CipherEngine>, store: Arc<dyn CardStore>) -> Self {
        Self { cipher, store }
    }

    /// Number of records currently held by the store.
    ///
    /// # Errors
    ///
    /// Propagates the store's error.
    pub fn stored_cards(&self) -> Result<usize, StoreError> {
        self.store.count()
    }

    /// Register `card_number`, or return the identifier it is already stored under.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if encryption or storage fails.
    pub fn register(&self, card_number: &str) -> Result<Registration, RegistryError> {
        self.register_with_batch(card_number, None)
    }

    /// Look up the public identifier stored for `card_number`. Read-only.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Store`] if the lookup fails.
    pub fn find(&self, card_number: &str) -> Result<Option<Uuid>, RegistryError> {
        let hash = self.cipher.hash(normalize(card_number));
        Ok(self.store.find_by_hash(&hash)?.map(|r| r.public_id))
    }

    /// Parse `raw` as a batch file and register every valid card in it.
    ///
    /// Never fails: parser diagnostics and per-card errors are collected in
    /// [`BatchOutcome::failure_details`].
    pub fn ingest_batch(&self, raw: &[u8]) -> BatchOutcome {
        let parsed = batch::parse(raw);
        let batch_id = (!parsed.batch_id.is_empty()).then(|| parsed.batch_id.clone());

        let mut failures = parsed.diagnostics;
        let mut accepted = 0usize;

        for (idx, card_number) in parsed.card_numbers.iter().enumerate() {
            match self.register_with_batch(card_number, batch_id.as_deref()) {
                Ok(_) => accepted += 1,
                Err(e) => {
                    warn!(
                        batch_id = %parsed.batch_id,
                        position = idx + 1,
                        error = %e,
                        "failed to register card from batch"
                    );
                    failures.push(format!("error processing card #{}: {e}", idx + 1));
                }
            }
        }

        let submitted = parsed.card_numbers.len();
        info!(
            batch_id = %parsed.batch_id,
            accepted,
            submitted,
            failed = failures.len(),
            "batch processed"
        );

        BatchOutcome {
            batch_id: parsed.batch_id,
            batch_name: parsed.batch_name,
            batch_date: parsed.batch_date,
            expected_count: parsed.expected_count,
            total_submitted: submitted,
            total_accepted: accepted,
            total_failed: failures.len(),
            failure_details: failures,
        }
    }

    fn register_with_batch(
        &self,
        card_number: &str,
        batch_id: Option<&str>,
    ) -> Result<Registration, RegistryError> {
        let card_number = normalize(card_number);
        let hash = self.cipher.hash(card_number);

        if let Some(existing) = self.store.find_by_hash(&hash)? {
            debug!(public_id = %existing.public_id, "card already registered");
            return Ok(Registration {
                public_id: existing.public_id,
                status: RegistrationStatus::AlreadyRegistered,
            });
        }

        let payload = self.cipher.encrypt(card_number)?;
        let record = CardRecord::new(hash, payload, batch_id.map(str::to_owned));
        let public_id = record.public_id;

        match self.store.insert_if_absent(record)? {
            InsertOutcome::Inserted => {
                info!(%public_id, "card registered");
                Ok(Registration {
                    public_id,
                    status: RegistrationStatus::Registered,
                })
            }
            InsertOutcome::AlreadyExists(winner) => {
                debug!(public_id = %winner.public_id, "lost insert race; returning existing card");
                Ok(Registration {
                    public_id: winner.public_id,
                    status: RegistrationStatus::AlreadyRegistered,
                })
            }
        }
    }
}

fn normalize(card_number: &str) -> &str {
    card_number.trim()
}
