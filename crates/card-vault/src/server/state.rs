//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::registry::CardRegistry;

/// Application state shared across all request handlers.
///
/// Cheap to clone: the registry is behind an `Arc` and is also moved into
/// blocking tasks.
#[derive(Clone)]
pub struct AppState {
    /// Card registration, lookup and batch ingestion.
    pub registry: Arc<CardRegistry>,
}

impl AppState {
    /// Create a new [`AppState`] around a composed registry.
    pub fn new(registry: CardRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}

#[cfg(test)]
impl AppState {
    /// State backed by an empty in-memory store and a fixed test key.
    pub fn in_memory() -> Self {
        use crate::crypto::{CipherEngine, SecretKey};
        use crate::store::MemoryCardStore;

        let cipher = CipherEngine::new(SecretKey::derive("handler-tests").unwrap());
        Self::new(CardRegistry::new(
            Arc::new(cipher),
            Arc::new(MemoryCardStore::new()),
        ))
    }
}
