//! Tracing setup: structured JSON logs, with optional OTLP span export.
//!
//! # Telemetry invariants
//!
//! - **No card numbers, lookup hashes, ciphertext or key material** may appear
//!   in any span attribute or log field. Public identifiers, batch ids and
//!   counts are fine.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

pub mod init;

pub use init::init_telemetry;
