//! Common types, protocol definitions, and errors shared across `card-vault` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
