//! Fixed-width batch file parsing.
//!
//! # File layout
//!
//! ```text
//! [01-29] NAME  [30-37] DATE (YYYYMMDD)  [38-45] BATCH ID  [46-51] COUNT   <- header
//! [01] 'C'  [02-07] SUB-NUMBER  [08-..] CARD NUMBER                        <- card lines
//! anything                                                                  <- footer
//! ```
//!
//! Blank lines are dropped before any positional logic. The parser never fails:
//! malformed input becomes a diagnostic in [`ParsedBatch::diagnostics`].
//!
//! # Module invariants
//!
//! - **No crypto or storage dependencies.** This module must not import
//!   anything from `crate::crypto`, `crate::store` or `crate::registry`.

pub mod parser;

pub use parser::{is_valid_card_number, parse};
