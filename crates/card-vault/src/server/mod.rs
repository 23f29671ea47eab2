//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Validate and translate HTTP requests into [`crate::registry::CardRegistry`]
//!   calls, and registry results into wire types from [`common::protocol`].
//!
//! TLS termination and authentication are handled in front of this service.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
