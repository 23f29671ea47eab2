//! Limits applied to the router as middleware layers.

use std::time::Duration;

use crate::config::Config;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default request body cap (10 MiB), which bounds batch uploads.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Timeout and body-size limits for the router.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Limits {
    /// Take the limits from validated configuration.
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            request_timeout: Duration::from_secs(cfg.request_timeout_secs),
            max_body_bytes: cfg.max_upload_bytes,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            request_timeout: REQUEST_TIMEOUT,
            max_body_bytes: MAX_BODY_BYTES,
        }
    }
}
