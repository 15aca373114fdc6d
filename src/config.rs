//! Limits, fetch options and engine configuration.

use std::time::Duration;

/// Entries larger than this are never materialized as text (512 KiB).
pub const MAX_FILE_CONTENT_SIZE: u64 = 512 * 1024;

/// Archives larger than this are rejected up front (100 MiB).
pub const MAX_TOTAL_SIZE: u64 = 100 * 1024 * 1024;

/// Size thresholds applied while ingesting an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Per-entry content threshold; larger entries are drained and marked binary
    pub max_file_content_size: u64,
    /// Whole-archive cap, checked against declared and transferred length
    pub max_total_size: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_content_size: MAX_FILE_CONTENT_SIZE,
            max_total_size: MAX_TOTAL_SIZE,
        }
    }
}

/// Per-request options for remote archives.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Extra request headers, sent verbatim
    pub headers: Vec<(String, String)>,
    /// Bearer credential for private registries
    pub bearer_token: Option<String>,
}

impl FetchOptions {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

/// Configuration for the process-wide [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub limits: Limits,
    /// Per-request timeout for the HTTP client
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("tarlens/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
