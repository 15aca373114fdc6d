//! Error types for tarlens.
//!
//! Every public operation fails with a single [`Error`]. Errors are terminal
//! for the call that raised them; nothing is retried and no partial result
//! is returned alongside a failure.

use std::io;

use thiserror::Error;

/// Result type for tarlens operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the random-access store lifecycle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `finalize` or `append_chunk` called on a finalized store
    #[error("store is already finalized")]
    AlreadyFinalized,

    /// Range read issued before `finalize`
    #[error("store is not finalized yet")]
    NotFinalized,

    /// Range read outside the finalized bytes
    #[error("range {offset}+{size} is out of bounds (store holds {len} bytes)")]
    OutOfRange { offset: u64, size: u64, len: u64 },

    /// Any access after `dispose`
    #[error("store has been disposed")]
    Disposed,
}

/// Error type for archive ingestion
#[derive(Error, Debug)]
pub enum Error {
    /// Non-success HTTP response, or transport failure when `status` is `None`
    #[error("Fetch failed: {}", fetch_message(.status, .reason))]
    Fetch { status: Option<u16>, reason: String },

    /// Declared or transferred length over the configured cap
    #[error("Archive too large: {size} bytes exceeds limit of {limit} bytes")]
    SizeExceeded { size: u64, limit: u64 },

    /// Malformed container structure
    #[error("Invalid archive: {0}")]
    Format(String),

    /// Malformed, truncated or corrupt compressed stream
    #[error("Decompression failed: {0}")]
    Decode(String),

    /// Entry data ended before its declared size
    #[error("Short read for {path}: expected {expected} bytes, got {actual}")]
    ShortRead {
        path: String,
        expected: u64,
        actual: u64,
    },

    /// Random-access store misuse
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Path missing from the index
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// The host sink refused a forwarded chunk
    #[error("Chunk sink failed: {0}")]
    Sink(String),

    /// Local file access failed
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    /// Background task failed to complete
    #[error("Task failed: {0}")]
    Task(String),

    /// The caller abandoned the operation before the stream ended
    #[error("Operation cancelled")]
    Cancelled,
}

fn fetch_message(status: &Option<u16>, reason: &str) -> String {
    match status {
        Some(code) => format!("HTTP {} {}", code, reason),
        None => reason.to_string(),
    }
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    /// Map an I/O error raised while pulling decompressed bytes.
    ///
    /// Crate errors tunnelled through `io::Error` (from the stream adapter,
    /// the tee, or a sink) come back out unchanged; everything else was
    /// produced by the decompressor.
    pub(crate) fn from_io(err: io::Error) -> Self {
        if err.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            if let Some(inner) = err.into_inner() {
                if let Ok(own) = inner.downcast::<Error>() {
                    return *own;
                }
            }
            return Error::Decode("stream failed".to_string());
        }
        Error::Decode(err.to_string())
    }

    /// Wrap a crate error so it can cross a `std::io::Read` boundary.
    pub(crate) fn into_io(self) -> io::Error {
        io::Error::other(self)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Fetch {
            status: err.status().map(|s| s.as_u16()),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_round_trip_preserves_variant() {
        let err = Error::SizeExceeded { size: 10, limit: 5 }.into_io();
        match Error::from_io(err) {
            Error::SizeExceeded { size, limit } => {
                assert_eq!(size, 10);
                assert_eq!(limit, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn foreign_io_error_becomes_decode() {
        let err = io::Error::new(io::ErrorKind::InvalidData, "corrupt deflate stream");
        assert!(matches!(Error::from_io(err), Error::Decode(_)));
    }

    #[test]
    fn fetch_message_includes_status() {
        let err = Error::Fetch {
            status: Some(404),
            reason: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "Fetch failed: HTTP 404 Not Found");
    }
}
