use bytes::{Buf, Bytes};
use std::io::{self, Read};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::ByteSource;
use crate::error::Error;

/// Synchronous [`Read`] over an async [`ByteSource`].
///
/// Each read that finds no buffered bytes pulls exactly one chunk, blocking
/// the calling thread on the runtime handle until it resolves. The adapter
/// must therefore live on a blocking thread (`spawn_blocking`), never on a
/// runtime worker.
///
/// Cancelling the token wakes a pending pull, drops the source (closing its
/// connection) and fails every later read with [`Error::Cancelled`].
pub struct StreamAdapter<S> {
    source: Option<S>,
    handle: Handle,
    cancel: CancellationToken,
    leftover: Bytes,
    done: bool,
    transferred: u64,
    limit: Option<u64>,
}

impl<S: ByteSource> StreamAdapter<S> {
    pub fn new(source: S, handle: Handle) -> Self {
        Self {
            source: Some(source),
            handle,
            cancel: CancellationToken::new(),
            leftover: Bytes::new(),
            done: false,
            transferred: 0,
            limit: None,
        }
    }

    /// Fail reads once more than `limit` bytes have been pulled
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Stop pulling as soon as `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Bytes pulled from the source so far
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    fn copy_leftover(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.leftover.len());
        buf[..n].copy_from_slice(&self.leftover[..n]);
        self.leftover.advance(n);
        n
    }

    fn abandon(&mut self) -> io::Error {
        if self.source.take().is_some() {
            debug!(transferred = self.transferred, "stream cancelled; source dropped");
        }
        self.done = true;
        Error::Cancelled.into_io()
    }
}

impl<S: ByteSource> Read for StreamAdapter<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.leftover.is_empty() {
            return Ok(self.copy_leftover(buf));
        }

        while !self.done {
            if self.cancel.is_cancelled() {
                return Err(self.abandon());
            }
            let Some(source) = self.source.as_mut() else {
                self.done = true;
                break;
            };

            let cancel = &self.cancel;
            let pulled = self.handle.block_on(async {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    chunk = source.next_chunk() => Some(chunk),
                }
            });

            match pulled {
                None => return Err(self.abandon()),
                Some(Ok(Some(chunk))) if chunk.is_empty() => continue,
                Some(Ok(Some(chunk))) => {
                    self.transferred += chunk.len() as u64;
                    if let Some(limit) = self.limit {
                        if self.transferred > limit {
                            return Err(Error::SizeExceeded {
                                size: self.transferred,
                                limit,
                            }
                            .into_io());
                        }
                    }
                    self.leftover = chunk;
                    return Ok(self.copy_leftover(buf));
                }
                Some(Ok(None)) => {
                    self.source = None;
                    self.done = true;
                }
                Some(Err(e)) => return Err(e.into_io()),
            }
        }

        Ok(0)
    }
}
