mod adapter;
mod http;
mod local;
mod tee;

pub use adapter::StreamAdapter;
pub use http::NetworkByteSource;
pub use local::{LocalFileReader, SliceReader};
pub use tee::{CallbackSink, ChunkSink, TeeReader};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Error, Result};

/// Pull-based source of compressed archive bytes
#[async_trait]
pub trait ByteSource: Send {
    /// Resolve the next chunk, or `None` once the source is exhausted
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;

    /// Length announced by the source before streaming, if any
    fn declared_len(&self) -> Option<u64> {
        None
    }
}

/// Trait for random access reading from a data source
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill `buf` completely from `offset`, failing if the source ends first
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..])?;
            if n == 0 {
                return Err(Error::format(format!(
                    "unexpected end of data at offset {}",
                    offset + filled as u64
                )));
            }
            filled += n;
        }
        Ok(())
    }
}
