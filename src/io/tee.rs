use std::io::{self, Read};

use crate::error::{Error, Result};

/// Receiver of forwarded decompressed bytes, in stream order
pub trait ChunkSink: Send {
    fn append_chunk(&mut self, chunk: &[u8]) -> Result<()>;
}

impl<K: ChunkSink + ?Sized> ChunkSink for &mut K {
    fn append_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        (**self).append_chunk(chunk)
    }
}

impl ChunkSink for Vec<u8> {
    fn append_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.extend_from_slice(chunk);
        Ok(())
    }
}

/// Adapts a closure into a [`ChunkSink`]
pub struct CallbackSink<F>(pub F);

impl<F> ChunkSink for CallbackSink<F>
where
    F: FnMut(&[u8]) -> Result<()> + Send,
{
    fn append_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        (self.0)(chunk)
    }
}

/// Read wrapper that pushes a copy of every read to a sink before
/// returning it, and counts what it forwarded.
pub struct TeeReader<R, K> {
    inner: R,
    sink: K,
    forwarded: u64,
}

impl<R: Read, K: ChunkSink> TeeReader<R, K> {
    pub fn new(inner: R, sink: K) -> Self {
        Self {
            inner,
            sink,
            forwarded: 0,
        }
    }

    /// Total bytes handed to the sink
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    pub fn into_sink(self) -> K {
        self.sink
    }
}

impl<R: Read, K: ChunkSink> Read for TeeReader<R, K> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.sink
                .append_chunk(&buf[..n])
                .map_err(Error::into_io)?;
            self.forwarded += n as u64;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_every_byte_in_order() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut tee = TeeReader::new(&data[..], Vec::new());

        let mut buf = [0u8; 13];
        let mut read = Vec::new();
        loop {
            let n = tee.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            read.extend_from_slice(&buf[..n]);
        }

        assert_eq!(tee.forwarded(), 100);
        assert_eq!(read, data);
        assert_eq!(tee.into_sink(), data);
    }

    #[test]
    fn sink_failure_stops_read() {
        let sink = CallbackSink(|_: &[u8]| -> Result<()> { Err(Error::Sink("full".to_string())) });
        let mut tee = TeeReader::new(&b"abc"[..], sink);

        let mut buf = [0u8; 3];
        let err = tee.read(&mut buf).unwrap_err();
        assert!(matches!(Error::from_io(err), Error::Sink(_)));
        assert_eq!(tee.forwarded(), 0);
    }
}
