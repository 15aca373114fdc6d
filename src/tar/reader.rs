//! Sequential tar reader.
//!
//! Reads exactly what it consumes from the underlying stream: one block per
//! header, then the entry's data and padding. Nothing is buffered ahead, so
//! [`ArchiveReader::position`] always equals the number of bytes pulled from
//! the inner reader. The indexing pass relies on this to compute offsets.

use std::io::{self, Read};
use tracing::{debug, warn};

use super::header::{BLOCK_SIZE, EntryType, Header, parse_pax_records};
use crate::error::{Error, Result};

/// Upper bound for GNU long-name and PAX header payloads
const MAX_META_SIZE: u64 = 1024 * 1024;

const SKIP_BUF_SIZE: usize = 32 * 1024;

/// What an entry is, as far as content extraction is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Links, devices, sparse and unknown types. Their data, if any, is
    /// skipped and never decoded as text
    Other,
}

/// A header as surfaced to callers, after long-name and PAX overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    pub path: String,
    /// Bytes of data following the header; 0 for header-only types
    pub size: u64,
    pub kind: EntryKind,
}

pub struct ArchiveReader<R> {
    inner: R,
    position: u64,
    /// Unread data bytes of the current entry
    remaining: u64,
    /// Padding after the current entry's data
    padding: u64,
    finished: bool,
}

fn padding_for(size: u64) -> u64 {
    let block = BLOCK_SIZE as u64;
    (block - size % block) % block
}

impl<R: Read> ArchiveReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            position: 0,
            remaining: 0,
            padding: 0,
            finished: false,
        }
    }

    /// Bytes consumed from the inner reader
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Advance to the next entry, skipping whatever is left of the current one.
    ///
    /// Returns `None` at the end-of-archive marker or at a clean end of
    /// stream on a block boundary.
    pub fn next_entry(&mut self) -> Result<Option<EntryHeader>> {
        if self.finished {
            return Ok(None);
        }
        self.skip_rest()?;

        let mut long_name: Option<String> = None;
        let mut pax_path: Option<String> = None;
        let mut pax_size: Option<u64> = None;

        loop {
            let Some(block) = self.read_block()? else {
                self.finished = true;
                return Ok(None);
            };
            let header = Header::new(block);

            if header.is_zero() {
                self.read_end_marker()?;
                return Ok(None);
            }

            header.verify_checksum()?;
            let entry_type = header.entry_type();
            let declared = header.size()?;

            match entry_type {
                EntryType::GnuLongName => {
                    let data = self.read_meta(declared)?;
                    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
                    long_name = Some(String::from_utf8_lossy(&data[..end]).into_owned());
                    continue;
                }
                EntryType::PaxLocal => {
                    let data = self.read_meta(declared)?;
                    for (key, value) in parse_pax_records(&data)? {
                        match key.as_str() {
                            "path" => pax_path = Some(value),
                            "size" => {
                                let size = value.parse().map_err(|_| {
                                    Error::format(format!("invalid PAX size {value:?}"))
                                })?;
                                pax_size = Some(size);
                            }
                            _ => {}
                        }
                    }
                    continue;
                }
                EntryType::GnuLongLink | EntryType::PaxGlobal => {
                    debug!(?entry_type, size = declared, "skipping meta header");
                    self.begin_data(declared);
                    self.skip_rest()?;
                    continue;
                }
                _ => {}
            }

            let declared = pax_size.take().unwrap_or(declared);
            let path = pax_path
                .take()
                .or_else(|| long_name.take())
                .unwrap_or_else(|| header.path());

            let kind = match entry_type {
                EntryType::Directory => EntryKind::Directory,
                EntryType::Regular if path.ends_with('/') => EntryKind::Directory,
                EntryType::Regular => EntryKind::File,
                _ => EntryKind::Other,
            };
            let size = if entry_type.is_header_only() || kind == EntryKind::Directory {
                0
            } else {
                declared
            };

            self.begin_data(size);
            return Ok(Some(EntryHeader { path, size, kind }));
        }
    }

    /// Read data of the current entry; 0 once the entry is exhausted or the
    /// stream ended early.
    pub fn read_data(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = self.read_inner(&mut buf[..want])?;
        self.remaining -= n as u64;
        Ok(n)
    }

    /// Fill `buf` from the current entry, failing with [`Error::ShortRead`]
    /// if the data ends first.
    pub fn read_data_exact(&mut self, buf: &mut [u8], path: &str) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_data(&mut buf[filled..])?;
            if n == 0 {
                return Err(Error::ShortRead {
                    path: path.to_string(),
                    expected: buf.len() as u64,
                    actual: filled as u64,
                });
            }
            filled += n;
        }
        Ok(())
    }

    /// Discard the rest of the current entry's data and its padding.
    pub fn skip_rest(&mut self) -> Result<u64> {
        let total = self.remaining + self.padding;
        if total == 0 {
            return Ok(0);
        }

        let mut buf = vec![0u8; SKIP_BUF_SIZE.min(usize::try_from(total).unwrap_or(usize::MAX))];
        let mut left = total;
        while left > 0 {
            let want = buf.len().min(usize::try_from(left).unwrap_or(usize::MAX));
            let n = self.read_inner(&mut buf[..want])?;
            if n == 0 {
                return Err(Error::format(format!(
                    "unexpected end of archive while skipping {left} bytes"
                )));
            }
            left -= n as u64;
        }

        self.remaining = 0;
        self.padding = 0;
        Ok(total)
    }

    /// Consume the rest of the stream after the end-of-archive marker and
    /// hand back the inner reader.
    ///
    /// Draining to EOF lets the decompressor verify its trailer, and lets a
    /// tee forward the complete decompressed stream.
    pub fn finish(mut self) -> Result<R> {
        while self.next_entry()?.is_some() {}
        let drained = io::copy(&mut self.inner, &mut io::sink()).map_err(Error::from_io)?;
        self.position += drained;
        Ok(self.inner)
    }

    fn begin_data(&mut self, size: u64) {
        self.remaining = size;
        self.padding = padding_for(size);
    }

    fn read_meta(&mut self, size: u64) -> Result<Vec<u8>> {
        if size > MAX_META_SIZE {
            return Err(Error::format(format!(
                "extended header of {size} bytes exceeds limit"
            )));
        }
        self.begin_data(size);
        let mut data = vec![0u8; size as usize];
        let mut filled = 0;
        while filled < data.len() {
            let n = self.read_data(&mut data[filled..])?;
            if n == 0 {
                return Err(Error::format("unexpected end of archive in extended header"));
            }
            filled += n;
        }
        self.skip_rest()?;
        Ok(data)
    }

    /// Second zero block is optional; anything else after the first is an error.
    fn read_end_marker(&mut self) -> Result<()> {
        self.finished = true;
        match self.read_block()? {
            Some(block) if Header::new(block).is_zero() => Ok(()),
            Some(_) => Err(Error::format("unexpected data after end-of-archive block")),
            None => {
                warn!("archive ends after a single end-of-archive block");
                Ok(())
            }
        }
    }

    /// Read one header block; `None` on a clean EOF at the block boundary.
    fn read_block(&mut self) -> Result<Option<[u8; BLOCK_SIZE]>> {
        let mut block = [0u8; BLOCK_SIZE];
        let mut filled = 0;
        while filled < BLOCK_SIZE {
            let n = self.read_inner(&mut block[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(Error::format("unexpected end of archive in header"));
            }
            filled += n;
        }
        Ok(Some(block))
    }

    fn read_inner(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match self.inner.read(buf) {
                Ok(n) => {
                    self.position += n as u64;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::from_io(e)),
            }
        }
    }
}
