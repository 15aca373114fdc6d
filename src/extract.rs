//! Eager extraction: one pass, every entry's content in memory.

use std::io::Read;
use tracing::info;

use crate::config::Limits;
use crate::entry::{ArchiveEntry, ParseResult};
use crate::error::{Error, Result};
use crate::sniff;
use crate::tar::{self, ArchiveReader, EntryKind};

/// Materializes entry content while walking a decompressed tar stream
pub struct EagerExtractor {
    limits: Limits,
}

impl EagerExtractor {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    /// Extract every entry from an uncompressed tar stream.
    ///
    /// Entries over the content threshold are drained and marked binary.
    /// The stream is consumed to EOF before returning.
    pub fn extract<R: Read>(&self, reader: R) -> Result<ParseResult> {
        let mut archive = ArchiveReader::new(reader);
        let mut files = Vec::with_capacity(64);

        while let Some(header) = archive.next_entry()? {
            let entry = match header.kind {
                EntryKind::Directory => ArchiveEntry::directory(header.path),
                EntryKind::Other => {
                    archive.skip_rest()?;
                    ArchiveEntry {
                        path: header.path,
                        size: header.size,
                        is_directory: false,
                        // Opaque payloads are binary; header-only entries are empty text
                        is_binary: header.size > 0,
                        content: String::new(),
                    }
                }
                EntryKind::File if header.size > self.limits.max_file_content_size => {
                    archive.skip_rest()?;
                    ArchiveEntry {
                        path: header.path,
                        size: header.size,
                        is_directory: false,
                        is_binary: true,
                        content: String::new(),
                    }
                }
                EntryKind::File => {
                    let mut buf = vec![0u8; header.size as usize];
                    archive.read_data_exact(&mut buf, &header.path)?;
                    let (content, is_binary) = sniff::classify(&buf);
                    ArchiveEntry {
                        path: header.path,
                        size: header.size,
                        is_directory: false,
                        is_binary,
                        content,
                    }
                }
            };
            files.push(entry);
        }

        let consumed = archive.position();
        archive.finish()?;
        info!(entries = files.len(), bytes = consumed, "extracted archive");

        Ok(ParseResult { files })
    }
}

/// Extract a gzip-compressed tar stream.
pub fn extract_tgz<R: Read>(reader: R, limits: &Limits) -> Result<ParseResult> {
    EagerExtractor::new(*limits).extract(tar::decompress(reader))
}

/// Extract an in-memory `.tgz`, rejecting it up front if it exceeds the
/// total-size cap.
pub fn parse_tgz_bytes(data: &[u8], limits: &Limits) -> Result<ParseResult> {
    check_total_size(data.len() as u64, limits)?;
    extract_tgz(data, limits)
}

pub(crate) fn check_total_size(size: u64, limits: &Limits) -> Result<()> {
    if size > limits.max_total_size {
        return Err(Error::SizeExceeded {
            size,
            limit: limits.max_total_size,
        });
    }
    Ok(())
}
