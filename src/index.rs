//! Lazy indexing: walk the archive once, record where each entry's data
//! starts, and forward the decompressed stream to a sink.
//!
//! Offsets are measured in the decompressed tar stream, so a store that
//! accumulated every forwarded chunk can later serve any entry with a single
//! range read.

use std::io::Read;
use tracing::info;

use crate::config::Limits;
use crate::entry::{IndexEntry, IndexResult};
use crate::error::Result;
use crate::io::{ChunkSink, TeeReader};
use crate::sniff::{self, BINARY_CHECK_SIZE};
use crate::tar::{self, ArchiveReader, EntryKind};

/// Builds an offset index while teeing every byte into a [`ChunkSink`]
pub struct IndexingTee {
    limits: Limits,
}

impl IndexingTee {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    /// Index an uncompressed tar stream.
    ///
    /// On success the sink has received the entire stream, including the
    /// end-of-archive blocks and any trailing padding.
    pub fn index<R: Read, K: ChunkSink>(&self, reader: R, sink: K) -> Result<IndexResult> {
        let mut archive = ArchiveReader::new(TeeReader::new(reader, sink));
        let mut files = Vec::with_capacity(64);

        while let Some(header) = archive.next_entry()? {
            let raw_offset = archive.get_ref().forwarded();
            debug_assert_eq!(raw_offset, archive.position());

            let is_binary = match header.kind {
                EntryKind::Directory => false,
                EntryKind::Other => header.size > 0,
                EntryKind::File if header.size > self.limits.max_file_content_size => true,
                EntryKind::File => {
                    let head_len = (header.size as usize).min(BINARY_CHECK_SIZE);
                    let mut head = vec![0u8; head_len];
                    archive.read_data_exact(&mut head, &header.path)?;
                    sniff::is_binary(&head)
                }
            };
            // Forward the rest so later offsets stay correct
            archive.skip_rest()?;

            files.push(IndexEntry {
                path: header.path,
                size: header.size,
                is_directory: header.kind == EntryKind::Directory,
                is_binary,
                raw_offset,
            });
        }

        let tee = archive.finish()?;
        info!(
            entries = files.len(),
            forwarded = tee.forwarded(),
            "indexed archive"
        );

        Ok(IndexResult { files })
    }
}

/// Index a gzip-compressed tar stream.
pub fn index_tgz<R: Read, K: ChunkSink>(reader: R, sink: K, limits: &Limits) -> Result<IndexResult> {
    IndexingTee::new(*limits).index(tar::decompress(reader), sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::extract::parse_tgz_bytes;
    use crate::testutil::{TarFixture, gzip};

    #[test]
    fn forwards_whole_stream_and_records_offsets() {
        let tar_bytes = TarFixture::new()
            .dir("pkg/")
            .file("pkg/a.txt", b"alpha")
            .file("pkg/b.txt", b"bravo!")
            .build();
        let tgz = gzip(&tar_bytes);

        let mut forwarded = Vec::new();
        let index = index_tgz(&tgz[..], &mut forwarded, &Limits::default()).unwrap();

        assert_eq!(forwarded, tar_bytes);
        assert_eq!(index.files.len(), 3);
        assert!(index.files[0].is_directory);

        let a = &index.files[1];
        assert_eq!(a.raw_offset, 1024);
        let start = a.raw_offset as usize;
        assert_eq!(&forwarded[start..start + a.size as usize], b"alpha");

        let b = &index.files[2];
        assert_eq!(b.raw_offset, 2048);
    }

    #[test]
    fn offsets_are_monotonic() {
        let mut fixture = TarFixture::new();
        for i in 0..20 {
            fixture = fixture.file(&format!("f{i}.txt"), &vec![b'x'; i * 300]);
        }
        let tgz = gzip(&fixture.build());

        let index = index_tgz(&tgz[..], Vec::new(), &Limits::default()).unwrap();
        for pair in index.files.windows(2) {
            assert!(pair[0].raw_offset + pair[0].size <= pair[1].raw_offset);
        }
    }

    #[test]
    fn binary_flags_match_eager_mode() {
        let limit = Limits::default().max_file_content_size as usize;
        let tgz = gzip(
            &TarFixture::new()
                .file("exact.txt", &vec![b'a'; limit])
                .file("over.txt", &vec![b'a'; limit + 1])
                .file("nul.txt", b"abcd\0efghi")
                .file("plain.txt", b"abcdefghij")
                .build(),
        );

        let eager = parse_tgz_bytes(&tgz, &Limits::default()).unwrap();
        let index = index_tgz(&tgz[..], Vec::new(), &Limits::default()).unwrap();

        for (e, i) in eager.files.iter().zip(&index.files) {
            assert_eq!(e.path, i.path);
            assert_eq!(e.is_binary, i.is_binary, "{}", e.path);
        }
        assert!(index.files[1].is_binary);
        assert!(index.files[2].is_binary);
        assert!(!index.files[3].is_binary);
    }

    #[test]
    fn sink_errors_abort_indexing() {
        let tgz = gzip(&TarFixture::new().file("a.txt", b"alpha").build());
        let sink = crate::io::CallbackSink(|_: &[u8]| -> Result<()> {
            Err(Error::Sink("host closed".to_string()))
        });
        assert!(matches!(
            index_tgz(&tgz[..], sink, &Limits::default()),
            Err(Error::Sink(_))
        ));
    }
}
