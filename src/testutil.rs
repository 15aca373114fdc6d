//! Archive fixtures shared by unit and integration tests.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;

pub(crate) struct TarFixture {
    builder: tar::Builder<Vec<u8>>,
}

impl TarFixture {
    pub(crate) fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    /// Name bytes are written verbatim so a trailing `/` survives
    pub(crate) fn dir(mut self, path: &str) -> Self {
        let mut header = tar::Header::new_ustar();
        header.as_old_mut().name[..path.len()].copy_from_slice(path.as_bytes());
        header.set_entry_type(tar::EntryType::Directory);
        header.set_mode(0o755);
        header.set_size(0);
        header.set_cksum();
        self.builder.append(&header, std::io::empty()).unwrap();
        self
    }

    pub(crate) fn file(self, path: &str, data: &[u8]) -> Self {
        self.entry(path, tar::EntryType::Regular, data)
    }

    /// Entry of any type flag, with `data` following the header
    pub(crate) fn entry(mut self, path: &str, kind: tar::EntryType, data: &[u8]) -> Self {
        let mut header = tar::Header::new_ustar();
        header.set_entry_type(kind);
        header.set_mode(0o644);
        header.set_size(data.len() as u64);
        self.builder.append_data(&mut header, path, data).unwrap();
        self
    }

    /// Uncompressed tar bytes, end-of-archive blocks included
    pub(crate) fn build(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }
}

pub(crate) fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
