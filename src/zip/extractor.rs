use flate2::Crc;
use flate2::read::DeflateDecoder;
use std::io::Read;
use tracing::info;

use crate::config::Limits;
use crate::entry::{ArchiveEntry, ParseResult};
use crate::error::{Error, Result};
use crate::extract::check_total_size;
use crate::io::ReadAt;
use crate::sniff;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Eager ZIP extractor over a random-access source
pub struct ZipExtractor<'a, R: ReadAt + ?Sized> {
    parser: ZipParser<'a, R>,
    limits: Limits,
}

impl<'a, R: ReadAt + ?Sized> ZipExtractor<'a, R> {
    pub fn new(reader: &'a R, limits: Limits) -> Self {
        Self {
            parser: ZipParser::new(reader),
            limits,
        }
    }

    /// List all files in the archive
    pub fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files()
    }

    /// Extract every entry in Central Directory order.
    ///
    /// Entries over the content threshold are marked binary without being
    /// decompressed.
    pub fn parse(&self) -> Result<ParseResult> {
        check_total_size(self.parser.reader().size(), &self.limits)?;

        let entries = self.list_files()?;
        let mut files = Vec::with_capacity(entries.len());

        for entry in &entries {
            if entry.is_directory {
                files.push(ArchiveEntry::directory(entry.file_name.clone()));
                continue;
            }

            let (content, is_binary) = if entry.uncompressed_size > self.limits.max_file_content_size
            {
                (String::new(), true)
            } else {
                sniff::classify(&self.extract_to_memory(entry)?)
            };

            files.push(ArchiveEntry {
                path: entry.file_name.clone(),
                size: entry.uncompressed_size,
                is_directory: false,
                is_binary,
                content,
            });
        }

        info!(entries = files.len(), "extracted zip archive");
        Ok(ParseResult { files })
    }

    /// Decompress one entry and verify its size and CRC-32
    pub fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        let data_offset = self.parser.get_data_offset(entry)?;
        if data_offset.saturating_add(entry.compressed_size) > self.parser.reader().size() {
            return Err(Error::format(format!(
                "data for {} extends past end of file",
                entry.file_name
            )));
        }

        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser.reader().read_exact_at(data_offset, &mut raw)?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
                DeflateDecoder::new(&raw[..])
                    .take(entry.uncompressed_size + 1)
                    .read_to_end(&mut out)
                    .map_err(|e| Error::Decode(format!("{}: {}", entry.file_name, e)))?;
                out
            }
            CompressionMethod::Unknown(method) => {
                return Err(Error::format(format!(
                    "unsupported compression method {} for {}",
                    method, entry.file_name
                )));
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            return Err(Error::ShortRead {
                path: entry.file_name.clone(),
                expected: entry.uncompressed_size,
                actual: data.len() as u64,
            });
        }

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            return Err(Error::Decode(format!(
                "checksum mismatch for {}",
                entry.file_name
            )));
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SliceReader;
    use byteorder::{LittleEndian, WriteBytesExt};
    use flate2::Compression;
    use flate2::write::DeflateEncoder;
    use std::io::Write;

    struct ZipFixture {
        body: Vec<u8>,
        central: Vec<u8>,
        count: u16,
    }

    impl ZipFixture {
        fn new() -> Self {
            Self {
                body: Vec::new(),
                central: Vec::new(),
                count: 0,
            }
        }

        fn add(mut self, name: &str, data: &[u8], deflate: bool) -> Self {
            let mut crc = Crc::new();
            crc.update(data);
            let payload = if deflate {
                let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
                enc.write_all(data).unwrap();
                enc.finish().unwrap()
            } else {
                data.to_vec()
            };
            let method = if deflate { 8 } else { 0 };
            let offset = self.body.len() as u32;

            let b = &mut self.body;
            b.extend_from_slice(b"PK\x03\x04");
            b.write_u16::<LittleEndian>(20).unwrap();
            b.write_u16::<LittleEndian>(0).unwrap();
            b.write_u16::<LittleEndian>(method).unwrap();
            b.write_u32::<LittleEndian>(0).unwrap();
            b.write_u32::<LittleEndian>(crc.sum()).unwrap();
            b.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
            b.write_u32::<LittleEndian>(data.len() as u32).unwrap();
            b.write_u16::<LittleEndian>(name.len() as u16).unwrap();
            b.write_u16::<LittleEndian>(0).unwrap();
            b.extend_from_slice(name.as_bytes());
            b.extend_from_slice(&payload);

            let c = &mut self.central;
            c.extend_from_slice(b"PK\x01\x02");
            c.write_u16::<LittleEndian>(20).unwrap();
            c.write_u16::<LittleEndian>(20).unwrap();
            c.write_u16::<LittleEndian>(0).unwrap();
            c.write_u16::<LittleEndian>(method).unwrap();
            c.write_u32::<LittleEndian>(0).unwrap();
            c.write_u32::<LittleEndian>(crc.sum()).unwrap();
            c.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
            c.write_u32::<LittleEndian>(data.len() as u32).unwrap();
            c.write_u16::<LittleEndian>(name.len() as u16).unwrap();
            c.write_u16::<LittleEndian>(0).unwrap();
            c.write_u16::<LittleEndian>(0).unwrap();
            c.write_u16::<LittleEndian>(0).unwrap();
            c.write_u16::<LittleEndian>(0).unwrap();
            c.write_u32::<LittleEndian>(0).unwrap();
            c.write_u32::<LittleEndian>(offset).unwrap();
            c.extend_from_slice(name.as_bytes());

            self.count += 1;
            self
        }

        fn build(self, comment: &[u8]) -> Vec<u8> {
            let mut out = self.body;
            let cd_offset = out.len() as u32;
            out.extend_from_slice(&self.central);
            out.extend_from_slice(b"PK\x05\x06");
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(self.count).unwrap();
            out.write_u16::<LittleEndian>(self.count).unwrap();
            out.write_u32::<LittleEndian>(self.central.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(cd_offset).unwrap();
            out.write_u16::<LittleEndian>(comment.len() as u16).unwrap();
            out.extend_from_slice(comment);
            out
        }
    }

    fn parse(bytes: &[u8]) -> Result<ParseResult> {
        let reader = SliceReader::new(bytes);
        ZipExtractor::new(&reader, Limits::default()).parse()
    }

    #[test]
    fn parses_stored_and_deflated_entries() {
        let zip = ZipFixture::new()
            .add("pkg/", b"", false)
            .add("pkg/readme.txt", b"hello world", false)
            .add("pkg/lib.js", "module.exports = 1;\n".repeat(50).as_bytes(), true)
            .add("pkg/blob.bin", &[0, 1, 2, 3], true)
            .build(b"");

        let result = parse(&zip).unwrap();
        assert_eq!(result.files.len(), 4);
        assert!(result.files[0].is_directory);
        assert_eq!(result.files[1].content, "hello world");
        assert!(result.files[2].content.starts_with("module.exports"));
        assert!(result.files[3].is_binary);
        assert!(result.files[3].content.is_empty());
    }

    #[test]
    fn finds_eocd_behind_comment() {
        let zip = ZipFixture::new()
            .add("a.txt", b"alpha", false)
            .build(b"archive comment");
        let result = parse(&zip).unwrap();
        assert_eq!(result.files[0].content, "alpha");
    }

    #[test]
    fn crc_mismatch_is_decode_error() {
        let mut zip = ZipFixture::new().add("a.txt", b"alpha", false).build(b"");
        // First payload byte sits after the 30-byte header and 5-byte name
        zip[35] = b'A';
        assert!(matches!(parse(&zip), Err(Error::Decode(_))));
    }

    #[test]
    fn garbage_is_format_error() {
        assert!(matches!(
            parse(b"this is not a zip archive at all"),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn oversized_archive_rejected() {
        let zip = ZipFixture::new().add("a.txt", b"alpha", false).build(b"");
        let reader = SliceReader::new(&zip);
        let limits = Limits {
            max_total_size: 10,
            ..Limits::default()
        };
        assert!(matches!(
            ZipExtractor::new(&reader, limits).parse(),
            Err(Error::SizeExceeded { .. })
        ));
    }
}
