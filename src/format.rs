/// Container formats recognized from leading magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// gzip-compressed tar
    Tgz,
    Zip,
    Unknown,
}

/// gzip magic (RFC 1952)
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
/// Local file header, or EOCD of an empty archive
const ZIP_MAGICS: [&[u8]; 2] = [b"PK\x03\x04", b"PK\x05\x06"];

impl ArchiveFormat {
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(&GZIP_MAGIC) {
            ArchiveFormat::Tgz
        } else if ZIP_MAGICS.iter().any(|magic| bytes.starts_with(magic)) {
            ArchiveFormat::Zip
        } else {
            ArchiveFormat::Unknown
        }
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArchiveFormat::Tgz => "tgz",
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}
