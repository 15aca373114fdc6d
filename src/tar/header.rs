use crate::error::{Error, Result};

/// Size of every tar header and data record
pub const BLOCK_SIZE: usize = 512;

/// POSIX ustar magic; only this variant uses the `prefix` field for paths
const USTAR_MAGIC: &[u8] = b"ustar\0";

const NAME: std::ops::Range<usize> = 0..100;
const SIZE: std::ops::Range<usize> = 124..136;
const CHECKSUM: std::ops::Range<usize> = 148..156;
const TYPEFLAG: usize = 156;
const MAGIC: std::ops::Range<usize> = 257..263;
const PREFIX: std::ops::Range<usize> = 345..500;

/// Tar entry type flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Regular,
    Link,
    Symlink,
    Char,
    Block,
    Directory,
    Fifo,
    GnuLongName,
    GnuLongLink,
    PaxLocal,
    PaxGlobal,
    Other(u8),
}

impl EntryType {
    pub fn from_byte(flag: u8) -> Self {
        match flag {
            // '7' is a contiguous file: a regular file for every reader
            b'0' | b'\0' | b'7' => EntryType::Regular,
            b'1' => EntryType::Link,
            b'2' => EntryType::Symlink,
            b'3' => EntryType::Char,
            b'4' => EntryType::Block,
            b'5' => EntryType::Directory,
            b'6' => EntryType::Fifo,
            b'L' => EntryType::GnuLongName,
            b'K' => EntryType::GnuLongLink,
            b'x' => EntryType::PaxLocal,
            b'g' => EntryType::PaxGlobal,
            other => EntryType::Other(other),
        }
    }

    /// Types whose header is never followed by data, whatever the size field says
    pub fn is_header_only(&self) -> bool {
        matches!(
            self,
            EntryType::Link
                | EntryType::Symlink
                | EntryType::Char
                | EntryType::Block
                | EntryType::Directory
                | EntryType::Fifo
        )
    }
}

/// One raw 512-byte header block
pub struct Header {
    block: [u8; BLOCK_SIZE],
}

impl Header {
    pub fn new(block: [u8; BLOCK_SIZE]) -> Self {
        Self { block }
    }

    /// End-of-archive marker
    pub fn is_zero(&self) -> bool {
        self.block.iter().all(|&b| b == 0)
    }

    /// Check the stored checksum against both the unsigned and the
    /// historical signed byte sum.
    pub fn verify_checksum(&self) -> Result<()> {
        let stored = parse_octal(&self.block[CHECKSUM])?;

        let mut unsigned: u64 = 0;
        let mut signed: i64 = 0;
        for (i, &b) in self.block.iter().enumerate() {
            let b = if CHECKSUM.contains(&i) { b' ' } else { b };
            unsigned += b as u64;
            signed += (b as i8) as i64;
        }

        if stored == unsigned || stored as i64 == signed {
            Ok(())
        } else {
            Err(Error::format(format!(
                "header checksum mismatch (stored {stored}, computed {unsigned})"
            )))
        }
    }

    pub fn entry_type(&self) -> EntryType {
        EntryType::from_byte(self.block[TYPEFLAG])
    }

    /// Declared data size
    pub fn size(&self) -> Result<u64> {
        parse_numeric(&self.block[SIZE])
    }

    /// Entry path, joined with the ustar prefix when present
    pub fn path(&self) -> String {
        let name = String::from_utf8_lossy(trim_nul(&self.block[NAME]));
        if &self.block[MAGIC] == USTAR_MAGIC {
            let prefix = trim_nul(&self.block[PREFIX]);
            if !prefix.is_empty() {
                return format!("{}/{}", String::from_utf8_lossy(prefix), name);
            }
        }
        name.into_owned()
    }
}

fn trim_nul(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

/// Parse an octal field padded with spaces or NULs.
fn parse_octal(field: &[u8]) -> Result<u64> {
    let digits = trim_nul(field);
    let digits = digits
        .iter()
        .skip_while(|&&b| b == b' ')
        .take_while(|&&b| b != b' ')
        .copied()
        .collect::<Vec<u8>>();

    let mut value: u64 = 0;
    for b in digits {
        if !(b'0'..=b'7').contains(&b) {
            return Err(Error::format(format!(
                "invalid octal digit {:?} in header",
                b as char
            )));
        }
        value = value
            .checked_mul(8)
            .map(|v| v + (b - b'0') as u64)
            .ok_or_else(|| Error::format("numeric header field overflows"))?;
    }
    Ok(value)
}

/// Parse a numeric field in octal or GNU base-256 form.
fn parse_numeric(field: &[u8]) -> Result<u64> {
    match field.first() {
        Some(&first) if first & 0x80 != 0 => {
            if first & 0x40 != 0 {
                return Err(Error::format("negative size in header"));
            }
            let mut value = (first & 0x3f) as u64;
            for &b in &field[1..] {
                if value > (u64::MAX >> 8) {
                    return Err(Error::format("numeric header field overflows"));
                }
                value = (value << 8) | b as u64;
            }
            Ok(value)
        }
        _ => parse_octal(field),
    }
}

/// Parse PAX extended header records (`"<len> <key>=<value>\n"`).
pub fn parse_pax_records(data: &[u8]) -> Result<Vec<(String, String)>> {
    let mut records = Vec::new();
    let mut rest = data;

    while !rest.is_empty() {
        // Trailing NUL padding ends the record list
        if rest[0] == 0 {
            break;
        }
        let space = rest
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| Error::format("malformed PAX record"))?;
        let len: usize = std::str::from_utf8(&rest[..space])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::format("malformed PAX record length"))?;
        if len <= space + 1 || len > rest.len() || rest[len - 1] != b'\n' {
            return Err(Error::format("malformed PAX record"));
        }

        let record = &rest[space + 1..len - 1];
        let eq = record
            .iter()
            .position(|&b| b == b'=')
            .ok_or_else(|| Error::format("malformed PAX record"))?;
        records.push((
            String::from_utf8_lossy(&record[..eq]).into_owned(),
            String::from_utf8_lossy(&record[eq + 1..]).into_owned(),
        ));
        rest = &rest[len..];
    }

    Ok(records)
}
