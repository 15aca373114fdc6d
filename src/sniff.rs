//! Text/binary classification shared by every extraction path.

/// Number of leading bytes inspected when classifying content.
pub const BINARY_CHECK_SIZE: usize = 512;

/// Returns `true` if `data` looks binary.
///
/// Only the first [`BINARY_CHECK_SIZE`] bytes are inspected: a NUL byte or
/// invalid UTF-8 in that prefix marks the data as binary. The prefix is cut
/// at a byte boundary, so a valid multi-byte sequence straddling the cut is
/// reported as binary.
pub fn is_binary(data: &[u8]) -> bool {
    let prefix = &data[..data.len().min(BINARY_CHECK_SIZE)];
    prefix.contains(&0) || std::str::from_utf8(prefix).is_err()
}

/// Decode entry bytes, returning `(text, is_binary)`.
///
/// Binary data yields empty text. Bytes past the inspected prefix are
/// decoded lossily.
pub fn classify(data: &[u8]) -> (String, bool) {
    if is_binary(data) {
        (String::new(), true)
    } else {
        (String::from_utf8_lossy(data).into_owned(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nul_byte_is_binary() {
        assert!(is_binary(b"abcd\0efghi"));
    }

    #[test]
    fn ascii_is_text() {
        assert!(!is_binary(b"abcdefghij"));
    }

    #[test]
    fn empty_is_text() {
        assert!(!is_binary(b""));
        assert_eq!(classify(b""), (String::new(), false));
    }

    #[test]
    fn invalid_utf8_is_binary() {
        assert!(is_binary(&[b'a', 0xff, b'b']));
    }

    #[test]
    fn nul_past_prefix_is_ignored() {
        let mut data = vec![b'a'; BINARY_CHECK_SIZE];
        data.push(0);
        assert!(!is_binary(&data));
    }

    #[test]
    fn multibyte_straddling_prefix_is_binary() {
        // 511 ASCII bytes, then a 2-byte 'é' covering bytes 511..513
        let mut data = vec![b'a'; BINARY_CHECK_SIZE - 1];
        data.extend_from_slice("é".as_bytes());
        assert!(std::str::from_utf8(&data).is_ok());
        assert!(is_binary(&data));
    }

    #[test]
    fn classify_decodes_text() {
        let (text, binary) = classify("héllo".as_bytes());
        assert!(!binary);
        assert_eq!(text, "héllo");
    }
}
