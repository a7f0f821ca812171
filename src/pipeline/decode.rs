// Output Decoding
//
// Best-effort decoding of raw miner output bytes. Never fails: UTF-8 first,
// then the legacy Windows code page, then lossy replacement.

/// Decode one read event's worth of process output
pub fn decode_process_bytes(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    #[cfg(windows)]
    {
        // Console miners on Windows often emit the ANSI code page
        let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
        return decoded.into_owned();
    }

    #[cfg(not(windows))]
    {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_utf8_passes_through() {
        assert_eq!(decode_process_bytes("speed 100 H/s ✓".as_bytes()), "speed 100 H/s ✓");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decode_process_bytes(b""), "");
    }

    #[test]
    fn test_invalid_utf8_never_fails() {
        let bytes = [b'o', b'k', 0xff, 0xfe, b'!'];
        let text = decode_process_bytes(&bytes);
        assert!(text.starts_with("ok"));
        assert!(text.ends_with('!'));
    }
}
