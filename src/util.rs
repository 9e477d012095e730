/// Find the first occurrence of `needle` within `haystack`.
pub fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Trim leading/trailing ASCII whitespace and return a `&str`, lossily
/// replacing any invalid UTF-8 rather than failing the whole request.
pub fn trimmed_str(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_delimiter() {
        assert_eq!(find_subslice(b"GET / HTTP/1.1\r\n\r\nbody", b"\r\n\r\n"), Some(14));
    }

    #[test]
    fn missing_delimiter_is_none() {
        assert_eq!(find_subslice(b"no terminator here", b"\r\n\r\n"), None);
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(trimmed_str(b"  hello world  "), "hello world");
    }
}
