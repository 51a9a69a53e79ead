use sha1::{Digest, Sha1};

/// Lowercase hex SHA-1 of `data`.
pub fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Extension of `file_name` including the leading dot, or `""`.
pub fn extension(file_name: &str) -> &str {
    let base = file_name.rsplit('/').next().unwrap_or(file_name);
    match base.rfind('.') {
        Some(idx) if idx > 0 => &base[idx..],
        _ => "",
    }
}

/// Content-addressed blob name: `{sha1(name)}_{sha1(payload)}{ext}`.
///
/// Identical names with identical payloads map to the same blob regardless of
/// which user or task produced them.
pub fn content_address(file_name: &str, payload: &[u8]) -> String {
    format!(
        "{}_{}{}",
        sha1_hex(file_name.as_bytes()),
        sha1_hex(payload),
        extension(file_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_known_vector() {
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn extension_keeps_dot() {
        assert_eq!(extension("favicon.ico"), ".ico");
        assert_eq!(extension("icon.v2.png"), ".png");
        assert_eq!(extension("favicon"), "");
        assert_eq!(extension(".hidden"), "");
    }

    #[test]
    fn content_address_pattern() {
        let name = content_address("favicon.ico", b"payload");
        let expected = format!(
            "{}_{}.ico",
            sha1_hex(b"favicon.ico"),
            sha1_hex(b"payload")
        );
        assert_eq!(name, expected);
        assert_eq!(content_address("favicon.ico", b"payload"), name);
        assert_ne!(content_address("favicon.ico", b"other"), name);
    }
}
