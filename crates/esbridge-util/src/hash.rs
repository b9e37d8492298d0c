//! Content hashing for transform cache keys.

/// Compute the BLAKE3 hash of module source text, returning the hex-encoded digest.
///
/// Used as the cache key component that decides whether a module must be
/// re-transformed after a file change.
#[must_use]
pub fn source_hash(source: &str) -> String {
    blake3_bytes(source.as_bytes())
}

/// Compute the BLAKE3 hash of a byte slice, returning the hex-encoded digest.
#[must_use]
pub fn blake3_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_bytes() {
        let hash = blake3_bytes(b"hello world");
        assert_eq!(
            hash,
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn test_source_hash_matches_bytes() {
        assert_eq!(source_hash("hello world"), blake3_bytes(b"hello world"));
    }

    #[test]
    fn test_source_hash_differs_on_edit() {
        let before = source_hash("export const a = 1;");
        let after = source_hash("export const a = 2;");
        assert_ne!(before, after);
        assert_eq!(before.len(), 64);
    }
}
