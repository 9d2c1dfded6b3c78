use sha2::{Digest, Sha256};

/// Stable content fingerprint: SHA-256 over the parts joined with a newline,
/// hex-encoded. Part order matters, so callers must pass fields in a fixed order.
pub fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(b"\n");
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_deterministic() {
        let a = fingerprint(&["https://example.com/post", "a short description"]);
        let b = fingerprint(&["https://example.com/post", "a short description"]);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_different_inputs() {
        let a = fingerprint(&["https://example.com/1", "desc"]);
        let b = fingerprint(&["https://example.com/2", "desc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_is_order_sensitive() {
        let a = fingerprint(&["one", "two"]);
        let b = fingerprint(&["two", "one"]);
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_separator_prevents_boundary_collisions() {
        let a = fingerprint(&["ab", "c"]);
        let b = fingerprint(&["a", "bc"]);
        assert_ne!(a, b);
    }
}
