//! Stable digests for cache keys
//!
//! `std::hash` output is not stable across processes or Rust versions, so
//! anything that names a file on disk goes through SHA-256 instead.

use sha2::{Digest, Sha256};

use super::{CacheKey, NormalizedValue};

/// Hex-encoded SHA-256 digest of a cache key
pub fn key_digest(key: &CacheKey) -> String {
    let mut hasher = Sha256::new();
    feed_key(key, &mut hasher);
    hex::encode(hasher.finalize())
}

fn feed_str(s: &str, hasher: &mut Sha256) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn feed_key(key: &CacheKey, hasher: &mut Sha256) {
    feed_str(key.callable(), hasher);
    hasher.update((key.entries().len() as u64).to_le_bytes());
    for (name, value) in key.entries() {
        feed_str(name, hasher);
        feed_value(value, hasher);
    }
}

fn feed_value(value: &NormalizedValue, hasher: &mut Sha256) {
    match value {
        NormalizedValue::Null => {
            hasher.update([0u8]);
        }
        NormalizedValue::Bool(b) => {
            hasher.update([1u8, *b as u8]);
        }
        NormalizedValue::Int(i) => {
            hasher.update([2u8]);
            hasher.update(i.to_le_bytes());
        }
        NormalizedValue::UInt(u) => {
            hasher.update([3u8]);
            hasher.update(u.to_le_bytes());
        }
        NormalizedValue::Float(bits) => {
            hasher.update([4u8]);
            hasher.update(bits.to_le_bytes());
        }
        NormalizedValue::Str(s) => {
            hasher.update([5u8]);
            feed_str(s, hasher);
        }
        NormalizedValue::Bytes(b) => {
            hasher.update([6u8]);
            hasher.update((b.len() as u64).to_le_bytes());
            hasher.update(b);
        }
        NormalizedValue::Seq(items) => {
            hasher.update([7u8]);
            hasher.update((items.len() as u64).to_le_bytes());
            for item in items {
                feed_value(item, hasher);
            }
        }
        NormalizedValue::Pairs(pairs) => {
            hasher.update([8u8]);
            hasher.update((pairs.len() as u64).to_le_bytes());
            for (k, v) in pairs {
                feed_value(k, hasher);
                feed_value(v, hasher);
            }
        }
        NormalizedValue::Key(key) => {
            hasher.update([9u8]);
            feed_key(key, hasher);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(entries: Vec<(&str, NormalizedValue)>) -> CacheKey {
        CacheKey::from_entries(
            "f",
            entries
                .into_iter()
                .map(|(n, v)| (n.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn test_digest_is_hex_sha256() {
        let digest = key_digest(&key(vec![("a", NormalizedValue::Int(1))]));
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_digest_distinguishes_types() {
        let int = key(vec![("a", NormalizedValue::Int(1))]);
        let string = key(vec![("a", NormalizedValue::Str("1".into()))]);
        assert_ne!(key_digest(&int), key_digest(&string));
    }

    #[test]
    fn test_digest_length_prefixed() {
        // ("ab", "c") and ("a", "bc") must not collide
        let left = key(vec![(
            "x",
            NormalizedValue::Seq(vec![
                NormalizedValue::Str("ab".into()),
                NormalizedValue::Str("c".into()),
            ]),
        )]);
        let right = key(vec![(
            "x",
            NormalizedValue::Seq(vec![
                NormalizedValue::Str("a".into()),
                NormalizedValue::Str("bc".into()),
            ]),
        )]);
        assert_ne!(key_digest(&left), key_digest(&right));
    }

    #[test]
    fn test_digest_deterministic() {
        let a = key(vec![("a", NormalizedValue::Float(2.5f64.to_bits()))]);
        let b = key(vec![("a", NormalizedValue::Float(2.5f64.to_bits()))]);
        assert_eq!(key_digest(&a), key_digest(&b));
    }
}
