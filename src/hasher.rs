//! Canonical token hashing with a bounded memo
//!
//! A token's identity is the SHA-256 of its fields serialized in sorted key
//! order, so two tokens with the same fields hash equal no matter how they
//! were built. Recent results are memoized in a bounded LRU cache owned by the
//! hasher.

use crate::token::{Token, TokenHash};
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use sha2::{Digest, Sha256};

/// Default number of memoized digests
pub const DEFAULT_MEMO_CAPACITY: usize = 512;

/// Serialize `(key, value)` pairs in sorted key order.
///
/// Each key and value is length-prefixed so no two distinct field sets can
/// produce the same string.
pub fn canonical_form<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut fields: Vec<_> = fields.into_iter().collect();
    fields.sort_unstable();

    let mut out = String::new();
    for (key, value) in fields {
        out.push_str(&format!("{}:{}={}:{};", key.len(), key, value.len(), value));
    }
    out
}

/// Computes token identity hashes
#[derive(Debug)]
pub struct TokenHasher {
    /// Canonical form to digest; `None` when memoization is off
    memo: Option<Cache<String, TokenHash>>,
}

impl TokenHasher {
    /// Create a hasher with the default memo capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMO_CAPACITY)
    }

    /// Create a hasher memoizing at most `capacity` digests
    pub fn with_capacity(capacity: usize) -> Self {
        let memo = (capacity > 0).then(|| {
            Cache::builder()
                .max_capacity(capacity as u64)
                .eviction_policy(EvictionPolicy::lru())
                .build()
        });
        Self { memo }
    }

    /// Identity hash of a token
    pub fn hash(&self, token: &Token) -> TokenHash {
        self.hash_fields(token.fields())
    }

    /// Identity hash of an arbitrary field set
    pub fn hash_fields<'a>(
        &self,
        fields: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> TokenHash {
        let canonical = canonical_form(fields);
        let digest = |canonical: &str| TokenHash::from(hex::encode(Sha256::digest(canonical)));

        match &self.memo {
            Some(memo) => memo.get_with_by_ref(canonical.as_str(), || digest(&canonical)),
            None => digest(&canonical),
        }
    }

    /// Number of memoized digests, after applying pending evictions
    pub fn memo_len(&self) -> usize {
        self.memo.as_ref().map_or(0, |memo| {
            memo.run_pending_tasks();
            memo.entry_count() as usize
        })
    }

    #[cfg(test)]
    fn is_memoized(&self, fields: &[(&str, &str)]) -> bool {
        let canonical = canonical_form(fields.iter().copied());
        self.memo
            .as_ref()
            .is_some_and(|memo| memo.contains_key(canonical.as_str()))
    }
}

impl Default for TokenHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_order_does_not_matter() {
        let hasher = TokenHasher::new();
        let a = hasher.hash_fields([("b", "1"), ("a", "2")]);
        let b = hasher.hash_fields([("a", "2"), ("b", "1")]);
        assert_eq!(a, b);
    }

    #[test]
    fn tokens_built_in_any_order_hash_equal() {
        let hasher = TokenHasher::new();
        let a = Token::parse(r#"{"org":"a","repo":"b","path":"f.txt"}"#).unwrap();
        let b = Token::parse(r#"{"path":"f.txt","repo":"b","org":"a"}"#).unwrap();
        assert_eq!(hasher.hash(&a), hasher.hash(&b));
    }

    #[test]
    fn values_affect_hash() {
        let hasher = TokenHasher::new();
        let a = hasher.hash(&Token::repo_file("a", "b", "f.txt"));
        let b = hasher.hash(&Token::repo_file("a", "b", "g.txt"));
        assert_ne!(a, b);
    }

    #[test]
    fn newer_changes_hash() {
        let hasher = TokenHasher::new();
        let token = Token::repo_file("a", "b", "f.txt");
        let current = hasher.hash(&token);
        let historical = hasher.hash(&token.superseded_by(&current));
        assert_ne!(current, historical);
    }

    #[test]
    fn digest_is_hex_sha256_of_canonical_form() {
        let hasher = TokenHasher::new();
        let digest = hasher.hash_fields([("a", "2")]);
        let expected = hex::encode(Sha256::digest(b"1:a=1:2;"));
        assert_eq!(digest.as_str(), expected);
        assert_eq!(digest.as_str().len(), 64);
    }

    #[test]
    fn canonical_form_is_unambiguous() {
        assert_ne!(
            canonical_form([("a", "b;1:c=1:d")]),
            canonical_form([("a", "b"), ("c", "d")])
        );
    }

    #[test]
    fn memo_is_bounded() {
        let hasher = TokenHasher::with_capacity(2);
        hasher.hash_fields([("a", "1")]);
        hasher.hash_fields([("a", "2")]);
        hasher.hash_fields([("a", "3")]);
        assert_eq!(hasher.memo_len(), 2);
    }

    #[test]
    fn memo_evicts_least_recently_used() {
        let hasher = TokenHasher::with_capacity(2);
        hasher.hash_fields([("a", "x")]);
        hasher.hash_fields([("a", "y")]);
        hasher.memo_len();

        hasher.hash_fields([("a", "x")]);
        hasher.memo_len();

        hasher.hash_fields([("a", "z")]);
        assert_eq!(hasher.memo_len(), 2);

        assert!(hasher.is_memoized(&[("a", "x")]));
        assert!(!hasher.is_memoized(&[("a", "y")]));
        assert!(hasher.is_memoized(&[("a", "z")]));
    }

    #[test]
    fn memoized_digest_matches_fresh_digest() {
        let memoized = TokenHasher::new();
        let first = memoized.hash_fields([("a", "1")]);
        let second = memoized.hash_fields([("a", "1")]);
        assert_eq!(first, second);
        assert_eq!(first, TokenHasher::with_capacity(0).hash_fields([("a", "1")]));
        assert_eq!(memoized.memo_len(), 1);
    }

    #[test]
    fn zero_capacity_disables_memo() {
        let hasher = TokenHasher::with_capacity(0);
        let a = hasher.hash_fields([("a", "1")]);
        let b = hasher.hash_fields([("a", "1")]);
        assert_eq!(a, b);
        assert_eq!(hasher.memo_len(), 0);
    }
}
