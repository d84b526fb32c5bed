//! Content-addressed deduplication of text units.

use crate::indexing::chunker::TextUnit;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

/// Content-hash identity of a unit's trimmed text.
///
/// Two units with identical trimmed text always share a fingerprint,
/// regardless of source file or position. SHA-256 is used for its collision
/// behavior, not for security.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.trim().as_bytes());
        Fingerprint(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How many units the scan processes between yields to the runtime.
const YIELD_EVERY: usize = 256;

/// Filter out units whose fingerprint is already in `known`.
///
/// Every accepted fingerprint is inserted into `known`, so later units in
/// the same call, and later calls sharing the same set, see earlier
/// acceptances. The set is owned by the caller and scoped to one run; it is
/// seeded from the persisted store before the run begins. Returns the
/// surviving units and the number skipped.
///
/// The scan yields to the runtime periodically; this keeps a host
/// responsive on large corpora and has no effect on ordering.
pub async fn filter_duplicates(
    units: Vec<TextUnit>,
    known: &mut HashSet<Fingerprint>,
) -> (Vec<TextUnit>, usize) {
    let mut unique = Vec::with_capacity(units.len());
    let mut skipped = 0usize;
    for (i, unit) in units.into_iter().enumerate() {
        if i > 0 && i % YIELD_EVERY == 0 {
            tokio::task::yield_now().await;
        }
        let fingerprint = Fingerprint::of(&unit.text);
        if known.insert(fingerprint) {
            unique.push(unit);
        } else {
            skipped += 1;
        }
    }
    (unique, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(text: &str) -> TextUnit {
        TextUnit::new(text.to_string(), "doc.md".to_string(), 1, 1, 0, text.len())
    }

    #[test]
    fn test_fingerprint_ignores_surrounding_whitespace() {
        assert_eq!(Fingerprint::of("hello world"), Fingerprint::of("  hello world \n"));
        assert_ne!(Fingerprint::of("hello world"), Fingerprint::of("hello  world"));
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let fp = Fingerprint::of("hello");
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_duplicates_within_one_call() {
        let mut known = HashSet::new();
        let (unique, skipped) =
            filter_duplicates(vec![unit("a"), unit("b"), unit("a")], &mut known).await;
        assert_eq!(unique.len(), 2);
        assert_eq!(skipped, 1);
        assert_eq!(known.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicates_across_calls_sharing_a_set() {
        let mut known = HashSet::new();
        let (unique, skipped) = filter_duplicates(vec![unit("a")], &mut known).await;
        assert_eq!(unique.len(), 1);
        assert_eq!(skipped, 0);

        let (unique, skipped) = filter_duplicates(vec![unit("a"), unit("b")], &mut known).await;
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].text, "b");
        assert_eq!(skipped, 1);
    }

    #[tokio::test]
    async fn test_seeded_set_filters_everything() {
        let mut known: HashSet<Fingerprint> =
            [Fingerprint::of("a"), Fingerprint::of("b")].into_iter().collect();
        let (unique, skipped) = filter_duplicates(vec![unit("a"), unit("b")], &mut known).await;
        assert!(unique.is_empty());
        assert_eq!(skipped, 2);
    }

    #[tokio::test]
    async fn test_trimmed_text_deduplicates() {
        let mut known = HashSet::new();
        let (unique, skipped) =
            filter_duplicates(vec![unit("same text"), unit("  same text  ")], &mut known).await;
        assert_eq!(unique.len(), 1);
        assert_eq!(skipped, 1);
    }

    #[tokio::test]
    async fn test_order_preserved() {
        let mut known = HashSet::new();
        let texts = ["one", "two", "three", "two", "four"];
        let (unique, _) =
            filter_duplicates(texts.iter().map(|t| unit(t)).collect(), &mut known).await;
        let kept: Vec<&str> = unique.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(kept, vec!["one", "two", "three", "four"]);
    }
}
