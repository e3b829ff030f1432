//! Annotation sets attached to the root of a logical query.
//!
//! A [`TagSet`] is an insertion-ordered set of opaque strings. Hint tags and
//! user comments live in the same set; the emitter decides which of them
//! become trailing clauses and which are written as `-- tag` header lines.

use std::sync::Arc;

/// Insertion-ordered set of opaque tag values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<Arc<str>>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| &**t == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| &**t)
    }

    /// Return a copy of this set with `tag` added (no-op if present).
    pub fn with(&self, tag: &str) -> TagSet {
        let mut next = self.clone();
        next.insert(tag);
        next
    }

    /// Add `tag` if absent. Returns `true` if it was added.
    pub(crate) fn insert(&mut self, tag: &str) -> bool {
        if self.contains(tag) {
            return false;
        }
        self.tags.push(Arc::from(tag));
        true
    }

    /// Remove and return every tag matching `pred`, in insertion order.
    pub fn take_matching(&mut self, mut pred: impl FnMut(&str) -> bool) -> Vec<Arc<str>> {
        let mut taken = Vec::new();
        self.tags.retain(|t| {
            if pred(t) {
                taken.push(Arc::clone(t));
                false
            } else {
                true
            }
        });
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagset_insertion_order() {
        let tags = TagSet::new().with("b").with("a").with("c");
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_tagset_with_is_idempotent() {
        let tags = TagSet::new().with("a").with("a");
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_tagset_with_leaves_original_untouched() {
        let original = TagSet::new().with("a");
        let derived = original.with("b");
        assert_eq!(original.len(), 1);
        assert_eq!(derived.len(), 2);
        assert!(!original.contains("b"));
    }

    #[test]
    fn test_tagset_take_matching() {
        let mut tags = TagSet::new().with("keep").with("x1").with("x2");
        let taken = tags.take_matching(|t| t.starts_with('x'));
        assert_eq!(taken.len(), 2);
        assert_eq!(&*taken[0], "x1");
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["keep"]);
    }

    #[test]
    fn test_tagset_empty() {
        let tags = TagSet::new();
        assert!(tags.is_empty());
        assert!(!tags.contains(""));
    }
}
