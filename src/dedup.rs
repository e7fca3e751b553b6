// Per-run record of which content identifiers are already materialized.
//
// The forward direction consults it before emitting a nested-header or
// payload block; the reverse direction uses it to notice content blocks
// that show up more than once. A tracker is owned by one transcoder and
// dropped with it, so equal content in two separate runs never dedups.

use std::collections::HashSet;

use cid::Cid;

#[derive(Debug, Default)]
pub struct DedupTracker {
    seen: HashSet<Cid>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `cid` was already marked in this run.
    #[inline]
    pub fn seen(&self, cid: &Cid) -> bool {
        self.seen.contains(cid)
    }

    /// Mark `cid` as materialized. Returns `true` if it was not seen before.
    #[inline]
    pub fn mark_seen(&mut self, cid: Cid) -> bool {
        self.seen.insert(cid)
    }

    /// Number of distinct identifiers marked so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_id::{Codec, identify};

    #[test]
    fn mark_then_seen() {
        let mut t = DedupTracker::new();
        let cid = identify(Codec::Raw, b"abc");
        assert!(!t.seen(&cid));
        assert!(t.mark_seen(cid));
        assert!(t.seen(&cid));
        assert!(!t.mark_seen(cid));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn trackers_are_independent() {
        let cid = identify(Codec::Raw, b"shared");
        let mut first = DedupTracker::new();
        first.mark_seen(cid);
        let second = DedupTracker::new();
        assert!(!second.seen(&cid));
        assert!(second.is_empty());
    }
}
