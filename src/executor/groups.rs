//! Runtime write-group store for one query (§4.4, §4.5).
//!
//! Distinct from `optimizer::groups`, which only allocates the *static*
//! `GroupId`s baked into the `Annotated` tree at optimize time. This module
//! holds the *live* per-query values those ids point to while the prefilter
//! and threaded executors run.
//!
//! A write group starts unconstrained (no entry: "no restriction yet", not
//! "empty"). Every producer that finishes narrows its group by intersecting
//! its own result in — for an AND-shared group (§4.2(d): AND siblings
//! inherit one write group, unchanged) this means each sibling's finish
//! tightens what the next sibling reads, which is exactly the
//! sibling-narrowing behaviour `optimizer::groups` was built to support; for
//! every other group there is exactly one producer, so "narrow" degenerates
//! to a plain first write.
//!
//! Entries are keyed by `(GroupId, IdSpace)`, not bare `GroupId`. A
//! column-scope child reuses its parent's `GroupId` unchanged (§4.2(d)
//! "Column-scope child: inherits"), but the leaves on either side of the
//! scope boundary produce values in different id spaces — a keyword sibling
//! outside writes dataset ids, a column-name leaf just inside writes column
//! ids. Keying by space keeps those two values distinct under the same
//! numeric id; `ColumnScope`'s executor-level job (§4.4) is exactly to
//! bridge the two keyed entries by converting one into the other at the
//! boundary.

use crate::candidates::IdSet;
use crate::executor::IdSpace;
use crate::optimizer::GroupId;
use parking_lot::RwLock;
use std::collections::HashMap;

pub struct GroupStore {
    entries: RwLock<HashMap<(GroupId, IdSpace), IdSet>>,
}

impl GroupStore {
    pub fn new() -> Self {
        GroupStore { entries: RwLock::new(HashMap::new()) }
    }

    /// The candidate set for a read list in a given id space: the
    /// intersection of every group in the list that has published a value
    /// in that space. `None` means no restriction.
    pub fn candidate_for(&self, read: &[GroupId], space: IdSpace) -> Option<IdSet> {
        let entries = self.entries.read();
        let sets: Vec<&IdSet> = read.iter().filter_map(|g| entries.get(&(*g, space))).collect();
        if sets.is_empty() {
            None
        } else {
            IdSet::intersect_all(sets)
        }
    }

    /// Narrows `(group, space)` by intersecting `result` into whatever is
    /// already published there (or publishes it outright if nothing has).
    pub fn narrow(&self, group: GroupId, space: IdSpace, result: &IdSet) {
        let mut entries = self.entries.write();
        entries
            .entry((group, space))
            .and_modify(|existing| *existing = existing.intersection(result))
            .or_insert_with(|| result.clone());
    }

    /// Whether every group in `read` has published at least once in
    /// `space` — the readiness predicate the threaded executor's
    /// dependency wait blocks on (§4.5).
    pub fn all_published(&self, read: &[GroupId], space: IdSpace) -> bool {
        let entries = self.entries.read();
        read.iter().all(|g| entries.contains_key(&(*g, space)))
    }
}

impl Default for GroupStore {
    fn default() -> Self {
        GroupStore::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[u32]) -> IdSet {
        v.iter().copied().collect()
    }

    #[test]
    fn unpublished_read_list_has_no_restriction() {
        let store = GroupStore::new();
        assert!(store.candidate_for(&[GroupId(0)], IdSpace::Dataset).is_none());
    }

    #[test]
    fn empty_read_list_has_no_restriction() {
        let store = GroupStore::new();
        assert!(store.candidate_for(&[], IdSpace::Dataset).is_none());
    }

    #[test]
    fn single_group_candidate_is_its_published_value() {
        let store = GroupStore::new();
        store.narrow(GroupId(0), IdSpace::Dataset, &ids(&[1, 2, 3]));
        let got = store.candidate_for(&[GroupId(0)], IdSpace::Dataset).unwrap();
        let mut v: Vec<u32> = got.iter().collect();
        v.sort_unstable();
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn shared_and_group_narrows_across_successive_publications() {
        let store = GroupStore::new();
        store.narrow(GroupId(0), IdSpace::Dataset, &ids(&[1, 2, 3, 4]));
        let mut v: Vec<u32> = store.candidate_for(&[GroupId(0)], IdSpace::Dataset).unwrap().iter().collect();
        v.sort_unstable();
        assert_eq!(v, vec![1, 2, 3, 4]);

        store.narrow(GroupId(0), IdSpace::Dataset, &ids(&[2, 3]));
        let mut v: Vec<u32> = store.candidate_for(&[GroupId(0)], IdSpace::Dataset).unwrap().iter().collect();
        v.sort_unstable();
        assert_eq!(v, vec![2, 3]);
    }

    #[test]
    fn multiple_groups_in_read_list_intersect() {
        let store = GroupStore::new();
        store.narrow(GroupId(0), IdSpace::Dataset, &ids(&[1, 2, 3]));
        store.narrow(GroupId(1), IdSpace::Dataset, &ids(&[2, 3, 4]));
        let mut v: Vec<u32> =
            store.candidate_for(&[GroupId(0), GroupId(1)], IdSpace::Dataset).unwrap().iter().collect();
        v.sort_unstable();
        assert_eq!(v, vec![2, 3]);
    }

    #[test]
    fn all_published_tracks_readiness() {
        let store = GroupStore::new();
        assert!(!store.all_published(&[GroupId(0)], IdSpace::Dataset));
        store.narrow(GroupId(0), IdSpace::Dataset, &ids(&[1]));
        assert!(store.all_published(&[GroupId(0)], IdSpace::Dataset));
    }

    #[test]
    fn same_group_id_keeps_separate_values_per_space() {
        let store = GroupStore::new();
        store.narrow(GroupId(0), IdSpace::Dataset, &ids(&[1, 2]));
        store.narrow(GroupId(0), IdSpace::Column, &ids(&[9, 10, 11]));
        let mut ds: Vec<u32> = store.candidate_for(&[GroupId(0)], IdSpace::Dataset).unwrap().iter().collect();
        let mut cs: Vec<u32> = store.candidate_for(&[GroupId(0)], IdSpace::Column).unwrap().iter().collect();
        ds.sort_unstable();
        cs.sort_unstable();
        assert_eq!(ds, vec![1, 2]);
        assert_eq!(cs, vec![9, 10, 11]);
    }
}
