//! Grouping index: partitions a record set by molecule, site, or strand.
//!
//! Groups are returned in a `BTreeMap` so iteration follows key order and
//! every report built from them is reproducible.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::record::{AlignmentRecord, AlignmentSet, Strand};

/// Partition `set` by an arbitrary key. Every record lands in exactly one
/// group; an empty set yields an empty map.
pub fn group_by<K, F>(set: &AlignmentSet, key: F) -> BTreeMap<K, AlignmentSet>
where
    K: Ord,
    F: Fn(&AlignmentRecord) -> K,
{
    let mut groups: BTreeMap<K, AlignmentSet> = BTreeMap::new();
    for record in set.shared() {
        groups
            .entry(key(record.as_ref()))
            .or_default()
            .push_shared(Arc::clone(record));
    }
    groups
}

impl AlignmentSet {
    /// Records grouped by molecule/read label.
    pub fn group_by_read(&self) -> BTreeMap<Arc<str>, AlignmentSet> {
        group_by(self, |record| Arc::clone(&record.read_label))
    }

    /// Records grouped by reference position.
    pub fn group_by_site(&self) -> BTreeMap<i64, AlignmentSet> {
        group_by(self, |record| record.ref_pos)
    }

    /// Records grouped by strand.
    pub fn group_by_strand(&self) -> BTreeMap<Strand, AlignmentSet> {
        group_by(self, |record| record.strand)
    }

    /// Records on one strand, or `None` when the strand is absent.
    pub fn strand_subset(&self, strand: Strand) -> Option<AlignmentSet> {
        let subset: AlignmentSet = self
            .shared()
            .iter()
            .filter(|record| record.strand == strand)
            .cloned()
            .collect();
        (!subset.is_empty()).then_some(subset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Orientation;

    fn sample() -> AlignmentSet {
        AlignmentSet::from_records(vec![
            AlignmentRecord::new(5, "A", 0.9, Strand::Template, Orientation::Forward, "r2"),
            AlignmentRecord::new(6, "A", 0.8, Strand::Complement, Orientation::Reverse, "r1"),
            AlignmentRecord::new(5, "I", 0.2, Strand::Template, Orientation::Forward, "r1"),
            AlignmentRecord::new(6, "T", 0.4, Strand::Complement, Orientation::Forward, "r2"),
        ])
    }

    #[test]
    fn groups_by_read_in_label_order() {
        let groups = sample().group_by_read();
        let labels: Vec<&str> = groups.keys().map(|k| k.as_ref()).collect();
        assert_eq!(labels, vec!["r1", "r2"]);
        assert_eq!(groups.values().map(AlignmentSet::len).sum::<usize>(), 4);
    }

    #[test]
    fn groups_by_site_and_strand() {
        let set = sample();
        let by_site = set.group_by_site();
        assert_eq!(by_site.keys().copied().collect::<Vec<_>>(), vec![5, 6]);
        for (site, group) in &by_site {
            assert!(group.iter().all(|r| r.ref_pos == *site));
        }

        let by_strand = set.group_by_strand();
        assert_eq!(by_strand.len(), 2);
        for (strand, group) in &by_strand {
            assert!(group.iter().all(|r| r.strand == *strand));
        }
    }

    #[test]
    fn empty_input_yields_empty_map() {
        assert!(AlignmentSet::new().group_by_read().is_empty());
        assert!(AlignmentSet::new().strand_subset(Strand::Template).is_none());
    }

    #[test]
    fn strand_subset_filters() {
        let template = sample().strand_subset(Strand::Template).unwrap();
        assert_eq!(template.len(), 2);
        assert!(template.iter().all(|r| r.strand == Strand::Template));
    }
}
