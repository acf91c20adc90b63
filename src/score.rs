//! Read-score filter.

use tracing::debug;

use crate::error::{Result, VclrError};
use crate::record::{AlignmentSet, Strand};

/// Mean record probability of one molecule, scaled to 0-100.
///
/// The set must hold records of a single read; group by read (and by
/// strand, for per-strand scores) before calling.
pub fn score_read(set: &AlignmentSet) -> Result<f64> {
    let first = set.first().ok_or(VclrError::EmptyPartition("score_read"))?;
    let mut total = 0.0;
    for record in set.iter() {
        if record.read_label != first.read_label {
            return Err(VclrError::MixedReads {
                expected: first.read_label.to_string(),
                found: record.read_label.to_string(),
            });
        }
        total += record.probability;
    }
    Ok(100.0 * total / set.len() as f64)
}

/// Keep each molecule's template and complement records independently when
/// that strand's score meets `threshold`.
pub fn filter_by_read_score(set: &AlignmentSet, threshold: f64) -> Result<AlignmentSet> {
    let mut filtered = AlignmentSet::new();
    for (read, records) in set.group_by_read() {
        for strand in [Strand::Template, Strand::Complement] {
            let Some(strand_records) = records.strand_subset(strand) else {
                continue;
            };
            let score = score_read(&strand_records)?;
            if score >= threshold {
                filtered.extend_from(&strand_records);
            } else {
                debug!(read = %read, strand = %strand, score, threshold, "dropping strand below read-score threshold");
            }
        }
    }
    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AlignmentRecord, Orientation};

    fn record(prob: f64, strand: Strand, read: &str) -> AlignmentRecord {
        AlignmentRecord::new(1, "A", prob, strand, Orientation::Forward, read)
    }

    #[test]
    fn score_is_scaled_mean() {
        let set = AlignmentSet::from_records(vec![
            record(0.5, Strand::Template, "r"),
            record(1.0, Strand::Template, "r"),
        ]);
        assert!((score_read(&set).unwrap() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn score_rejects_mixed_reads() {
        let set = AlignmentSet::from_records(vec![
            record(0.5, Strand::Template, "r1"),
            record(0.5, Strand::Template, "r2"),
        ]);
        assert!(matches!(score_read(&set), Err(VclrError::MixedReads { .. })));
        assert!(matches!(
            score_read(&AlignmentSet::new()),
            Err(VclrError::EmptyPartition(_))
        ));
    }

    #[test]
    fn filter_keeps_strands_independently() {
        let set = AlignmentSet::from_records(vec![
            record(0.9, Strand::Template, "r1"),
            record(0.2, Strand::Complement, "r1"),
            record(0.3, Strand::Template, "r2"),
            record(0.8, Strand::Complement, "r2"),
            record(0.1, Strand::Template, "r3"),
        ]);
        let filtered = filter_by_read_score(&set, 50.0).unwrap();
        assert_eq!(filtered.len(), 2);
        let kept: Vec<(&str, Strand)> = filtered
            .iter()
            .map(|r| (r.read_label.as_ref(), r.strand))
            .collect();
        assert_eq!(
            kept,
            vec![("r1", Strand::Template), ("r2", Strand::Complement)]
        );
    }

    #[test]
    fn threshold_is_inclusive() {
        let set = AlignmentSet::from_records(vec![record(0.5, Strand::Template, "r")]);
        assert_eq!(filter_by_read_score(&set, 50.0).unwrap().len(), 1);
    }
}
