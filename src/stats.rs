//! Aggregation and summary statistics over calls.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::caller::CallMode;
use crate::error::{Result, VclrError};
use crate::molecule::{call_molecule_sites, Call, MoleculeCalls};
use crate::motif::MethylationStatus;
use crate::record::AlignmentSet;

/// Symbols counted as modified bases.
pub const METHYLATED_SYMBOLS: [&str; 2] = ["I", "E"];

/// Whether `symbol` denotes a modified base.
pub fn is_methylated_symbol(symbol: &str) -> bool {
    METHYLATED_SYMBOLS.contains(&symbol)
}

fn single_molecule(batch: &[MoleculeCalls]) -> Result<&MoleculeCalls> {
    match batch {
        [molecule] => Ok(molecule),
        _ => Err(VclrError::MultiMoleculeBatch(batch.len())),
    }
}

/// Percentage of a molecule's calls matching the reference base, together
/// with the molecule's read score.
///
/// `batch` must hold exactly one molecule. No-calls count as mismatches.
pub fn reference_accuracy(batch: &[MoleculeCalls], reference: &[u8]) -> Result<(f64, f64)> {
    let molecule = single_molecule(batch)?;
    let mut correct = 0usize;
    for call in &molecule.calls {
        let expected = usize::try_from(call.ref_pos)
            .ok()
            .and_then(|idx| reference.get(idx))
            .ok_or(VclrError::ReferenceOutOfRange {
                position: call.ref_pos,
                length: reference.len(),
            })?;
        if call.call.symbol().as_bytes() == std::slice::from_ref(expected) {
            correct += 1;
        }
    }
    Ok((
        percentage(correct, molecule.calls.len()),
        molecule.read_score,
    ))
}

/// Percentage of a molecule's calls that are modified bases, together with
/// the molecule's read score.
pub fn percent_called_methylated(batch: &[MoleculeCalls]) -> Result<(f64, f64)> {
    let molecule = single_molecule(batch)?;
    let methylated = molecule
        .calls
        .iter()
        .filter(|call| is_methylated_symbol(call.call.symbol()))
        .count();
    Ok((
        percentage(methylated, molecule.calls.len()),
        molecule.read_score,
    ))
}

fn percentage(count: usize, total: usize) -> f64 {
    100.0 * count as f64 / total as f64
}

/// Dyad methylation breakdown for one molecule.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DyadSummary {
    /// Molecule label.
    pub read_label: String,
    /// Percentage of classified dyads that were unmethylated.
    pub percent_unmethylated: f64,
    /// Percentage of classified dyads that were methylated.
    pub percent_methylated: f64,
    /// Percentage of classified dyads that were hemi-methylated.
    pub percent_hemi_methylated: f64,
    /// Classified dyads (unclassified ones excluded).
    pub classified: usize,
    /// Molecule read score.
    pub read_score: f64,
}

/// Break a molecule's dyad calls down by status. `None` when the molecule
/// has no classified dyad.
pub fn summarize_dyads(molecule: &MoleculeCalls) -> Option<DyadSummary> {
    let (mut unmethylated, mut methylated, mut hemi) = (0usize, 0usize, 0usize);
    for call in &molecule.calls {
        match call.call {
            Call::Dyad(MethylationStatus::Unmethylated) => unmethylated += 1,
            Call::Dyad(MethylationStatus::Methylated) => methylated += 1,
            Call::Dyad(MethylationStatus::HemiMethylated) => hemi += 1,
            _ => {}
        }
    }
    let classified = unmethylated + methylated + hemi;
    (classified > 0).then(|| DyadSummary {
        read_label: molecule.read_label.to_string(),
        percent_unmethylated: percentage(unmethylated, classified),
        percent_methylated: percentage(methylated, classified),
        percent_hemi_methylated: percentage(hemi, classified),
        classified,
        read_score: molecule.read_score,
    })
}

/// Counts of modified vs. all calls observed at one site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiteCallStats {
    methylated: usize,
    calls: usize,
}

impl SiteCallStats {
    /// Record one molecule's call at the site.
    pub fn add_call(&mut self, call: &Call) {
        if is_methylated_symbol(call.symbol()) {
            self.methylated += 1;
        }
        self.calls += 1;
    }

    /// Combine counts from another accumulator for the same site.
    pub fn merge(&mut self, other: &SiteCallStats) {
        self.methylated += other.methylated;
        self.calls += other.calls;
    }

    /// Percentage of calls that were modified bases.
    pub fn percent_methylated(&self) -> f64 {
        percentage(self.methylated, self.calls)
    }

    /// `100 - percent_methylated`.
    pub fn percent_canonical(&self) -> f64 {
        100.0 - self.percent_methylated()
    }

    /// Total calls observed.
    pub fn number_of_calls(&self) -> usize {
        self.calls
    }
}

/// Summary row for one site.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SiteSummary {
    /// Reference position.
    pub site: i64,
    /// Percentage of modified-base calls.
    pub percent_methylated: f64,
    /// Percentage of canonical calls.
    pub percent_canonical: f64,
    /// Number of contributing molecules.
    pub calls: usize,
}

/// Per-site statistics for one aggregation pass.
///
/// Sites are created the first time a molecule reports on them. Partial
/// accumulators built by different workers combine with [`merge`], which is
/// commutative.
///
/// [`merge`]: SiteStatsAccumulator::merge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteStatsAccumulator {
    sites: BTreeMap<i64, SiteCallStats>,
}

impl SiteStatsAccumulator {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call at `site`.
    pub fn observe(&mut self, site: i64, call: &Call) {
        self.sites.entry(site).or_default().add_call(call);
    }

    /// Fold another accumulator into this one.
    pub fn merge(mut self, other: SiteStatsAccumulator) -> Self {
        for (site, stats) in other.sites {
            self.sites.entry(site).or_default().merge(&stats);
        }
        self
    }

    /// Statistics for one site.
    pub fn get(&self, site: i64) -> Option<&SiteCallStats> {
        self.sites.get(&site)
    }

    /// Number of sites seen.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Whether no site has been observed.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Summary rows in site order. Fails when nothing was accumulated.
    pub fn summarize(&self) -> Result<Vec<SiteSummary>> {
        if self.sites.is_empty() {
            return Err(VclrError::NoSiteCalls);
        }
        Ok(self
            .sites
            .iter()
            .map(|(&site, stats)| SiteSummary {
                site,
                percent_methylated: stats.percent_methylated(),
                percent_canonical: stats.percent_canonical(),
                calls: stats.number_of_calls(),
            })
            .collect())
    }
}

/// Call every site of every molecule and accumulate per-site methylation
/// counts. Molecules are processed in parallel and their partial
/// accumulators merged.
pub fn accumulate_site_stats(
    set: &AlignmentSet,
    threshold: f64,
    mode: CallMode,
) -> Result<SiteStatsAccumulator> {
    set.group_by_read()
        .into_values()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|records| -> Result<SiteStatsAccumulator> {
            let mut partial = SiteStatsAccumulator::new();
            for (site, call) in call_molecule_sites(&records, threshold, mode)? {
                partial.observe(site, &Call::from(&call));
            }
            Ok(partial)
        })
        .try_reduce(SiteStatsAccumulator::new, |left, right| Ok(left.merge(right)))
}

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median; NaN for an empty slice. Even lengths average the middle pair.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Pearson correlation of two equal-length sequences.
///
/// NaN when fewer than two points are given or either side is constant.
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> Result<f64> {
    if xs.len() != ys.len() {
        return Err(VclrError::LengthMismatch {
            left: xs.len(),
            right: ys.len(),
        });
    }
    if xs.len() < 2 {
        return Ok(f64::NAN);
    }

    let (mean_x, mean_y) = (mean(xs), mean(ys));
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (&x, &y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mean_x, y - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return Ok(f64::NAN);
    }
    Ok(cov / (var_x * var_y).sqrt())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::molecule::VariantCall;

    fn molecule(label: &str, calls: &[(i64, Call)]) -> MoleculeCalls {
        let read_label: Arc<str> = Arc::from(label);
        MoleculeCalls {
            read_label: Arc::clone(&read_label),
            read_score: 80.0,
            calls: calls
                .iter()
                .map(|(pos, call)| VariantCall {
                    ref_pos: *pos,
                    read_label: Arc::clone(&read_label),
                    read_score: 80.0,
                    call: call.clone(),
                })
                .collect(),
        }
    }

    fn base(symbol: &str) -> Call {
        Call::Base(symbol.to_string())
    }

    #[test]
    fn accuracy_against_reference() {
        let batch = vec![molecule(
            "r",
            &[(0, base("A")), (1, base("A")), (2, base("G")), (3, Call::NoCall)],
        )];
        let (accuracy, score) = reference_accuracy(&batch, b"AAGT").unwrap();
        assert!((accuracy - 75.0).abs() < 1e-9);
        assert_eq!(score, 80.0);
    }

    #[test]
    fn accuracy_rejects_multi_molecule_batches() {
        let batch = vec![molecule("a", &[]), molecule("b", &[])];
        assert!(matches!(
            reference_accuracy(&batch, b"A"),
            Err(VclrError::MultiMoleculeBatch(2))
        ));
        assert!(matches!(
            percent_called_methylated(&batch),
            Err(VclrError::MultiMoleculeBatch(2))
        ));
    }

    #[test]
    fn accuracy_rejects_positions_past_reference() {
        let batch = vec![molecule("r", &[(9, base("A"))])];
        assert!(matches!(
            reference_accuracy(&batch, b"ACGT"),
            Err(VclrError::ReferenceOutOfRange { position: 9, length: 4 })
        ));
    }

    #[test]
    fn percent_methylated_counts_both_symbols() {
        let batch = vec![molecule(
            "r",
            &[(0, base("I")), (1, base("E")), (2, base("A")), (3, Call::NoCall)],
        )];
        let (percent, _) = percent_called_methylated(&batch).unwrap();
        assert!((percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn dyad_summary_ignores_unclassified() {
        let summary = summarize_dyads(&molecule(
            "r",
            &[
                (0, Call::Dyad(MethylationStatus::Methylated)),
                (2, Call::Dyad(MethylationStatus::Methylated)),
                (4, Call::Dyad(MethylationStatus::HemiMethylated)),
                (6, Call::Dyad(MethylationStatus::Unmethylated)),
                (8, Call::Dyad(MethylationStatus::Unclassified)),
            ],
        ))
        .unwrap();
        assert_eq!(summary.classified, 4);
        assert_eq!(summary.percent_methylated, 50.0);
        assert_eq!(summary.percent_hemi_methylated, 25.0);
        assert_eq!(summary.percent_unmethylated, 25.0);

        let only_unclassified = molecule("u", &[(0, Call::Dyad(MethylationStatus::Unclassified))]);
        assert!(summarize_dyads(&only_unclassified).is_none());
    }

    #[test]
    fn site_stats_merge_is_commutative() {
        let mut left = SiteStatsAccumulator::new();
        left.observe(5, &base("I"));
        left.observe(6, &base("A"));
        let mut right = SiteStatsAccumulator::new();
        right.observe(5, &base("A"));
        right.observe(7, &Call::NoCall);

        let ab = left.clone().merge(right.clone());
        let ba = right.merge(left);
        assert_eq!(ab, ba);
        let site = ab.get(5).unwrap();
        assert_eq!(site.number_of_calls(), 2);
        assert_eq!(site.percent_methylated(), 50.0);
        assert_eq!(site.percent_canonical(), 50.0);
        assert_eq!(ab.len(), 3);
    }

    #[test]
    fn empty_accumulator_cannot_summarize() {
        assert!(matches!(
            SiteStatsAccumulator::new().summarize(),
            Err(VclrError::NoSiteCalls)
        ));
    }

    #[test]
    fn mean_and_median() {
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert!(mean(&[]).is_nan());
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn pearson_correlation_cases() {
        let r = pearson_correlation(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
        let r = pearson_correlation(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
        assert!(pearson_correlation(&[1.0], &[1.0]).unwrap().is_nan());
        assert!(pearson_correlation(&[1.0, 1.0], &[1.0, 2.0]).unwrap().is_nan());
        assert!(matches!(
            pearson_correlation(&[1.0], &[1.0, 2.0]),
            Err(VclrError::LengthMismatch { left: 1, right: 2 })
        ));
    }
}
