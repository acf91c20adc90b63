//! Per-molecule and per-site calling pipelines.
//!
//! Molecules are independent, so each pipeline fans out over the read
//! partitions on the current rayon pool and gathers the results in read
//! label order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;

use crate::caller::{call_site, CallMode, SiteCall};
use crate::error::Result;
use crate::motif::{call_dyads, MethylationStatus};
use crate::record::AlignmentSet;
use crate::score::score_read;

/// Value carried by a [`VariantCall`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Call {
    /// Consensus base symbol.
    Base(String),
    /// No record met the probability threshold.
    NoCall,
    /// Methylation status of a dyad.
    Dyad(MethylationStatus),
}

impl Call {
    /// Text form; empty for a no-call.
    pub fn symbol(&self) -> &str {
        match self {
            Call::Base(base) => base,
            Call::NoCall => "",
            Call::Dyad(status) => status.as_str(),
        }
    }
}

impl From<&SiteCall> for Call {
    fn from(site: &SiteCall) -> Self {
        match &site.base {
            Some(base) => Call::Base(base.clone()),
            None => Call::NoCall,
        }
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One call for one molecule at one site (or dyad).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VariantCall {
    /// Reference position (first position of a dyad).
    pub ref_pos: i64,
    /// Molecule the call belongs to.
    pub read_label: Arc<str>,
    /// Score of the molecule's records.
    pub read_score: f64,
    /// Called value.
    pub call: Call,
}

/// All calls produced for one molecule.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MoleculeCalls {
    /// Molecule label.
    pub read_label: Arc<str>,
    /// Score of the records the calls were made from.
    pub read_score: f64,
    /// Calls in position order.
    pub calls: Vec<VariantCall>,
}

/// Consensus across molecules at one reference site.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SiteConsensus {
    /// Consensus call.
    pub call: SiteCall,
    /// Number of distinct molecules with records at the site.
    pub coverage: usize,
}

/// Call every site reported by a single molecule.
pub fn call_molecule_sites(
    molecule: &AlignmentSet,
    threshold: f64,
    mode: CallMode,
) -> Result<BTreeMap<i64, SiteCall>> {
    molecule
        .group_by_site()
        .into_iter()
        .map(|(site, records)| -> Result<(i64, SiteCall)> {
            Ok((site, call_site(&records, threshold, mode)?))
        })
        .collect()
}

fn for_each_molecule<F>(set: &AlignmentSet, per_molecule: F) -> Result<Vec<MoleculeCalls>>
where
    F: Fn(Arc<str>, &AlignmentSet) -> Result<MoleculeCalls> + Sync + Send,
{
    set.group_by_read()
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(read, records)| per_molecule(read, &records))
        .collect()
}

/// One site call per site per molecule.
///
/// `CallMode::CodingStrand` gives canonical variant calls, `CallMode::Raw`
/// single-strand methylation calls.
pub fn call_single_molecules(
    set: &AlignmentSet,
    threshold: f64,
    mode: CallMode,
) -> Result<Vec<MoleculeCalls>> {
    for_each_molecule(set, |read_label, records| {
        let read_score = score_read(records)?;
        let calls = call_molecule_sites(records, threshold, mode)?
            .values()
            .map(|site| VariantCall {
                ref_pos: site.position,
                read_label: Arc::clone(&read_label),
                read_score,
                call: Call::from(site),
            })
            .collect();
        Ok(MoleculeCalls {
            read_label,
            read_score,
            calls,
        })
    })
}

/// Canonical variant calls: strand-corrected consensus per site per molecule.
pub fn call_canonical_variants(set: &AlignmentSet, threshold: f64) -> Result<Vec<MoleculeCalls>> {
    call_single_molecules(set, threshold, CallMode::CodingStrand)
}

/// Single-strand methylation calls: raw consensus per site per molecule.
pub fn call_methylation(set: &AlignmentSet, threshold: f64) -> Result<Vec<MoleculeCalls>> {
    call_single_molecules(set, threshold, CallMode::Raw)
}

/// Dyad methylation calls per molecule from raw single-strand site calls.
pub fn call_gatc_methylation(set: &AlignmentSet, threshold: f64) -> Result<Vec<MoleculeCalls>> {
    for_each_molecule(set, |read_label, records| {
        let read_score = score_read(records)?;
        let site_calls = call_molecule_sites(records, threshold, CallMode::Raw)?;
        let calls = call_dyads(&site_calls, &read_label, read_score);
        Ok(MoleculeCalls {
            read_label,
            read_score,
            calls,
        })
    })
}

/// Consensus per reference site across all molecules, in position order.
pub fn call_sites(set: &AlignmentSet, threshold: f64, mode: CallMode) -> Result<Vec<SiteConsensus>> {
    set.group_by_site()
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(_, records)| -> Result<SiteConsensus> {
            let coverage = records
                .iter()
                .map(|record| &record.read_label)
                .collect::<BTreeSet<_>>()
                .len();
            Ok(SiteConsensus {
                call: call_site(&records, threshold, mode)?,
                coverage,
            })
        })
        .collect()
}
