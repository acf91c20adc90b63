//! Site caller: probability-weighted consensus for one site partition.

use std::borrow::Cow;
use std::collections::BTreeMap;

use clap::ValueEnum;
use tracing::debug;

use crate::error::{Result, VclrError};
use crate::record::{AlignmentRecord, AlignmentSet};

/// Allowed deviation of the normalized masses from 1.
pub const NORMALIZATION_TOLERANCE: f64 = 0.01;

/// How record bases are aggregated before the argmax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CallMode {
    /// Sum masses per symbol exactly as each strand reports them.
    Raw,
    /// Reverse-complement non-coding observations so template and
    /// complement evidence combine into one reference-oriented call.
    #[value(name = "coding")]
    CodingStrand,
}

/// Consensus call for one site partition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SiteCall {
    /// Reference position the call refers to.
    pub position: i64,
    /// Winning symbol, `None` when no record met the threshold.
    pub base: Option<String>,
    /// Normalized mass of the winning symbol; NaN for a no-call.
    pub probability: f64,
}

impl SiteCall {
    /// Explicit no-call at `position`.
    pub fn no_call(position: i64) -> Self {
        Self {
            position,
            base: None,
            probability: f64::NAN,
        }
    }

    /// Whether this is a no-call.
    pub fn is_no_call(&self) -> bool {
        self.base.is_none()
    }

    /// Called symbol, empty for a no-call.
    pub fn symbol(&self) -> &str {
        self.base.as_deref().unwrap_or("")
    }
}

/// Watson-Crick complement of a single base symbol.
pub fn complement_base(base: &str) -> Result<&'static str> {
    match base {
        "A" => Ok("T"),
        "C" => Ok("G"),
        "G" => Ok("C"),
        "T" => Ok("A"),
        other => Err(VclrError::UnsupportedBase(other.to_string())),
    }
}

/// Record base expressed on the coding strand.
pub fn coding_strand_base(record: &AlignmentRecord) -> Result<Cow<'_, str>> {
    if record.is_coding_oriented() {
        Ok(Cow::Borrowed(record.base.as_str()))
    } else {
        complement_base(&record.base).map(Cow::Borrowed)
    }
}

/// Normalized per-symbol masses of the records at or above `threshold`.
///
/// Returns `Ok(None)` when nothing qualifies or the qualifying mass is zero.
/// Fails when the partition spans several positions or when the normalized
/// masses stray from 1 by more than [`NORMALIZATION_TOLERANCE`].
pub fn normalized_masses(
    set: &AlignmentSet,
    threshold: f64,
    mode: CallMode,
) -> Result<Option<BTreeMap<String, f64>>> {
    let position = set
        .first()
        .ok_or(VclrError::EmptyPartition("call_site"))?
        .ref_pos;

    let mut masses: BTreeMap<String, f64> = BTreeMap::new();
    for record in set.iter() {
        if record.ref_pos != position {
            return Err(VclrError::MixedSites {
                expected: position,
                found: record.ref_pos,
            });
        }
        if record.probability < threshold {
            continue;
        }
        let base = match mode {
            CallMode::Raw => Cow::Borrowed(record.base.as_str()),
            CallMode::CodingStrand => coding_strand_base(record)?,
        };
        *masses.entry(base.into_owned()).or_insert(0.0) += record.probability;
    }

    let total: f64 = masses.values().sum();
    if !total.is_finite() {
        return Err(VclrError::Normalization { position, total });
    }
    if masses.is_empty() || total <= 0.0 {
        debug!(position, records = set.len(), "no qualifying mass at site");
        return Ok(None);
    }

    masses.values_mut().for_each(|mass| *mass /= total);
    let normalized: f64 = masses.values().sum();
    let drift = (1.0 - normalized).abs();
    if !drift.is_finite() || drift > NORMALIZATION_TOLERANCE {
        return Err(VclrError::Normalization {
            position,
            total: normalized,
        });
    }
    Ok(Some(masses))
}

/// Call the most probable symbol for a single-site partition.
///
/// Ties go to the symbol that sorts first.
pub fn call_site(set: &AlignmentSet, threshold: f64, mode: CallMode) -> Result<SiteCall> {
    let position = set
        .first()
        .ok_or(VclrError::EmptyPartition("call_site"))?
        .ref_pos;
    let Some(masses) = normalized_masses(set, threshold, mode)? else {
        return Ok(SiteCall::no_call(position));
    };

    let mut best: Option<(&String, f64)> = None;
    for (base, &mass) in &masses {
        if best.map_or(true, |(_, top)| mass > top) {
            best = Some((base, mass));
        }
    }

    Ok(match best {
        Some((base, probability)) => SiteCall {
            position,
            base: Some(base.clone()),
            probability,
        },
        None => SiteCall::no_call(position),
    })
}
