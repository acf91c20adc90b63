//! Motif classifier for palindromic dyads such as GATC.
//!
//! The two strand-relative halves of the motif land on adjacent reference
//! positions `(p, p + 1)`; their single-strand calls jointly decide the
//! methylation status of the site.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::caller::SiteCall;
use crate::molecule::{Call, VariantCall};

/// Canonical (unmodified) adenine.
pub const CANONICAL_SYMBOL: &str = "A";
/// Modified adenine.
pub const MODIFIED_SYMBOL: &str = "I";

/// Methylation status of one dyad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum MethylationStatus {
    /// Both halves canonical.
    Unmethylated,
    /// Both halves modified.
    Methylated,
    /// Halves disagree.
    HemiMethylated,
    /// At least one half was a no-call.
    Unclassified,
}

impl MethylationStatus {
    /// Report label.
    pub fn as_str(&self) -> &'static str {
        match self {
            MethylationStatus::Unmethylated => "unmethylated",
            MethylationStatus::Methylated => "methylated",
            MethylationStatus::HemiMethylated => "hemi-methylated",
            MethylationStatus::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for MethylationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a dyad from the symbols called at `p` and `p + 1`.
///
/// Empty symbols are no-calls. Equal symbols other than the canonical or
/// modified adenine have no classification.
pub fn classify_dyad(first: &str, second: &str) -> Option<MethylationStatus> {
    if first.is_empty() || second.is_empty() {
        return Some(MethylationStatus::Unclassified);
    }
    if first != second {
        return Some(MethylationStatus::HemiMethylated);
    }
    match first {
        CANONICAL_SYMBOL => Some(MethylationStatus::Unmethylated),
        MODIFIED_SYMBOL => Some(MethylationStatus::Methylated),
        _ => None,
    }
}

/// Classify every dyad reported by one molecule.
///
/// Positions are taken in sorted order two at a time; each pair's first
/// position `p` is paired with `p + 1`. Pairs missing either half are
/// skipped.
pub fn call_dyads(
    calls: &BTreeMap<i64, SiteCall>,
    read_label: &Arc<str>,
    read_score: f64,
) -> Vec<VariantCall> {
    let sites: Vec<i64> = calls.keys().copied().collect();
    let mut dyads = Vec::with_capacity(sites.len() / 2);

    for &site in sites.iter().step_by(2) {
        let (Some(first), Some(second)) = (calls.get(&site), calls.get(&(site + 1))) else {
            debug!(read = %read_label, site, "skipping dyad missing one half");
            continue;
        };
        match classify_dyad(first.symbol(), second.symbol()) {
            Some(status) => dyads.push(VariantCall {
                ref_pos: site,
                read_label: Arc::clone(read_label),
                read_score,
                call: Call::Dyad(status),
            }),
            None => debug!(
                read = %read_label,
                site,
                base = first.symbol(),
                "dyad halves agree on an unclassifiable symbol"
            ),
        }
    }
    dyads
}
