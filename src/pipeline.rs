//! Run orchestrator: applies the run-wide record selection, dispatches to
//! the requested report, and gathers run summaries.

use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::info;

use crate::caller::CallMode;
use crate::config::RunConfig;
use crate::error::{Result, VclrError};
use crate::molecule::{call_gatc_methylation, call_single_molecules, call_sites};
use crate::record::{AlignmentSet, Strand};
use crate::report::{Report, StrandRow, StrandSummary};
use crate::score::filter_by_read_score;
use crate::stats::{
    accumulate_site_stats, mean, median, pearson_correlation, percent_called_methylated,
    reference_accuracy, summarize_dyads,
};

/// Report to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Per-molecule, per-strand accuracy against the reference.
    SmVariant,
    /// Per-molecule, per-strand percent methylated.
    SmMethyl,
    /// Per-site percent methylated across molecules.
    SmSiteStats,
    /// Per-site consensus, strand-corrected by default.
    Variant,
    /// Per-site consensus, raw by default.
    Methyl,
    /// Per-molecule dyad methylation; `per_dyad` lists individual dyads.
    Gatc {
        /// Emit one row per dyad instead of one per molecule.
        per_dyad: bool,
    },
}

/// Rows plus run-level summaries of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// Per-record report.
    pub report: Report,
    /// Run summaries, kept apart from the report rows.
    pub summaries: Vec<StrandSummary>,
}

/// Owns the configuration and worker pool for one run.
#[derive(Debug)]
pub struct Pipeline {
    config: RunConfig,
    pool: ThreadPool,
}

impl Pipeline {
    /// Validate `config` and start the worker pool.
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        let mut builder = ThreadPoolBuilder::new();
        if let Some(threads) = config.threads {
            builder = builder.num_threads(threads);
        }
        Ok(Self {
            config,
            pool: builder.build()?,
        })
    }

    /// Apply strand restriction and read-score filtering.
    ///
    /// Fails when the input is empty or when filtering leaves nothing to call.
    pub fn select_records(&self, records: &AlignmentSet) -> Result<AlignmentSet> {
        if records.is_empty() {
            return Err(VclrError::EmptyInput);
        }
        let mut selected = match self.config.strand {
            Some(strand) => records
                .strand_subset(strand)
                .ok_or(VclrError::EmptyStrand(strand.name()))?,
            None => records.clone(),
        };
        if self.config.read_score_threshold > 0.0 {
            selected = filter_by_read_score(&selected, self.config.read_score_threshold)?;
            if selected.is_empty() {
                return Err(VclrError::NoUsableReads {
                    threshold: self.config.read_score_threshold,
                });
            }
        }
        info!(
            records = selected.len(),
            molecules = selected.group_by_read().len(),
            "records selected for calling"
        );
        Ok(selected)
    }

    /// Produce `tool`'s report from `records`. `reference` is required only
    /// by [`Tool::SmVariant`].
    pub fn run(&self, tool: Tool, records: &AlignmentSet, reference: Option<&[u8]>) -> Result<RunOutput> {
        let selected = self.select_records(records)?;
        self.pool.install(|| self.dispatch(tool, &selected, reference))
    }

    fn dispatch(&self, tool: Tool, records: &AlignmentSet, reference: Option<&[u8]>) -> Result<RunOutput> {
        let threshold = self.config.call_threshold;
        let output = match tool {
            Tool::SmVariant => {
                let reference = reference.ok_or(VclrError::InvalidParameter {
                    parameter: "reference",
                    reason: "required for per-molecule variant accuracy".to_string(),
                })?;
                let mode = self.config.mode_or(CallMode::CodingStrand);
                let rows = strand_rows(records, |strand_records| {
                    let batch = call_single_molecules(strand_records, threshold, mode)?;
                    reference_accuracy(&batch, reference)
                })?;
                let summaries = summarize_rows("accuracy", &rows)?;
                RunOutput {
                    report: Report::StrandAccuracy(rows),
                    summaries,
                }
            }
            Tool::SmMethyl => {
                let mode = self.config.mode_or(CallMode::Raw);
                let rows = strand_rows(records, |strand_records| {
                    let batch = call_single_molecules(strand_records, threshold, mode)?;
                    percent_called_methylated(&batch)
                })?;
                let summaries = summarize_rows("percent methylated", &rows)?;
                RunOutput {
                    report: Report::StrandMethylation(rows),
                    summaries,
                }
            }
            Tool::SmSiteStats => {
                let mode = self.config.mode_or(CallMode::Raw);
                let stats = accumulate_site_stats(records, threshold, mode)?;
                RunOutput {
                    report: Report::SiteStats(stats.summarize()?),
                    summaries: Vec::new(),
                }
            }
            Tool::Variant | Tool::Methyl => {
                let default = if tool == Tool::Variant {
                    CallMode::CodingStrand
                } else {
                    CallMode::Raw
                };
                let sites = call_sites(records, threshold, self.config.mode_or(default))?;
                RunOutput {
                    report: Report::SiteCalls(sites),
                    summaries: Vec::new(),
                }
            }
            Tool::Gatc { per_dyad } => {
                let molecules = call_gatc_methylation(records, threshold)?;
                let report = if per_dyad {
                    Report::DyadCalls(molecules)
                } else {
                    Report::DyadSummaries(molecules.iter().filter_map(summarize_dyads).collect())
                };
                RunOutput {
                    report,
                    summaries: Vec::new(),
                }
            }
        };
        info!(?tool, rows = output.report.len(), "report complete");
        Ok(output)
    }
}

/// Evaluate `metric` on each molecule's template and complement records
/// independently. Strands a molecule lacks are reported as NaN.
fn strand_rows<F>(records: &AlignmentSet, metric: F) -> Result<Vec<StrandRow>>
where
    F: Fn(&AlignmentSet) -> Result<(f64, f64)> + Sync + Send,
{
    let evaluate = |molecule: &AlignmentSet, strand: Strand| -> Result<(f64, f64)> {
        match molecule.strand_subset(strand) {
            Some(strand_records) => metric(&strand_records),
            None => Ok((f64::NAN, f64::NAN)),
        }
    };

    records
        .group_by_read()
        .into_iter()
        .collect::<Vec<(Arc<str>, AlignmentSet)>>()
        .into_par_iter()
        .map(|(read, molecule)| -> Result<StrandRow> {
            let (template, template_score) = evaluate(&molecule, Strand::Template)?;
            let (complement, complement_score) = evaluate(&molecule, Strand::Complement)?;
            Ok(StrandRow {
                read_label: read.to_string(),
                template,
                complement,
                template_score,
                complement_score,
            })
        })
        .collect()
}

fn summarize_rows(metric: &'static str, rows: &[StrandRow]) -> Result<Vec<StrandSummary>> {
    [Strand::Template, Strand::Complement]
        .into_iter()
        .map(|strand| {
            let (values, scores): (Vec<f64>, Vec<f64>) = rows
                .iter()
                .map(|row| match strand {
                    Strand::Template => (row.template, row.template_score),
                    Strand::Complement => (row.complement, row.complement_score),
                })
                .filter(|(value, score)| !value.is_nan() && !score.is_nan())
                .unzip();
            Ok(StrandSummary {
                metric,
                strand,
                mean: mean(&values),
                median: median(&values),
                score_correlation: pearson_correlation(&values, &scores)?,
                molecules: values.len(),
            })
        })
        .collect()
}
