//! Delimited-text rendering of every report and of run summaries.

use std::fmt;
use std::io::Write;

use anyhow::{anyhow, Result};

use crate::molecule::{MoleculeCalls, SiteConsensus};
use crate::record::Strand;
use crate::stats::{DyadSummary, SiteSummary};

/// Per-molecule values for the template and complement strands; NaN marks
/// a strand the molecule did not contribute.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StrandRow {
    /// Molecule label.
    pub read_label: String,
    /// Template-strand value (accuracy or percent methylated).
    pub template: f64,
    /// Complement-strand value.
    pub complement: f64,
    /// Template read score.
    pub template_score: f64,
    /// Complement read score.
    pub complement_score: f64,
}

/// Rows produced by one run, one variant per report kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// Per-molecule reference accuracy per strand.
    StrandAccuracy(Vec<StrandRow>),
    /// Per-molecule percent methylated per strand.
    StrandMethylation(Vec<StrandRow>),
    /// Per-site consensus calls.
    SiteCalls(Vec<SiteConsensus>),
    /// Per-site methylation statistics.
    SiteStats(Vec<SiteSummary>),
    /// Per-molecule dyad breakdown.
    DyadSummaries(Vec<DyadSummary>),
    /// Individual dyad calls.
    DyadCalls(Vec<MoleculeCalls>),
}

fn num(value: f64) -> String {
    format!("{value:.4}")
}

impl Report {
    /// Number of data rows.
    pub fn len(&self) -> usize {
        match self {
            Report::StrandAccuracy(rows) | Report::StrandMethylation(rows) => rows.len(),
            Report::SiteCalls(rows) => rows.len(),
            Report::SiteStats(rows) => rows.len(),
            Report::DyadSummaries(rows) => rows.len(),
            Report::DyadCalls(molecules) => molecules.iter().map(|m| m.calls.len()).sum(),
        }
    }

    /// Whether the report has no data rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn header(&self) -> &'static str {
        match self {
            Report::StrandAccuracy(_) => {
                "read\ttemplate_accuracy\tcomplement_accuracy\ttemplate_score\tcomplement_score"
            }
            Report::StrandMethylation(_) => {
                "read\ttemplate_pct_methylated\tcomplement_pct_methylated\ttemplate_score\tcomplement_score"
            }
            Report::SiteCalls(_) => "site\tcall\tcoverage\tprob",
            Report::SiteStats(_) => "site\tpct_methylated\tpct_canonical\tn_reads",
            Report::DyadSummaries(_) => {
                "read\tpct_unmethylated\tpct_methylated\tpct_hemi_methylated\tn_dyads\tread_score"
            }
            Report::DyadCalls(_) => "status\tread\tsite\tread_score",
        }
    }

    /// Write the header and all rows, tab-separated.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "{}", self.header())?;
        match self {
            Report::StrandAccuracy(rows) | Report::StrandMethylation(rows) => {
                for row in rows {
                    writeln!(
                        writer,
                        "{}\t{}\t{}\t{}\t{}",
                        row.read_label,
                        num(row.template),
                        num(row.complement),
                        num(row.template_score),
                        num(row.complement_score)
                    )?;
                }
            }
            Report::SiteCalls(rows) => {
                for row in rows {
                    writeln!(
                        writer,
                        "{}\t{}\t{}\t{}",
                        row.call.position,
                        row.call.symbol(),
                        row.coverage,
                        num(row.call.probability)
                    )?;
                }
            }
            Report::SiteStats(rows) => {
                for row in rows {
                    writeln!(
                        writer,
                        "{}\t{}\t{}\t{}",
                        row.site,
                        num(row.percent_methylated),
                        num(row.percent_canonical),
                        row.calls
                    )?;
                }
            }
            Report::DyadSummaries(rows) => {
                for row in rows {
                    writeln!(
                        writer,
                        "{}\t{}\t{}\t{}\t{}\t{}",
                        row.read_label,
                        num(row.percent_unmethylated),
                        num(row.percent_methylated),
                        num(row.percent_hemi_methylated),
                        row.classified,
                        num(row.read_score)
                    )?;
                }
            }
            Report::DyadCalls(molecules) => {
                for call in molecules.iter().flat_map(|m| &m.calls) {
                    writeln!(
                        writer,
                        "{}\t{}\t{}\t{}",
                        call.call,
                        call.read_label,
                        call.ref_pos,
                        num(call.read_score)
                    )?;
                }
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Render the report into a string (useful for tests and snapshots).
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(&mut buffer)?;
        String::from_utf8(buffer).map_err(|_| anyhow!("rendered report is not valid UTF-8"))
    }
}

/// Run-level summary of one per-strand metric.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StrandSummary {
    /// Metric name, e.g. `accuracy`.
    pub metric: &'static str,
    /// Strand the metric was computed on.
    pub strand: Strand,
    /// Mean over molecules.
    pub mean: f64,
    /// Median over molecules.
    pub median: f64,
    /// Pearson correlation of the metric with read score.
    pub score_correlation: f64,
    /// Molecules contributing.
    pub molecules: usize,
}

impl fmt::Display for StrandSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: mean {}, median {}, correlation with read score {} (n={})",
            self.strand,
            self.metric,
            num(self.mean),
            num(self.median),
            num(self.score_correlation),
            self.molecules
        )
    }
}

/// Write run summaries, one per line.
pub fn write_summaries<W: Write>(writer: &mut W, summaries: &[StrandSummary]) -> Result<()> {
    for summary in summaries {
        writeln!(writer, "{summary}")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::SiteCall;

    #[test]
    fn site_calls_render_no_call_as_empty_and_nan() {
        let report = Report::SiteCalls(vec![
            SiteConsensus {
                call: SiteCall {
                    position: 3,
                    base: Some("A".to_string()),
                    probability: 0.875,
                },
                coverage: 2,
            },
            SiteConsensus {
                call: SiteCall::no_call(4),
                coverage: 1,
            },
        ]);
        assert_eq!(
            report.render().unwrap(),
            "site\tcall\tcoverage\tprob\n3\tA\t2\t0.8750\n4\t\t1\tNaN\n"
        );
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn strand_rows_render_missing_strand_as_nan() {
        let report = Report::StrandAccuracy(vec![StrandRow {
            read_label: "r1".to_string(),
            template: 100.0,
            complement: f64::NAN,
            template_score: 61.25,
            complement_score: f64::NAN,
        }]);
        let rendered = report.render().unwrap();
        assert!(rendered.ends_with("r1\t100.0000\tNaN\t61.2500\tNaN\n"));
    }

    #[test]
    fn summary_line() {
        let summary = StrandSummary {
            metric: "accuracy",
            strand: Strand::Template,
            mean: 90.0,
            median: 95.0,
            score_correlation: f64::NAN,
            molecules: 1,
        };
        assert_eq!(
            summary.to_string(),
            "template accuracy: mean 90.0000, median 95.0000, correlation with read score NaN (n=1)"
        );
    }
}
