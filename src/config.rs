//! Operating parameters supplied once per run.

use clap::ValueEnum;

use crate::caller::CallMode;
use crate::error::{Result, VclrError};
use crate::record::Strand;

/// How unparsable numeric fields in the alignment table are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum NumericPolicy {
    /// Abort the run, reporting line and column.
    #[default]
    Strict,
    /// Coerce the field to zero and log a warning.
    Lenient,
}

/// Configuration parameters for a calling run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Minimum record probability for inclusion in a site call (inclusive).
    pub call_threshold: f64,
    /// Minimum per-strand read score; filtering happens only when > 0.
    pub read_score_threshold: f64,
    /// Restrict the run to one strand.
    pub strand: Option<Strand>,
    /// Override the calling mode a report would otherwise use.
    pub mode: Option<CallMode>,
    /// Treatment of malformed numeric input.
    pub numeric_policy: NumericPolicy,
    /// Worker threads for per-molecule calling (`None` lets rayon decide).
    pub threads: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            call_threshold: 0.0,
            read_score_threshold: 0.0,
            strand: None,
            mode: None,
            numeric_policy: NumericPolicy::Strict,
            threads: None,
        }
    }
}

impl RunConfig {
    /// Set the per-record probability threshold.
    pub fn with_call_threshold(mut self, threshold: f64) -> Self {
        self.call_threshold = threshold;
        self
    }

    /// Set the per-strand read-score threshold.
    pub fn with_read_score_threshold(mut self, threshold: f64) -> Self {
        self.read_score_threshold = threshold;
        self
    }

    /// Restrict calling to a single strand.
    pub fn with_strand(mut self, strand: Option<Strand>) -> Self {
        self.strand = strand;
        self
    }

    /// Force a calling mode.
    pub fn with_mode(mut self, mode: Option<CallMode>) -> Self {
        self.mode = mode;
        self
    }

    /// Choose the numeric parse policy.
    pub fn with_numeric_policy(mut self, policy: NumericPolicy) -> Self {
        self.numeric_policy = policy;
        self
    }

    /// Fix the worker thread count.
    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    /// Calling mode to use, falling back to the report's default.
    pub fn mode_or(&self, default: CallMode) -> CallMode {
        self.mode.unwrap_or(default)
    }

    /// Check every parameter lies in its valid range.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.call_threshold) {
            return Err(VclrError::InvalidParameter {
                parameter: "threshold",
                reason: format!("{} must lie in [0, 1]", self.call_threshold),
            });
        }
        if !(0.0..=100.0).contains(&self.read_score_threshold) {
            return Err(VclrError::InvalidParameter {
                parameter: "read-score",
                reason: format!("{} must lie in [0, 100]", self.read_score_threshold),
            });
        }
        if self.threads == Some(0) {
            return Err(VclrError::InvalidParameter {
                parameter: "threads",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
