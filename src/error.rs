//! Error types shared by every stage of the calling engine.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for calling-engine operations.
pub type Result<T> = std::result::Result<T, VclrError>;

/// Errors raised while loading, calling, or aggregating per-base records.
///
/// Variants fall into three groups: input errors (bad files, malformed
/// lines), configuration errors (thresholds, empty strand selections), and
/// consistency errors (a partition handed to a component that expects it
/// to be homogeneous). Consistency errors indicate a bug upstream and are
/// never retried.
#[derive(Error, Debug)]
pub enum VclrError {
    /// Underlying I/O failure while reading an input file.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Original error.
        #[source]
        source: std::io::Error,
    },

    /// A line of the alignment table could not be parsed.
    #[error("line {line}, column {column}: {reason}")]
    MalformedRecord {
        /// 1-based line number.
        line: usize,
        /// 0-based column index.
        column: usize,
        /// Explanation of the problem.
        reason: String,
    },

    /// Reference file held no sequence.
    #[error("reference {path} contains no sequence")]
    EmptyReference {
        /// Path to the reference file.
        path: PathBuf,
    },

    /// A call was placed at a position the reference does not cover.
    #[error("reference position {position} out of range (reference length {length})")]
    ReferenceOutOfRange {
        /// Requested 0-based position.
        position: i64,
        /// Length of the reference sequence.
        length: usize,
    },

    /// Records spanning several reference positions reached the site caller.
    #[error("partition is not grouped by site: expected position {expected}, found {found}")]
    MixedSites {
        /// Position of the first record.
        expected: i64,
        /// Offending position.
        found: i64,
    },

    /// Records from several molecules reached a per-molecule component.
    #[error("partition is not grouped by read: expected '{expected}', found '{found}'")]
    MixedReads {
        /// Label of the first record or batch entry.
        expected: String,
        /// Offending label.
        found: String,
    },

    /// A per-molecule component received an empty partition.
    #[error("empty partition handed to {0}")]
    EmptyPartition(&'static str),

    /// Normalized probability masses did not sum to one.
    #[error("probability normalization failed at position {position}: masses sum to {total}")]
    Normalization {
        /// Site being called.
        position: i64,
        /// Sum after normalization.
        total: f64,
    },

    /// Strand correction requested for a symbol without a complement.
    #[error("cannot reverse-complement base '{0}'")]
    UnsupportedBase(String),

    /// A per-molecule statistic received calls for several molecules.
    #[error("expected exactly one molecule's calls, got {0}")]
    MultiMoleculeBatch(usize),

    /// Strand restriction selected a strand with no records.
    #[error("no records found on the {0} strand")]
    EmptyStrand(&'static str),

    /// The alignment table held no records.
    #[error("alignment table contains no records")]
    EmptyInput,

    /// Read-score filtering removed every strand of every molecule.
    #[error("no usable reads: every strand scored below the read-score threshold {threshold}")]
    NoUsableReads {
        /// Threshold that was applied.
        threshold: f64,
    },

    /// The site statistics pass accumulated nothing.
    #[error("no site calls accumulated; check strand selection and read-score threshold")]
    NoSiteCalls,

    /// Operating parameter outside its valid range.
    #[error("invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        parameter: &'static str,
        /// Explanation of why it is invalid.
        reason: String,
    },

    /// Correlation inputs of different lengths.
    #[error("cannot correlate sequences of length {left} and {right}")]
    LengthMismatch {
        /// Length of the first sequence.
        left: usize,
        /// Length of the second sequence.
        right: usize,
    },

    /// Worker pool could not be started.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl VclrError {
    /// Helper for constructing parse errors.
    pub(crate) fn malformed(line: usize, column: usize, reason: impl Into<String>) -> Self {
        VclrError::MalformedRecord {
            line,
            column,
            reason: reason.into(),
        }
    }

    /// Whether the error signals an internal grouping/accounting bug rather
    /// than bad input or configuration.
    pub fn is_consistency_error(&self) -> bool {
        matches!(
            self,
            VclrError::MixedSites { .. }
                | VclrError::MixedReads { .. }
                | VclrError::EmptyPartition(_)
                | VclrError::Normalization { .. }
                | VclrError::MultiMoleculeBatch(_)
        )
    }
}
