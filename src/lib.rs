//! # Single-molecule consensus and methylation calling
//!
//! Consumes per-base probability calls from nanopore reads (one probability
//! per candidate base per aligned reference position per read strand) and
//! derives consensus calls per molecule and across a run.
//!
//! ## Pipeline
//!
//! 1. **Record store**: load the alignment table into an [`AlignmentSet`]
//! 2. **Grouping**: partition by molecule, site, or strand
//! 3. **Read-score filter** (optional): keep strands whose mean probability
//!    meets a threshold
//! 4. **Site calling**: probability-weighted argmax per site, raw or
//!    strand-corrected
//! 5. **Motif classification**: pair adjacent sites into GATC dyads
//! 6. **Aggregation**: accuracy, percent methylated, per-site statistics,
//!    mean/median/correlation summaries
//!
//! ## Usage Example
//!
//! ```ignore
//! use vclr::{Pipeline, RunConfig, Tool};
//!
//! let records = vclr::record::read_alignment_file("calls.tsv", Default::default())?;
//! let pipeline = Pipeline::new(RunConfig::default().with_call_threshold(0.1))?;
//! let output = pipeline.run(Tool::Gatc { per_dyad: false }, &records, None)?;
//! print!("{}", output.report.render()?);
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod error;      // Error taxonomy
pub mod record;     // Record store and input readers
pub mod grouping;   // Partitioning by read, site, strand
pub mod score;      // Read-score filter
pub mod caller;     // Site caller
pub mod motif;      // Dyad methylation classifier
pub mod molecule;   // Per-molecule and per-site calling pipelines
pub mod stats;      // Aggregation and summary statistics
pub mod report;     // Delimited-text output
pub mod config;     // Operating parameters
pub mod pipeline;   // Run orchestration

// Re-exports for convenience
pub use caller::{call_site, CallMode, SiteCall};
pub use config::{NumericPolicy, RunConfig};
pub use error::{Result, VclrError};
pub use molecule::{Call, MoleculeCalls, SiteConsensus, VariantCall};
pub use motif::MethylationStatus;
pub use pipeline::{Pipeline, RunOutput, Tool};
pub use record::{AlignmentRecord, AlignmentSet, Orientation, Strand};
pub use report::{Report, StrandSummary};
pub use stats::{SiteCallStats, SiteStatsAccumulator};
