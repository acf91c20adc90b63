use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use vclr::record::{read_alignment_file, read_reference};
use vclr::report::write_summaries;
use vclr::{CallMode, NumericPolicy, Pipeline, RunConfig, Strand, Tool};

#[derive(Parser, Debug)]
#[command(name = "vclr", about = "Single-molecule consensus and methylation calling")]
struct Cli {
    /// Minimum record probability included in a site call.
    #[arg(short = 't', long, global = true, default_value_t = 0.0)]
    threshold: f64,
    /// Minimum per-strand read score (0-100); 0 disables filtering.
    #[arg(short = 's', long, global = true, default_value_t = 0.0)]
    read_score: f64,
    /// Only use records from this strand.
    #[arg(long, global = true, value_enum)]
    strand: Option<Strand>,
    /// Override the report's calling mode.
    #[arg(long, global = true, value_enum)]
    mode: Option<CallMode>,
    /// How to treat unparsable numeric fields.
    #[arg(long, global = true, value_enum, default_value_t = NumericPolicy::Strict)]
    numeric_policy: NumericPolicy,
    /// Worker threads (defaults to available cores).
    #[arg(long, global = true)]
    threads: Option<usize>,
    /// Log debug detail to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Per-molecule template/complement accuracy against a reference.
    SmVariant {
        /// Alignment table (tab-separated).
        alignments: PathBuf,
        /// Reference sequence (FASTA or FASTQ; first record is used).
        #[arg(short, long)]
        reference: PathBuf,
    },
    /// Per-molecule template/complement percent methylated.
    SmMethyl {
        /// Alignment table (tab-separated).
        alignments: PathBuf,
    },
    /// Per-site percent methylated across molecules.
    SmSiteStats {
        /// Alignment table (tab-separated).
        alignments: PathBuf,
    },
    /// Per-site strand-corrected consensus call.
    Variant {
        /// Alignment table (tab-separated).
        alignments: PathBuf,
    },
    /// Per-site raw consensus call.
    Methyl {
        /// Alignment table (tab-separated).
        alignments: PathBuf,
    },
    /// Per-molecule GATC dyad methylation.
    Gatc {
        /// Alignment table (tab-separated).
        alignments: PathBuf,
        /// List every dyad call instead of one summary row per molecule.
        #[arg(long)]
        per_dyad: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = RunConfig::default()
        .with_call_threshold(cli.threshold)
        .with_read_score_threshold(cli.read_score)
        .with_strand(cli.strand)
        .with_mode(cli.mode)
        .with_numeric_policy(cli.numeric_policy)
        .with_threads(cli.threads);

    let (tool, alignments, reference_path) = match cli.command {
        Commands::SmVariant {
            alignments,
            reference,
        } => (Tool::SmVariant, alignments, Some(reference)),
        Commands::SmMethyl { alignments } => (Tool::SmMethyl, alignments, None),
        Commands::SmSiteStats { alignments } => (Tool::SmSiteStats, alignments, None),
        Commands::Variant { alignments } => (Tool::Variant, alignments, None),
        Commands::Methyl { alignments } => (Tool::Methyl, alignments, None),
        Commands::Gatc {
            alignments,
            per_dyad,
        } => (Tool::Gatc { per_dyad }, alignments, None),
    };

    run(config, tool, alignments, reference_path)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(
    config: RunConfig,
    tool: Tool,
    alignments_path: PathBuf,
    reference_path: Option<PathBuf>,
) -> Result<()> {
    let reference = reference_path
        .map(|path| {
            read_reference(&path)
                .with_context(|| format!("failed to read reference from {}", path.display()))
        })
        .transpose()?;

    let records = read_alignment_file(&alignments_path, config.numeric_policy).with_context(|| {
        format!(
            "failed to load alignments from {}",
            alignments_path.display()
        )
    })?;

    let pipeline = Pipeline::new(config).context("invalid run configuration")?;
    let output = pipeline
        .run(tool, &records, reference.as_deref())
        .map_err(|err| {
            let label = if err.is_consistency_error() {
                "internal consistency check failed (this is a bug)"
            } else {
                "run failed"
            };
            anyhow::Error::new(err).context(format!("{tool:?} {label}"))
        })?;
    if output.report.is_empty() {
        warn!(?tool, "report has no rows");
    }

    let mut stdout = BufWriter::new(io::stdout().lock());
    output.report.write(&mut stdout)?;
    write_summaries(&mut io::stderr().lock(), &output.summaries)?;

    Ok(())
}
