use clap::Parser;
use natural_experiments::experiments::{
    DEFAULT_MAX_DIVERGENCE, DEFAULT_MIN_DIFFERENCE, Thresholds, identify,
};
use natural_experiments::io::{RateColumn, load_tree, read_cancer_rates, write_results_csv};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

/// Identify recently diverged species pairs with different cancer rates
/// and write them as CSV.
#[derive(Parser, Debug)]
#[command(
    name = "natural-experiments",
    version,
    about = "Identifies species that have recently diverged and have different cancer rates"
)]
struct Args {
    /// Path to input cancer rates file (CSV or TSV, optionally .gz)
    #[arg(short = 'i', long = "infile")]
    infile: PathBuf,

    /// Path to Newick tree file (first non-empty line is read, optionally .gz)
    #[arg(short = 't', long = "treefile")]
    treefile: PathBuf,

    /// Examine malignancy rates (examines neoplasia rate by default)
    #[arg(long = "malignant", default_value_t = false)]
    malignant: bool,

    /// The maximum divergence allowed to compare species
    #[arg(long = "max", default_value_t = DEFAULT_MAX_DIVERGENCE)]
    max: f64,

    /// The minimum difference in cancer rates to report results
    #[arg(long = "min", default_value_t = DEFAULT_MIN_DIFFERENCE)]
    min: f64,

    /// Ignore species whose record total is known and below this value
    #[arg(long = "min-total", default_value_t = 0)]
    min_total: u32,

    /// Output CSV path (stdout if omitted or "-"; gzip if it ends in .gz)
    #[arg(short = 'o', long = "outfile")]
    outfile: Option<PathBuf>,

    /// Quiet mode: only warnings and errors are logged
    #[arg(short = 'q', long = "quiet", default_value_t = false)]
    quiet: bool,

    /// Log filter, e.g. "info" or "natural_experiments=debug"
    #[arg(long = "log", default_value = "info")]
    log: String,
}

fn main() {
    let args = Args::parse();
    install_tracing(if args.quiet { "warn" } else { args.log.as_str() });

    let start = Instant::now();

    let t0 = Instant::now();
    let tree = match load_tree(&args.treefile) {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to load tree {:?}: {e}", args.treefile);
            std::process::exit(2);
        }
    };
    info!(
        "Reading tree {:.3}s ({} nodes)",
        t0.elapsed().as_secs_f64(),
        tree.node_count()
    );

    let column = if args.malignant {
        RateColumn::Malignancy
    } else {
        RateColumn::Neoplasia
    };
    let t1 = Instant::now();
    let rates = match read_cancer_rates(&args.infile, column) {
        Ok(r) => r,
        Err(e) => {
            error!("Failed to read cancer rates {:?}: {e}", args.infile);
            std::process::exit(3);
        }
    };
    info!(
        "Reading {} rates for {} species {:.3}s",
        column.header(),
        rates.len(),
        t1.elapsed().as_secs_f64()
    );

    let thresholds = Thresholds {
        max_divergence: args.max,
        min_difference: args.min,
        min_total: args.min_total,
    };
    let t2 = Instant::now();
    let results = identify(&tree, &rates, &thresholds);
    info!(
        "Identifying natural experiments {:.3}s ({} found)",
        t2.elapsed().as_secs_f64(),
        results.len()
    );

    let t3 = Instant::now();
    if let Err(e) = write_results_csv(args.outfile.as_deref(), &results) {
        error!("{e}");
        std::process::exit(4);
    }
    let target = match args.outfile.as_deref() {
        Some(p) if p.as_os_str() != "-" => "output",
        _ => "stdout",
    };
    info!("Writing to {target} {:.3}s", t3.elapsed().as_secs_f64());
    info!("Finished. Runtime: {:.3}s", start.elapsed().as_secs_f64());
}

fn install_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
