//! Command-line driver: load a matrix, factor it, report wall-clock time.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use tile_qr::{factorize, MatrixStore, QrConfig};

#[derive(Parser)]
#[command(
    name = "tile-qr",
    version,
    about = "Parallel tile-based Householder QR factorization"
)]
struct Args {
    /// Matrix file: a `rows cols` header followed by row-major values.
    matrix: PathBuf,

    /// Worker pool size (defaults to the available parallelism).
    #[arg(long)]
    threads: Option<usize>,

    /// Rows per pivot group (trailing-update granularity).
    #[arg(long)]
    alpha: Option<usize>,

    /// Rows per panel; must be a multiple of alpha.
    #[arg(long)]
    beta: Option<usize>,

    /// Use a plain FIFO ready queue instead of the priority queue.
    #[arg(long)]
    fifo: bool,

    /// Abort the whole run on the first numerical breakdown.
    #[arg(long)]
    abort_on_breakdown: bool,

    /// Write the factored matrix to this path.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = QrConfig::default();
    if let Some(threads) = args.threads {
        config.num_threads = threads;
    }
    if let Some(alpha) = args.alpha {
        config.alpha = alpha;
    }
    if let Some(beta) = args.beta {
        config.beta = beta;
    }
    config.use_priority_queue = !args.fifo;
    config.abort_on_breakdown = args.abort_on_breakdown;

    let mut store = MatrixStore::load(&args.matrix)
        .with_context(|| format!("failed to load matrix from {}", args.matrix.display()))?;
    info!("loaded {}x{} matrix", store.rows(), store.cols());

    let qr = factorize(&mut store, &config).context("factorization failed")?;

    for event in &qr.report().breakdowns {
        warn!(
            "numerical breakdown in task ({}, {}) at pivot {}",
            event.id.i, event.id.j, event.breakdown.pivot
        );
    }

    println!("Time taken: {} ms", qr.report().elapsed.as_millis());

    if let Some(path) = &args.output {
        store
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("factored matrix written to {}", path.display());
    }

    Ok(())
}
