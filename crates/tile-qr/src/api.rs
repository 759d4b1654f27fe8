//! High-level entry points: validate, build the tables, run the pool.

use std::time::Instant;

use log::{debug, info};

use crate::config::QrConfig;
use crate::core::householder::ReflectorScalars;
use crate::core::matrix::MatrixStore;
use crate::error::{QrError, Result};
use crate::sched::worker::{RunReport, Scheduler};
use crate::types::{TaskGrid, TileParams};

/// The outcome of a completed run.
///
/// The compact factor lives in the store that was passed in; this carries
/// the reflector scalars needed to unpack it and the run report.
pub struct Factorization {
    reflectors: ReflectorScalars,
    report: RunReport,
}

impl Factorization {
    /// Per-pivot reflector scalars (`up`, `b`).
    pub fn reflectors(&self) -> &ReflectorScalars {
        &self.reflectors
    }

    /// Scheduler statistics and per-task numerical statuses.
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Take ownership of both parts.
    pub fn into_parts(self) -> (ReflectorScalars, RunReport) {
        (self.reflectors, self.report)
    }
}

/// Factor the store in place with a pool of workers.
///
/// The sweep advances along store rows: row `p` donates the reflector that
/// annihilates its own tail, so a tall system enters the store transposed.
/// On success the store holds the compact factor (triangle on and below the
/// diagonal, reflector tails above it) and the returned [`Factorization`]
/// holds the matching scalars.
///
/// Numerical breakdown is a per-task status by default; with
/// [`QrConfig::abort_on_breakdown`] set it aborts the run and surfaces as
/// [`QrError::NumericalBreakdown`].
///
/// # Example
///
/// ```
/// use tile_qr::{factorize, MatrixStore, QrConfig};
///
/// let mut store = MatrixStore::identity(2);
/// let config = QrConfig { alpha: 1, beta: 1, num_threads: 2, ..QrConfig::default() };
/// let qr = factorize(&mut store, &config)?;
///
/// // Householder sign convention: the diagonal flips.
/// assert_eq!(store.get(0, 0), -1.0);
/// assert_eq!(qr.report().tasks_completed, 3);
/// # Ok::<(), tile_qr::QrError>(())
/// ```
pub fn factorize(store: &mut MatrixStore, config: &QrConfig) -> Result<Factorization> {
    config.validate()?;
    if store.rows() == 0 || store.cols() == 0 {
        return Err(QrError::Dimension("store must be non-empty".into()));
    }
    if store.rows() > store.cols() {
        return Err(QrError::Dimension(format!(
            "store is {}x{}; the pivot sweep needs rows <= cols (load tall systems transposed)",
            store.rows(),
            store.cols()
        )));
    }

    let m = store.rows();
    let tile = TileParams::new(config.alpha, config.beta);
    let grid = TaskGrid::build(m, tile);
    info!(
        "task grid {}x{} ({} tasks), {} workers, {} ready queue",
        grid.rows(),
        grid.cols(),
        grid.task_count(),
        config.num_threads,
        if config.use_priority_queue { "priority" } else { "fifo" },
    );

    let mut reflectors = ReflectorScalars::new(m);
    let report = {
        let scheduler = Scheduler::new(&grid, store.shared(), reflectors.shared(), config);
        scheduler.seed();
        let start = Instant::now();
        scheduler.run(config.num_threads);
        let elapsed = start.elapsed();
        scheduler.into_report(elapsed)
    };
    debug!(
        "run complete: {} tasks, {} ready pushes, {} promotions",
        report.tasks_completed, report.ready_pushes, report.promotions
    );

    if config.abort_on_breakdown {
        if let Some(event) = report.breakdowns.first() {
            return Err(QrError::NumericalBreakdown {
                i: event.id.i,
                j: event.id.j,
                pivot: event.breakdown.pivot,
            });
        }
    }

    Ok(Factorization {
        reflectors,
        report,
    })
}
