//! Runtime configuration for a factorization run.

use crate::error::{QrError, Result};

/// Tunables for a factorization run.
///
/// | Option | Effect | Default |
/// |--------|--------|---------|
/// | `num_threads` | worker pool width | available parallelism |
/// | `alpha` | rows per pivot group (trailing-update granularity) | 20 |
/// | `beta` | rows per panel (panel granularity), a multiple of `alpha` | 20 |
/// | `use_priority_queue` | priority-ordered ready queue vs. plain FIFO | `true` |
/// | `abort_on_breakdown` | stop the whole run on the first breakdown | `false` |
///
/// Both ready-queue flavors produce the same factorization; the priority
/// order only biases which ready task a worker picks up next.
#[derive(Debug, Clone)]
pub struct QrConfig {
    /// Number of worker threads. Correctness does not depend on it.
    pub num_threads: usize,
    /// Pivot-group height in matrix rows.
    pub alpha: usize,
    /// Panel height in matrix rows; must be a multiple of `alpha`.
    pub beta: usize,
    /// Order the ready queue by task priority.
    pub use_priority_queue: bool,
    /// Treat numerical breakdown as fatal instead of a per-task status.
    pub abort_on_breakdown: bool,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            num_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            alpha: 20,
            beta: 20,
            use_priority_queue: true,
            abort_on_breakdown: false,
        }
    }
}

impl QrConfig {
    /// Check the tile and pool invariants. Runs before any worker starts.
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(QrError::Config("num_threads must be positive".into()));
        }
        if self.alpha == 0 {
            return Err(QrError::Config("alpha must be positive".into()));
        }
        if self.beta == 0 || self.beta % self.alpha != 0 {
            return Err(QrError::Config(format!(
                "beta ({}) must be a positive multiple of alpha ({})",
                self.beta, self.alpha
            )));
        }
        Ok(())
    }

    /// Pivot groups per panel (`K = BETA / ALPHA`).
    pub fn k(&self) -> usize {
        self.beta / self.alpha
    }
}
