//! Completion tracking: the atomic dependency table and the per-task
//! numerical status table.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// 2D table of completion bits, one per task-grid cell.
///
/// Each bit transitions false → true exactly once, written only by the
/// worker that finished the cell's task. There is no CAS loop: the release
/// store pairs with the acquire load so that a reader observing `true` sees
/// every matrix and scalar write the completing worker made.
pub struct DependencyTable {
    bits: Vec<AtomicBool>,
    cols: usize,
}

impl DependencyTable {
    /// All-false table for an `rows × cols` grid.
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut bits = Vec::with_capacity(rows * cols);
        for _ in 0..rows * cols {
            bits.push(AtomicBool::new(false));
        }
        Self { bits, cols }
    }

    /// Mark `(i, j)` complete.
    pub fn set(&self, i: usize, j: usize) {
        self.bits[i * self.cols + j].store(true, Ordering::Release);
    }

    /// Has `(i, j)` completed?
    pub fn get(&self, i: usize, j: usize) -> bool {
        self.bits[i * self.cols + j].load(Ordering::Acquire)
    }

    /// Number of set bits; used for end-of-run reporting.
    pub fn count_set(&self) -> usize {
        self.bits
            .iter()
            .filter(|b| b.load(Ordering::Acquire))
            .count()
    }
}

/// Numerical outcome of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Not executed (yet).
    Pending,
    /// Kernel ran to completion.
    Ok,
    /// Panel kernel stopped on a numerical breakdown.
    Breakdown,
}

const STATUS_PENDING: u8 = 0;
const STATUS_OK: u8 = 1;
const STATUS_BREAKDOWN: u8 = 2;

/// Per-cell numerical status, recorded once by the completing worker.
///
/// The swap in [`record`](Self::record) doubles as the double-completion
/// check: a second completion of the same cell is a scheduler bug and
/// panics.
pub struct StatusTable {
    cells: Vec<AtomicU8>,
    cols: usize,
}

impl StatusTable {
    /// All-pending table for an `rows × cols` grid.
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut cells = Vec::with_capacity(rows * cols);
        for _ in 0..rows * cols {
            cells.push(AtomicU8::new(STATUS_PENDING));
        }
        Self { cells, cols }
    }

    /// Record the outcome of `(i, j)`.
    pub fn record(&self, i: usize, j: usize, ok: bool) {
        let status = if ok { STATUS_OK } else { STATUS_BREAKDOWN };
        let prev = self.cells[i * self.cols + j].swap(status, Ordering::AcqRel);
        assert_eq!(
            prev, STATUS_PENDING,
            "task ({i}, {j}) completed twice"
        );
    }

    /// Current status of `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> TaskStatus {
        match self.cells[i * self.cols + j].load(Ordering::Acquire) {
            STATUS_OK => TaskStatus::Ok,
            STATUS_BREAKDOWN => TaskStatus::Breakdown,
            _ => TaskStatus::Pending,
        }
    }
}
