//! The immutable task catalog.
//!
//! Built once from the store dimensions and tile parameters, then only read.
//! Cell `(i, K·i)` holds the panel-factorization task for panel `i`; cell
//! `(i, j)` with `j < K·i` holds the trailing-update task that applies pivot
//! group `j` to row block `i`. Cells above the diagonal hold no task.
//!
//! Exactly one task per grid row `i ≥ 1` carries the `seeds_next_panel`
//! flag: the update at `(i, K·i − 1)`, whose completion is the last
//! prerequisite of the diagonal task `(i, K·i)`. Uniqueness is asserted at
//! build time.

use super::tiling::TileParams;

/// Grid coordinates of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId {
    /// Panel-row index (BETA-row block).
    pub i: usize,
    /// Pivot-group index (ALPHA-row group).
    pub j: usize,
}

/// The two kernel classes a task can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Type-1: factor the panel's pivots and update the panel's own rows.
    PanelFactor,
    /// Type-2: apply an earlier pivot group's reflectors to this row block.
    TrailingUpdate,
}

/// One cell of the task grid.
#[derive(Debug, Clone)]
pub struct Task {
    /// Grid coordinates.
    pub id: TaskId,
    /// Kernel class.
    pub kind: TaskKind,
    /// Pivot rows swept by this task (half-open).
    pub row_start: usize,
    /// End of the pivot-row range.
    pub row_end: usize,
    /// First row receiving reflector applications.
    pub col_start: usize,
    /// End of the updated-row range.
    pub col_end: usize,
    /// Min-heap key for the ready queue; lower runs first.
    pub priority: u64,
    /// Completing this task seeds the next diagonal panel task.
    pub seeds_next_panel: bool,
}

/// Immutable 2D catalog of tasks, indexed by grid coordinates.
pub struct TaskGrid {
    tasks: Vec<Option<Task>>,
    rows: usize,
    cols: usize,
    k: usize,
}

impl TaskGrid {
    /// Build the grid for an `m`-row store under the given tile parameters.
    ///
    /// Panics if the flag invariant does not hold; a malformed grid is a
    /// scheduler bug, not a recoverable condition.
    pub fn build(m: usize, tile: TileParams) -> Self {
        let rows = tile.grid_rows(m);
        let cols = tile.grid_cols(m);
        let k = tile.k();

        let mut tasks: Vec<Option<Task>> = Vec::with_capacity(rows * cols);
        for _ in 0..rows * cols {
            tasks.push(None);
        }

        for i in 0..rows {
            let diag = k * i;
            let (panel_start, panel_end) = tile.panel_rows(i, m);

            // Trailing updates: pivot group j applied to row block i.
            for j in 0..diag.min(cols) {
                let (group_start, group_end) = tile.group_rows(j, m);
                tasks[i * cols + j] = Some(Task {
                    id: TaskId { i, j },
                    kind: TaskKind::TrailingUpdate,
                    row_start: group_start,
                    row_end: group_end,
                    col_start: panel_start,
                    col_end: panel_end,
                    priority: priority_of(i, j, cols, TaskKind::TrailingUpdate),
                    seeds_next_panel: j + 1 == diag,
                });
            }

            // Panel factorization on the diagonal.
            debug_assert!(diag < cols, "diagonal cell out of range");
            tasks[i * cols + diag] = Some(Task {
                id: TaskId { i, j: diag },
                kind: TaskKind::PanelFactor,
                row_start: panel_start,
                row_end: panel_end,
                col_start: panel_start,
                col_end: panel_end,
                priority: priority_of(i, diag, cols, TaskKind::PanelFactor),
                seeds_next_panel: false,
            });
        }

        let grid = Self {
            tasks,
            rows,
            cols,
            k,
        };
        grid.assert_seed_flags();
        grid
    }

    fn assert_seed_flags(&self) {
        for i in 0..self.rows {
            let flagged = (0..self.cols)
                .filter_map(|j| self.get(i, j))
                .filter(|t| t.seeds_next_panel)
                .count();
            let expected = usize::from(i > 0);
            assert_eq!(
                flagged, expected,
                "grid row {i} carries {flagged} seed flags, expected {expected}"
            );
        }
    }

    /// Task at `(i, j)`, if that cell holds one.
    pub fn get(&self, i: usize, j: usize) -> Option<&Task> {
        if i >= self.rows || j >= self.cols {
            return None;
        }
        self.tasks[i * self.cols + j].as_ref()
    }

    /// Panel rows of the grid.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Pivot-group columns of the grid.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Pivot groups per panel.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Total number of tasks in the grid.
    pub fn task_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_some()).count()
    }

    /// Coordinates of the final diagonal task; its dependency bit is the
    /// termination signal.
    pub fn last_diagonal(&self) -> TaskId {
        TaskId {
            i: self.rows - 1,
            j: self.k * (self.rows - 1),
        }
    }

    /// Iterate over every task in the grid, row-major.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter_map(|t| t.as_ref())
    }
}

/// Priority key: earlier panels dominate later ones, a panel task dominates
/// the updates of its row, and among updates smaller `j` wins.
fn priority_of(i: usize, j: usize, cols: usize, kind: TaskKind) -> u64 {
    let kind_bit = match kind {
        TaskKind::PanelFactor => 0,
        TaskKind::TrailingUpdate => 1,
    };
    (i * (cols + 1) * 2 + kind_bit * (cols + 1) + j) as u64
}
