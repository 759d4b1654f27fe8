//! The worker pool and its dispatch loop.
//!
//! Every worker runs the same loop until termination:
//!
//! 1. **Ready step** — pop a task, run its kernel, set its dependency bit,
//!    schedule its successors (a completed panel fans its pivot groups out
//!    to every lower row block; a flagged update seeds the next diagonal
//!    panel).
//! 2. **Wait step** — pop one parked task, promote it if its left neighbor
//!    has completed, otherwise push it back.
//! 3. **Termination check** — exit once the last diagonal tile's dependency
//!    bit is set, or the cooperative abort flag fires.
//!
//! Workers never block on a condition variable; an iteration that found no
//! work yields the time slice to bound the CPU burn near the end of the
//! computation.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::config::QrConfig;
use crate::core::householder::{panel_factor, trailing_update, Breakdown, SharedScalars};
use crate::core::matrix::SharedMatrix;
use crate::sched::dependency::{DependencyTable, StatusTable, TaskStatus};
use crate::sched::queue::{ReadyQueue, WaitQueue};
use crate::types::{Task, TaskGrid, TaskId, TaskKind};

/// A numerical breakdown observed during the run, with the task it hit.
#[derive(Debug, Clone, Copy)]
pub struct BreakdownEvent {
    /// Task that stopped early.
    pub id: TaskId,
    /// Pivot and failure class.
    pub breakdown: Breakdown,
}

/// What happened during a run.
#[derive(Debug)]
pub struct RunReport {
    /// Wall-clock time between seeding the pool and the last worker joining.
    pub elapsed: Duration,
    /// Tasks that executed (each exactly once).
    pub tasks_completed: usize,
    /// Pushes into the ready queue, including promotions and the seed.
    pub ready_pushes: usize,
    /// First-time pushes into the wait queue.
    pub wait_pushes: usize,
    /// Wait-to-ready promotions.
    pub promotions: usize,
    /// Re-pushes of still-blocked wait-queue entries.
    pub requeues: usize,
    /// Tasks in completion order, as observed by the completion log.
    pub completion_order: Vec<TaskId>,
    /// Whether the ready queue had drained when the pool exited.
    pub ready_empty_at_exit: bool,
    /// Numerical status of every task in the grid, row-major.
    pub statuses: Vec<(TaskId, TaskStatus)>,
    /// Breakdown events, if any.
    pub breakdowns: Vec<BreakdownEvent>,
}

#[derive(Default)]
struct Counters {
    ready_pushes: AtomicUsize,
    wait_pushes: AtomicUsize,
    promotions: AtomicUsize,
    requeues: AtomicUsize,
    completed: AtomicUsize,
}

/// Shared state of one factorization run.
///
/// Built by the driver after dimensions are known, borrowed by every worker
/// for the lifetime of the pool.
pub(crate) struct Scheduler<'a> {
    grid: &'a TaskGrid,
    mat: SharedMatrix<'a>,
    aux: SharedScalars<'a>,
    deps: DependencyTable,
    status: StatusTable,
    ready: ReadyQueue,
    wait: WaitQueue,
    abort: AtomicBool,
    abort_on_breakdown: bool,
    last: TaskId,
    counters: Counters,
    completions: Mutex<Vec<TaskId>>,
    breakdowns: Mutex<Vec<BreakdownEvent>>,
}

impl<'a> Scheduler<'a> {
    pub(crate) fn new(
        grid: &'a TaskGrid,
        mat: SharedMatrix<'a>,
        aux: SharedScalars<'a>,
        config: &QrConfig,
    ) -> Self {
        let task_count = grid.task_count();
        Self {
            mat,
            aux,
            deps: DependencyTable::new(grid.rows(), grid.cols()),
            status: StatusTable::new(grid.rows(), grid.cols()),
            ready: ReadyQueue::new(config.use_priority_queue),
            wait: WaitQueue::new(),
            abort: AtomicBool::new(false),
            abort_on_breakdown: config.abort_on_breakdown,
            last: grid.last_diagonal(),
            counters: Counters::default(),
            completions: Mutex::new(Vec::with_capacity(task_count)),
            breakdowns: Mutex::new(Vec::new()),
            grid,
        }
    }

    /// Enqueue the initial `(0, 0)` panel task.
    pub(crate) fn seed(&self) {
        let first = self.grid.get(0, 0).expect("grid has no (0, 0) task");
        self.push_ready(first);
    }

    /// Run `num_threads` workers to completion and join them.
    pub(crate) fn run(&self, num_threads: usize) {
        std::thread::scope(|scope| {
            for tid in 0..num_threads {
                scope.spawn(move || self.worker(tid));
            }
        });
    }

    /// Request cooperative termination; used on breakdown-abort and by test
    /// harnesses.
    pub(crate) fn request_abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    fn push_ready(&self, task: &Task) {
        self.counters.ready_pushes.fetch_add(1, Ordering::Relaxed);
        self.ready.push(task.priority, task.id);
    }

    fn worker(&self, tid: usize) {
        loop {
            if self.abort.load(Ordering::Acquire) {
                break;
            }

            let ran = match self.ready.try_pop() {
                Some(id) => {
                    let task = self
                        .grid
                        .get(id.i, id.j)
                        .unwrap_or_else(|| panic!("no task at ({}, {})", id.i, id.j));
                    debug!("worker {tid}: {:?} ({}, {})", task.kind, id.i, id.j);
                    match task.kind {
                        TaskKind::PanelFactor => self.run_panel(task),
                        TaskKind::TrailingUpdate => self.run_update(task),
                    }
                    true
                }
                None => false,
            };

            let rechecked = match self.wait.try_pop() {
                Some(id) => {
                    if id.j == 0 || self.deps.get(id.i, id.j - 1) {
                        self.counters.promotions.fetch_add(1, Ordering::Relaxed);
                        let task = self
                            .grid
                            .get(id.i, id.j)
                            .unwrap_or_else(|| panic!("no task at ({}, {})", id.i, id.j));
                        self.push_ready(task);
                    } else {
                        self.counters.requeues.fetch_add(1, Ordering::Relaxed);
                        self.wait.push(id);
                    }
                    true
                }
                None => false,
            };

            if self.deps.get(self.last.i, self.last.j) {
                break;
            }
            if !ran && !rechecked {
                std::thread::yield_now();
            }
        }
    }

    /// Type-1 completion: factor the panel, then fan its pivot groups out to
    /// every lower row block.
    fn run_panel(&self, task: &Task) {
        let TaskId { i, j } = task.id;
        debug_assert!(
            j == 0 || self.deps.get(i, j - 1),
            "panel ({i}, {j}) started before its left neighbor"
        );

        let result = panel_factor(&self.mat, &self.aux, task.row_start, task.row_end, task.col_end);
        self.finish(task, result);
        if self.abort.load(Ordering::Acquire) {
            return;
        }

        let k = self.grid.k();
        let group_end = (j + k).min(self.grid.cols());
        for block in i + 1..self.grid.rows() {
            for group in j..group_end {
                let succ = self
                    .grid
                    .get(block, group)
                    .unwrap_or_else(|| panic!("no successor at ({block}, {group})"));
                if group == 0 || self.deps.get(block, group - 1) {
                    self.push_ready(succ);
                } else {
                    self.counters.wait_pushes.fetch_add(1, Ordering::Relaxed);
                    self.wait.push(succ.id);
                }
            }
        }
    }

    /// Type-2 completion: apply the pivot group, then seed the next diagonal
    /// panel if this task carries the flag.
    fn run_update(&self, task: &Task) {
        let TaskId { i, j } = task.id;
        debug_assert!(
            j == 0 || self.deps.get(i, j - 1),
            "update ({i}, {j}) started before its left neighbor"
        );
        let owner = j / self.grid.k();
        debug_assert!(
            self.deps.get(owner, owner * self.grid.k()),
            "update ({i}, {j}) started before its pivot group was factored"
        );

        trailing_update(
            &self.mat,
            &self.aux,
            task.row_start,
            task.row_end,
            task.col_start,
            task.col_end,
        );
        self.finish(task, Ok(()));

        if task.seeds_next_panel {
            let next_j = j + 1;
            debug_assert!(next_j < self.grid.cols());
            let next = self
                .grid
                .get(next_j / self.grid.k(), next_j)
                .unwrap_or_else(|| panic!("no diagonal task for column {next_j}"));
            self.push_ready(next);
        }
    }

    /// Publish a task's outcome: status first, then the dependency bit that
    /// releases the kernel's writes to dependents.
    fn finish(&self, task: &Task, result: Result<(), Breakdown>) {
        let TaskId { i, j } = task.id;
        match result {
            Ok(()) => self.status.record(i, j, true),
            Err(breakdown) => {
                warn!(
                    "numerical breakdown in task ({i}, {j}) at pivot {} ({:?})",
                    breakdown.pivot, breakdown.kind
                );
                self.status.record(i, j, false);
                self.breakdowns
                    .lock()
                    .push(BreakdownEvent { id: task.id, breakdown });
            }
        }
        self.counters.completed.fetch_add(1, Ordering::Relaxed);
        self.completions.lock().push(task.id);
        self.deps.set(i, j);

        if result.is_err() && self.abort_on_breakdown {
            self.request_abort();
        }
    }

    /// Collapse the run into its report.
    pub(crate) fn into_report(self, elapsed: Duration) -> RunReport {
        let statuses = self
            .grid
            .iter()
            .map(|t| (t.id, self.status.get(t.id.i, t.id.j)))
            .collect();
        RunReport {
            ready_empty_at_exit: self.ready.is_empty(),
            elapsed,
            tasks_completed: self.counters.completed.load(Ordering::Acquire),
            ready_pushes: self.counters.ready_pushes.load(Ordering::Acquire),
            wait_pushes: self.counters.wait_pushes.load(Ordering::Acquire),
            promotions: self.counters.promotions.load(Ordering::Acquire),
            requeues: self.counters.requeues.load(Ordering::Acquire),
            completion_order: self.completions.into_inner(),
            statuses,
            breakdowns: self.breakdowns.into_inner(),
        }
    }
}
