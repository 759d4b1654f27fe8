//! End-to-end factorization scenarios and scheduler properties.
//!
//! The pivot sweep runs along store rows, so a tall matrix A enters the
//! store as its transpose; `R` is then the transpose of the stored triangle.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tile_qr::{
    factorize, reconstruct, BreakdownKind, MatrixStore, QrConfig, QrError, TaskId, TaskKind,
    TaskStatus, TileParams,
};

fn config(alpha: usize, beta: usize, threads: usize) -> QrConfig {
    QrConfig {
        alpha,
        beta,
        num_threads: threads,
        ..QrConfig::default()
    }
}

fn random_store(rows: usize, cols: usize, seed: u64) -> MatrixStore {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<f64> = (0..rows * cols).map(|_| rng.gen_range(-1.0..1.0)).collect();
    MatrixStore::from_vec(rows, cols, data).unwrap()
}

fn frob(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Relative Frobenius error between the unpacked factorization and the
/// matrix the store held before the run.
fn reconstruction_error(original: &[f64], store: &MatrixStore, qr: &tile_qr::Factorization) -> f64 {
    let rebuilt = reconstruct::reconstruct(store, qr.reflectors());
    let diff: Vec<f64> = rebuilt
        .iter()
        .zip(original.iter())
        .map(|(a, b)| a - b)
        .collect();
    frob(&diff) / frob(original)
}

#[test]
fn identity_factors_to_identity() {
    let mut store = MatrixStore::identity(4);
    let original = store.as_slice().to_vec();
    let qr = factorize(&mut store, &config(1, 2, 2)).unwrap();

    let grid = tile_qr::TaskGrid::build(4, TileParams::new(1, 2));
    assert_eq!(qr.report().tasks_completed, grid.task_count());
    assert!(qr
        .report()
        .statuses
        .iter()
        .all(|(_, s)| *s == TaskStatus::Ok));

    // Compact diagonal flips sign; the product is still the identity.
    for d in 0..4 {
        assert_eq!(store.get(d, d), -1.0);
    }
    assert!(reconstruction_error(&original, &store, &qr) < 1e-14);
}

#[test]
fn diagonal_matrix_sign_convention() {
    let mut store = MatrixStore::zeros(4, 4);
    for (d, v) in [1.0, 2.0, 3.0, 4.0].iter().enumerate() {
        store.set(d, d, *v);
    }
    let qr = factorize(&mut store, &config(1, 1, 2)).unwrap();
    assert!(qr.report().breakdowns.is_empty());

    for (d, v) in [1.0, 2.0, 3.0, 4.0].iter().enumerate() {
        assert_eq!(store.get(d, d), -v);
    }
    for r in 0..4 {
        for c in 0..4 {
            if r != c {
                assert_eq!(store.get(r, c), 0.0, "({r}, {c}) not zero");
            }
        }
    }
}

#[test]
fn rank_deficient_surfaces_breakdown_status() {
    // A 6x3 matrix of ones, stored transposed: one 3-pivot panel, K = 3.
    let mut store = MatrixStore::from_vec(3, 6, vec![1.0; 18]).unwrap();
    let qr = factorize(&mut store, &config(1, 3, 4)).unwrap();

    let sqrt6 = 6.0f64.sqrt();
    assert!((store.get(0, 0) + sqrt6).abs() < 1e-12);
    // Below the first pivot the triangle column is -sqrt(6) and the rest of
    // those rows annihilated exactly.
    assert!((store.get(1, 0) + sqrt6).abs() < 1e-12);
    for c in 1..6 {
        assert_eq!(store.get(1, c), 0.0);
        assert_eq!(store.get(2, c), 0.0);
    }

    assert_eq!(qr.report().breakdowns.len(), 1);
    let event = qr.report().breakdowns[0];
    assert_eq!(event.id, TaskId { i: 0, j: 0 });
    assert_eq!(event.breakdown.pivot, 1);
    assert_eq!(event.breakdown.kind, BreakdownKind::ZeroColumn);
    assert_eq!(
        qr.report().statuses,
        vec![(TaskId { i: 0, j: 0 }, TaskStatus::Breakdown)]
    );
}

#[test]
fn random_8x8_reconstructs() {
    let mut store = random_store(8, 8, 42);
    let original = store.as_slice().to_vec();
    let qr = factorize(&mut store, &config(2, 4, 8)).unwrap();
    assert!(qr.report().breakdowns.is_empty());

    assert!(reconstruction_error(&original, &store, &qr) < 1e-12);

    // Rows of the materialized orthogonal factor are orthonormal.
    let q = reconstruct::q_factor(&store, qr.reflectors());
    let n = 8;
    for r in 0..n {
        for c in 0..n {
            let dot: f64 = (0..n).map(|k| q[r * n + k] * q[c * n + k]).sum();
            let expect = if r == c { 1.0 } else { 0.0 };
            assert!((dot - expect).abs() < 1e-12);
        }
    }
}

#[test]
fn deterministic_across_worker_counts() {
    let reference = {
        let mut store = random_store(100, 100, 7);
        factorize(&mut store, &config(10, 20, 1)).unwrap();
        store.as_slice().to_vec()
    };

    for threads in [4, 16] {
        let mut store = random_store(100, 100, 7);
        factorize(&mut store, &config(10, 20, threads)).unwrap();
        let max_diff = store
            .as_slice()
            .iter()
            .zip(reference.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f64, f64::max);
        assert!(max_diff <= 1e-10, "threads={threads}: diff {max_diff}");
    }
}

#[test]
fn single_element_store() {
    let mut store = MatrixStore::from_vec(1, 1, vec![5.0]).unwrap();
    let qr = factorize(&mut store, &config(1, 1, 2)).unwrap();
    assert_eq!(store.get(0, 0), -5.0);
    assert_eq!(qr.report().tasks_completed, 1);
    assert!(qr.report().ready_empty_at_exit);
}

#[test]
fn scheduler_ordering_invariants() {
    let mut store = random_store(12, 16, 3);
    let qr = factorize(&mut store, &config(2, 4, 4)).unwrap();
    let report = qr.report();

    let grid = tile_qr::TaskGrid::build(12, TileParams::new(2, 4));
    let k = grid.k();
    assert_eq!(report.tasks_completed, grid.task_count());
    assert_eq!(report.completion_order.len(), grid.task_count());

    // Each task completed exactly once.
    let position: HashMap<TaskId, usize> = report
        .completion_order
        .iter()
        .enumerate()
        .map(|(pos, id)| (*id, pos))
        .collect();
    assert_eq!(position.len(), grid.task_count());

    for task in grid.iter() {
        let TaskId { i, j } = task.id;
        let pos = position[&task.id];
        // Left-neighbor ordering within a row block.
        if j > 0 && grid.get(i, j - 1).is_some() {
            assert!(position[&TaskId { i, j: j - 1 }] < pos);
        }
        // A pivot group is applied only after its panel was factored.
        if task.kind == TaskKind::TrailingUpdate {
            let owner = j / k;
            assert!(position[&TaskId { i: owner, j: owner * k }] < pos);
        }
    }

    assert!(report.ready_pushes <= report.tasks_completed + report.promotions);
    assert!(report
        .statuses
        .iter()
        .all(|(_, s)| *s == TaskStatus::Ok));
}

#[test]
fn fifo_queue_matches_priority_queue() {
    let seed = 11;
    let factored_with = |use_priority: bool| {
        let mut store = random_store(16, 16, seed);
        let mut cfg = config(2, 4, 4);
        cfg.use_priority_queue = use_priority;
        factorize(&mut store, &cfg).unwrap();
        store.as_slice().to_vec()
    };

    let with_priority = factored_with(true);
    let with_fifo = factored_with(false);
    for (a, b) in with_priority.iter().zip(with_fifo.iter()) {
        assert!((a - b).abs() <= 1e-10);
    }
}

#[test]
fn last_panel_shorter_than_beta() {
    let mut store = random_store(5, 8, 19);
    let original = store.as_slice().to_vec();
    let qr = factorize(&mut store, &config(1, 2, 3)).unwrap();
    assert!(qr.report().breakdowns.is_empty());
    assert!(reconstruction_error(&original, &store, &qr) < 1e-12);
}

#[test]
fn three_groups_per_panel() {
    let mut store = random_store(9, 12, 23);
    let original = store.as_slice().to_vec();
    let qr = factorize(&mut store, &config(1, 3, 4)).unwrap();
    assert!(qr.report().breakdowns.is_empty());
    assert!(reconstruction_error(&original, &store, &qr) < 1e-12);
}

#[test]
fn zero_first_row_breaks_down_first_panel() {
    let mut store = random_store(4, 4, 31);
    for c in 0..4 {
        store.set(0, c, 0.0);
    }
    let qr = factorize(&mut store, &config(2, 2, 2)).unwrap();

    assert_eq!(qr.report().breakdowns.len(), 1);
    let event = qr.report().breakdowns[0];
    assert_eq!(event.id, TaskId { i: 0, j: 0 });
    assert_eq!(event.breakdown.pivot, 0);

    for (id, status) in &qr.report().statuses {
        let expect = if *id == (TaskId { i: 0, j: 0 }) {
            TaskStatus::Breakdown
        } else {
            TaskStatus::Ok
        };
        assert_eq!(*status, expect, "status of ({}, {})", id.i, id.j);
    }
}

#[test]
fn abort_on_breakdown_is_fatal() {
    let mut store = random_store(4, 4, 31);
    for c in 0..4 {
        store.set(0, c, 0.0);
    }
    let mut cfg = config(2, 2, 2);
    cfg.abort_on_breakdown = true;
    match factorize(&mut store, &cfg) {
        Err(QrError::NumericalBreakdown { i: 0, j: 0, pivot: 0 }) => {}
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(_) => panic!("expected breakdown error"),
    }
}

#[test]
fn more_workers_than_tasks() {
    let mut store = MatrixStore::identity(2);
    let original = store.as_slice().to_vec();
    let qr = factorize(&mut store, &config(1, 1, 16)).unwrap();
    assert_eq!(qr.report().tasks_completed, 3);
    assert!(reconstruction_error(&original, &store, &qr) < 1e-14);
}
