//! Unpacking the compact factorization.
//!
//! A factored store holds the triangular factor on and below the diagonal
//! and the reflector tails above it. These helpers extract the triangle,
//! re-apply the stored reflectors, and materialize the orthogonal factor,
//! which is how the round-trip laws (`‖L·Q − M‖`, `‖Q·Qᵀ − I‖`) are checked
//! in the tests.
//!
//! Reflectors are applied in descending pivot order when undoing the
//! factorization: the sweep computed `L = M·H₀·H₁⋯`, so `M = L·…·H₁·H₀`.

use super::householder::ReflectorScalars;
use super::matrix::MatrixStore;

/// Copy the triangular factor out of a factored store.
///
/// Row `r` keeps columns `0..=r`; the reflector tails above the diagonal are
/// replaced by zeros.
pub fn lower_trapezoid(store: &MatrixStore) -> Vec<f64> {
    let (rows, cols) = (store.rows(), store.cols());
    let mut out = vec![0.0; rows * cols];
    for r in 0..rows {
        for c in 0..=r.min(cols - 1) {
            out[r * cols + c] = store.get(r, c);
        }
    }
    out
}

/// Apply the stored reflector `pivot` to a row vector of store width.
///
/// Pivots that broke down have zero scalars and apply as a no-op.
fn apply_reflector(x: &mut [f64], store: &MatrixStore, pivot: usize, up: f64, b: f64) {
    let n = store.cols();
    let mut sm = x[pivot] * up;
    for i in pivot + 1..n {
        sm += x[i] * store.get(pivot, i);
    }
    let sm = sm * b;
    if sm == 0.0 {
        return;
    }
    x[pivot] += sm * up;
    for i in pivot + 1..n {
        x[i] += sm * store.get(pivot, i);
    }
}

/// Rebuild the matrix the store held before factorization.
///
/// Returns `L·Q` as a row-major `rows × cols` buffer, where `L` is the
/// stored triangle and `Q` the product of the stored reflectors.
pub fn reconstruct(store: &MatrixStore, scalars: &ReflectorScalars) -> Vec<f64> {
    let (rows, cols) = (store.rows(), store.cols());
    let pivots = rows.min(cols);
    let mut out = lower_trapezoid(store);
    for r in 0..rows {
        let row = &mut out[r * cols..(r + 1) * cols];
        for p in (0..pivots).rev() {
            apply_reflector(row, store, p, scalars.up()[p], scalars.b()[p]);
        }
    }
    out
}

/// Materialize the orthogonal factor `Q` as a `cols × cols` row-major
/// buffer, with `M = L·Q` for the reconstructed triangle `L`.
pub fn q_factor(store: &MatrixStore, scalars: &ReflectorScalars) -> Vec<f64> {
    let cols = store.cols();
    let pivots = store.rows().min(cols);
    let mut out = vec![0.0; cols * cols];
    for r in 0..cols {
        let row = &mut out[r * cols..(r + 1) * cols];
        row[r] = 1.0;
        for p in (0..pivots).rev() {
            apply_reflector(row, store, p, scalars.up()[p], scalars.b()[p]);
        }
    }
    out
}
