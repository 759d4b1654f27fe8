//! The two Householder kernels driven by the scheduler.
//!
//! `panel_factor` (type-1) forms one reflector per pivot row of a panel
//! and applies it to the panel's remaining rows. `trailing_update`
//! (type-2) applies an already-formed group of reflectors to a later row
//! block. The per-pivot scalars `up` and `b` travel between the two through
//! a [`ReflectorScalars`] table: written once by the panel task whose sweep
//! covers the pivot, read by every update task of that pivot group after the
//! panel's dependency bit is set.
//!
//! Both kernels are pure index-range contracts over the shared store; they
//! contain no synchronization and are unit-testable without a scheduler.

use std::marker::PhantomData;

use super::matrix::SharedMatrix;

/// Why a panel task stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakdownKind {
    /// The pivot row is zero from the diagonal on; no reflector exists.
    ZeroColumn,
    /// The pivot product `up · cl` came out non-negative.
    DegeneratePivot,
}

/// A recoverable numerical-breakdown event inside [`panel_factor`].
///
/// The task that hit it is still marked complete so dependents may proceed;
/// downstream values are undefined from this pivot on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakdown {
    /// Pivot row at which the sweep stopped.
    pub pivot: usize,
    /// Failure class.
    pub kind: BreakdownKind,
}

/// Per-pivot reflector scalars, one entry per store row.
///
/// Entry `p` is written only by the panel task whose pivot sweep includes
/// row `p` and read by the update tasks of that pivot group. Entries of
/// pivots that broke down stay zero, which makes every later application of
/// them a no-op.
pub struct ReflectorScalars {
    up: Vec<f64>,
    b: Vec<f64>,
}

impl ReflectorScalars {
    /// Zero-initialized table for an `m`-row store.
    pub fn new(m: usize) -> Self {
        Self {
            up: vec![0.0; m],
            b: vec![0.0; m],
        }
    }

    /// The `up` scalars, one per pivot row.
    pub fn up(&self) -> &[f64] {
        &self.up
    }

    /// The reciprocal pivot products `b`, one per pivot row.
    pub fn b(&self) -> &[f64] {
        &self.b
    }

    /// Shared-mutable view handed to the worker pool.
    pub(crate) fn shared(&mut self) -> SharedScalars<'_> {
        SharedScalars {
            up: self.up.as_mut_ptr(),
            b: self.b.as_mut_ptr(),
            len: self.up.len(),
            _marker: PhantomData,
        }
    }
}

/// Raw shared view of a [`ReflectorScalars`] table.
///
/// Soundness comes from the single-writer / gated-reader protocol described
/// on [`ReflectorScalars`], not from this type.
pub(crate) struct SharedScalars<'a> {
    up: *mut f64,
    b: *mut f64,
    len: usize,
    _marker: PhantomData<&'a mut [f64]>,
}

unsafe impl Send for SharedScalars<'_> {}
unsafe impl Sync for SharedScalars<'_> {}

impl SharedScalars<'_> {
    /// Publish the scalars of pivot `p`.
    ///
    /// # Safety
    ///
    /// `p` must be in bounds and this thread must be the panel task covering
    /// pivot `p`; no other writer of entry `p` may exist, ever.
    #[inline]
    pub(crate) unsafe fn publish(&self, p: usize, up: f64, b: f64) {
        debug_assert!(p < self.len);
        *self.up.add(p) = up;
        *self.b.add(p) = b;
    }

    /// Read the scalars of pivot `p`.
    ///
    /// # Safety
    ///
    /// `p` must be in bounds and the panel task covering pivot `p` must have
    /// completed (its dependency bit observed true).
    #[inline]
    pub(crate) unsafe fn get(&self, p: usize) -> (f64, f64) {
        debug_assert!(p < self.len);
        (*self.up.add(p), *self.b.add(p))
    }
}

/// Type-1 kernel: factor the pivot rows `[row_start, row_end)` and apply
/// each new reflector to the panel's own rows up to `update_end`.
///
/// On breakdown the sweep stops with the current pivot untouched (zero
/// column) or half-written (degenerate product), matching the compact-form
/// convention of the sequential algorithm.
///
/// # Safety contract
///
/// The caller must hold exclusive access to rows `[row_start, update_end)`
/// of the store and be the unique writer of scalar entries
/// `[row_start, row_end)`; the scheduler's dependency protocol provides
/// both.
pub(crate) fn panel_factor(
    mat: &SharedMatrix<'_>,
    aux: &SharedScalars<'_>,
    row_start: usize,
    row_end: usize,
    update_end: usize,
) -> Result<(), Breakdown> {
    let n = mat.cols();

    for pivot in row_start..row_end {
        // SAFETY: rows [row_start, update_end) are exclusively ours and the
        // scalar entries of this sweep are single-writer, per the dependency
        // protocol (see the function contract).
        unsafe {
            // Scale guard: the largest magnitude in the pivot row's tail.
            let mut cl = mat.get(pivot, pivot).abs();
            let mut sm1 = 0.0;
            for k in pivot + 1..n {
                let sm = mat.get(pivot, k).abs();
                sm1 += sm * sm;
                cl = sm.max(cl);
            }
            if cl <= 0.0 {
                return Err(Breakdown {
                    pivot,
                    kind: BreakdownKind::ZeroColumn,
                });
            }

            let clinv = 1.0 / cl;
            let d = mat.get(pivot, pivot) * clinv;
            let sm = d * d + sm1 * clinv * clinv;
            let mut cl = cl * sm.sqrt();
            if mat.get(pivot, pivot) > 0.0 {
                cl = -cl;
            }

            let up = mat.get(pivot, pivot) - cl;
            mat.set(pivot, pivot, cl);

            let b = up * cl;
            if b >= 0.0 {
                return Err(Breakdown {
                    pivot,
                    kind: BreakdownKind::DegeneratePivot,
                });
            }
            let b = 1.0 / b;
            aux.publish(pivot, up, b);

            for row in pivot + 1..update_end {
                apply_reflector(mat, pivot, up, b, row);
            }
        }
    }
    Ok(())
}

/// Type-2 kernel: apply the reflectors of pivots `[row_start, row_end)` to
/// the rows `[col_start, col_end)`.
///
/// # Safety contract
///
/// The caller must hold exclusive access to rows `[col_start, col_end)`, and
/// the panel task covering the pivot range must have completed so the pivot
/// rows and their scalars are frozen.
pub(crate) fn trailing_update(
    mat: &SharedMatrix<'_>,
    aux: &SharedScalars<'_>,
    row_start: usize,
    row_end: usize,
    col_start: usize,
    col_end: usize,
) {
    for pivot in row_start..row_end {
        // SAFETY: updated rows are exclusively ours; pivot rows and scalars
        // are frozen once the owning panel's dependency bit is set, which
        // gates this task (see the function contract).
        unsafe {
            let (up, b) = aux.get(pivot);
            for row in col_start..col_end {
                apply_reflector(mat, pivot, up, b, row);
            }
        }
    }
}

/// Apply reflector `pivot` to `row`: `x ← x + b·(vᵀx)·v` with
/// `v = (up, M[pivot, pivot+1..])`.
///
/// # Safety
///
/// `row` must be exclusively writable by this thread and row `pivot` frozen.
#[inline]
unsafe fn apply_reflector(mat: &SharedMatrix<'_>, pivot: usize, up: f64, b: f64, row: usize) {
    let n = mat.cols();

    let mut sm = mat.get(row, pivot) * up;
    for i in pivot + 1..n {
        sm += mat.get(row, i) * mat.get(pivot, i);
    }
    if sm == 0.0 {
        return;
    }

    let sm = sm * b;
    mat.set(row, pivot, mat.get(row, pivot) + sm * up);
    for i in pivot + 1..n {
        mat.set(row, i, mat.get(row, i) + sm * mat.get(pivot, i));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::matrix::MatrixStore;
    use crate::core::reconstruct;

    fn factor_whole(store: &mut MatrixStore) -> (ReflectorScalars, Result<(), Breakdown>) {
        let rows = store.rows();
        let mut aux = ReflectorScalars::new(rows);
        let result = {
            let mat = store.shared();
            let shared_aux = aux.shared();
            panel_factor(&mat, &shared_aux, 0, rows, rows)
        };
        (aux, result)
    }

    #[test]
    fn single_element_negates() {
        let mut store = MatrixStore::from_vec(1, 1, vec![5.0]).unwrap();
        let (aux, result) = factor_whole(&mut store);
        assert!(result.is_ok());
        assert_eq!(store.get(0, 0), -5.0);
        assert_eq!(aux.up()[0], 10.0);
        assert_eq!(aux.b()[0], 1.0 / -50.0);
    }

    #[test]
    fn zero_pivot_row_breaks_down() {
        let mut store = MatrixStore::zeros(2, 2);
        store.set(1, 0, 1.0);
        store.set(1, 1, 1.0);
        let (aux, result) = factor_whole(&mut store);
        assert_eq!(
            result,
            Err(Breakdown {
                pivot: 0,
                kind: BreakdownKind::ZeroColumn
            })
        );
        // Nothing published, nothing touched.
        assert_eq!(aux.up()[0], 0.0);
        assert_eq!(store.get(1, 0), 1.0);
    }

    #[test]
    fn rank_one_breaks_down_on_second_pivot() {
        // Three rows of ones: every row collapses after the first reflector.
        let mut store = MatrixStore::from_vec(3, 6, vec![1.0; 18]).unwrap();
        let (_aux, result) = factor_whole(&mut store);
        assert_eq!(
            result,
            Err(Breakdown {
                pivot: 1,
                kind: BreakdownKind::ZeroColumn
            })
        );
        let sqrt6 = 6.0f64.sqrt();
        assert!((store.get(0, 0) + sqrt6).abs() < 1e-12);
        assert!((store.get(1, 0) + sqrt6).abs() < 1e-12);
        // The tails of the later rows are annihilated exactly.
        for c in 1..6 {
            assert_eq!(store.get(1, c), 0.0);
            assert_eq!(store.get(2, c), 0.0);
        }
    }

    #[test]
    fn full_sweep_reconstructs_original() {
        let data = vec![
            2.0, -1.0, 0.5, 1.0, //
            1.0, 3.0, -2.0, 0.0, //
            -0.5, 1.0, 1.0, 2.0,
        ];
        let original = data.clone();
        let mut store = MatrixStore::from_vec(3, 4, data).unwrap();
        let (aux, result) = factor_whole(&mut store);
        assert!(result.is_ok());

        let rebuilt = reconstruct::reconstruct(&store, &aux);
        for (a, b) in rebuilt.iter().zip(original.iter()) {
            assert!((a - b).abs() < 1e-12, "{a} vs {b}");
        }
    }

    #[test]
    fn scalars_written_once_per_pivot() {
        let mut store =
            MatrixStore::from_vec(2, 3, vec![1.0, 2.0, 2.0, 0.0, 3.0, 4.0]).unwrap();
        let (aux, result) = factor_whole(&mut store);
        assert!(result.is_ok());
        // Pivot 0: tail norm 3, diagonal positive, so cl = -3.
        assert_eq!(store.get(0, 0), -3.0);
        assert_eq!(aux.up()[0], 4.0);
        assert!(aux.b()[0] < 0.0 && aux.b()[1] < 0.0);
    }
}
