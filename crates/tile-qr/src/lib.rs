//! Tile-based parallel Householder QR factorization.
//!
//! The matrix is cut into a two-dimensional grid of tiles and factored by a
//! fixed pool of workers draining a dynamic task graph:
//!
//! ```text
//! grid column:   pivot group (ALPHA rows)
//! grid row:      row block  (BETA rows, K = BETA/ALPHA groups)
//!
//!        j=0    j=1    j=2    j=3    j=4    j=5        (K = 2)
//! i=0  [ T1 ]    ·      ·      ·      ·      ·
//! i=1  [ T2 ] [ T2 ] [ T1 ]    ·      ·      ·
//! i=2  [ T2 ] [ T2 ] [ T2 ] [ T2 ] [ T1 ]    ·
//! ```
//!
//! A type-1 task factors the panel on the diagonal and fans its pivot groups
//! out to every lower row block; type-2 tasks apply one pivot group to one
//! row block, chained left-to-right so reflectors hit each block in pivot
//! order. Completion is tracked in a table of atomic booleans; ready tasks
//! flow through a priority (or FIFO) queue, blocked ones park in a wait
//! queue until a worker re-checks them.
//!
//! # Quick start
//!
//! ```
//! use tile_qr::{factorize, reconstruct, MatrixStore, QrConfig};
//!
//! let mut store = MatrixStore::from_vec(2, 2, vec![3.0, 1.0, 1.0, 2.0])?;
//! let original = store.as_slice().to_vec();
//!
//! let config = QrConfig { alpha: 1, beta: 1, num_threads: 2, ..QrConfig::default() };
//! let qr = factorize(&mut store, &config)?;
//!
//! // The compact form unpacks back to the original matrix.
//! let rebuilt = reconstruct::reconstruct(&store, qr.reflectors());
//! for (a, b) in rebuilt.iter().zip(original.iter()) {
//!     assert!((a - b).abs() < 1e-12);
//! }
//! # Ok::<(), tile_qr::QrError>(())
//! ```
//!
//! # Module contents
//!
//! - [`api`]: [`factorize`] and the [`Factorization`] result
//! - [`config`]: [`QrConfig`] run parameters
//! - [`core`]: matrix store, Householder kernels, unpacking helpers
//! - [`sched`]: dependency table, queues, worker pool
//! - [`types`]: tile geometry and the immutable task grid
//!
//! The pivot sweep runs along store **rows** (each row donates the reflector
//! that annihilates its own tail), so to factor a tall matrix `A` load `Aᵀ`
//! and read `R` as the transpose of the stored triangle.

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod sched;
pub mod types;

pub use api::{factorize, Factorization};
pub use config::QrConfig;
pub use crate::core::householder::{Breakdown, BreakdownKind, ReflectorScalars};
pub use crate::core::matrix::MatrixStore;
pub use crate::core::reconstruct;
pub use error::{QrError, Result};
pub use sched::dependency::TaskStatus;
pub use sched::worker::{BreakdownEvent, RunReport};
pub use types::{Task, TaskGrid, TaskId, TaskKind, TileParams};
