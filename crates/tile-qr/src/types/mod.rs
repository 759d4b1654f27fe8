//! Task-grid type definitions.
//!
//! The factorization is decomposed over a two-dimensional grid of tiles.
//! [`TileParams`] maps matrix rows onto grid coordinates; [`TaskGrid`] is the
//! immutable catalog of [`Task`] descriptors the dispatcher executes.

mod task;
mod tiling;

pub use task::{Task, TaskGrid, TaskId, TaskKind};
pub use tiling::TileParams;
