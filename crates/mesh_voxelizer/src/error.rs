//! Structural failures surfaced to the caller.
//!
//! Geometry anomalies (degenerate triangles, truncated traces, store
//! overflow) are recovered in place and reported through `CycleReport`;
//! only the conditions below abort an operation.

use thiserror::Error;

/// Errors returned by the voxelizer.
#[derive(Debug, Error)]
pub enum VoxelizeError {
  /// The mesh source produced nothing to voxelize.
  #[error("mesh snapshot is empty ({vertices} vertices, {triangles} triangles)")]
  EmptyMesh { vertices: usize, triangles: usize },

  /// A triangle references a vertex that does not exist.
  #[error("triangle {triangle} references vertex {index}, but only {vertex_count} vertices exist")]
  TriangleIndexOutOfRange {
    triangle: usize,
    index: u32,
    vertex_count: usize,
  },

  /// A new cycle was requested before the previous one completed.
  #[error("a voxelization cycle is already in flight; call finish() or tick() until complete")]
  CycleInProgress,

  /// The voxelizer was used after `teardown()`.
  #[error("voxelizer has been torn down")]
  TornDown,

  /// The completion handle of an in-flight cycle produced no result.
  #[error("rasterization job finished without returning its buffers")]
  WorkerLost,

  /// The worker pool could not be created.
  #[error("failed to build worker pool: {0}")]
  ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result alias used across the crate.
pub type VoxelizeResult<T> = Result<T, VoxelizeError>;
