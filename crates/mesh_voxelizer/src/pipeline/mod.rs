//! Voxelization pipeline.
//!
//! A two-phase cycle driven by the caller's own loop: a parallel
//! rasterization phase on a worker pool, fenced, then a sequential assembly
//! phase on the caller's thread.
//!
//! ```text
//! ┌──────────┐     ┌─────────────────────┐     ┌───────────┐     ┌──────────┐     ┌──────────┐
//! │ Snapshot ├────►│ Rasterize (parallel)├────►│   Fence   ├────►│ Assemble ├────►│ MeshSink │
//! └──────────┘     └─────────────────────┘     └───────────┘     └──────────┘     └──────────┘
//!      │                     │                       │                 │                │
//!  MeshSnapshot      VoxelStore inserts        buffers returned    OutputMesh      CycleReport
//!  (world space)     (one batch per unit)      by the raster job   (swapped in)   (per cycle)
//! ```
//!
//! # Stages
//!
//! 1. **Snapshot**: the mesh source is copied into reusable buffers
//!    (`Rigid` mode re-reads only the transform)
//! 2. **Rasterize**: triangle batches are swept onto the grid in parallel
//!    via rayon, deduplicated in the concurrent store
//! 3. **Fence**: polled across caller cycles or waited on, per config
//! 4. **Assemble**: one cube per unique cell into a staging mesh, which is
//!    published by swapping it with the current output
//! 5. **Present**: the sink is notified with the new mesh and its report

pub mod types;

// Stage implementations
pub mod presentation;
pub mod rasterize;
pub mod voxelizer;

// Test utilities
#[cfg(test)]
pub mod test_utils;

// Consistency tests
#[cfg(test)]
#[path = "consistency_test.rs"]
mod consistency_test;

// Re-exports
pub use presentation::{MeshSink, NullSink};
pub use rasterize::rasterize_snapshot;
pub use types::{CycleId, CycleReport, CycleState};
pub use voxelizer::Voxelizer;
