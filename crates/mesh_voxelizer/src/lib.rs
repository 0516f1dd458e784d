//! mesh_voxelizer - Engine independent mesh to voxel-shell conversion
//!
//! This crate approximates a triangle mesh with unit cells on a regular 3D
//! grid and expands the result into a renderable mesh of one cube per cell.
//! Each triangle is swept onto the grid along two of its edges, producing a
//! continuous shell (not a solid fill) for closed meshes.
//!
//! # Features
//!
//! - **Gap-free line rasterization**: grid traversal that never skips a
//!   cell, plus a cheaper fixed-subdivision variant
//! - **Parallel sweep**: triangle batches rasterized on a rayon pool into a
//!   concurrent deduplication store
//! - **Deterministic output**: contested cells resolve by triangle index and
//!   cubes are emitted in cell order, independent of thread count
//! - **Cycle orchestration**: static, rigid and skinned modes, with the
//!   parallel phase optionally spread across several caller cycles
//!
//! # Example
//!
//! ```ignore
//! use mesh_voxelizer::{primitives, Voxelizer, VoxelizerConfig};
//!
//! let mut voxelizer = Voxelizer::new(VoxelizerConfig::default().with_voxel_size(0.5))?;
//! let mesh = voxelizer.run_once(&primitives::cube_mesh(1.0))?;
//!
//! println!("Generated {} cubes, {} triangles",
//!     mesh.cell_count(), mesh.triangle_count());
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use config::{RasterMode, VoxelizeMode, VoxelizerConfig};
pub use constants::{CUBE_CORNERS, CUBE_INDICES, INDICES_PER_CELL, VERTICES_PER_CELL};
pub use error::{VoxelizeError, VoxelizeResult};
pub use types::{GridCell, MeshData, MinMaxAABB, OutputMesh, VoxelRecord};

// Mesh snapshot adapter
pub mod snapshot;
pub use snapshot::{MeshSnapshot, MeshSource, StaticMesh};

// Grid line rasterizer and triangle sweep
pub mod raster;

// Concurrent deduplication store
pub mod store;
pub use store::VoxelStore;

// Cuboid mesh assembly
pub mod assembler;
pub use assembler::CuboidAssembler;

// Cycle orchestration
pub mod pipeline;
pub use pipeline::{CycleId, CycleReport, CycleState, MeshSink, NullSink, Voxelizer};

// Worker pool with pollable completion handles
pub mod threading;
pub use threading::{TaskExecutor, TaskId};

// Procedural test meshes
pub mod primitives;

pub mod metrics;
