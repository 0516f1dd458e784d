//! Cuboid mesh assembler.
//!
//! Sequential stage that expands the finished voxel set into a renderable
//! mesh, one axis-aligned cube per cell.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │ Assembly                                                           │
//! │                                                                    │
//! │  VoxelStore (post-fence, read-only)                                │
//! │        │  records()                                                │
//! │        ▼                                                           │
//! │  scratch: Vec<VoxelRecord> ──► sort by GridCell                    │
//! │        │                                                           │
//! │        ▼  per record                                               │
//! │  OutputMesh::push_cube(cell × voxel_size, voxel_size, uv)          │
//! │    +8 vertices, +8 UVs, +36 indices offset by the running count    │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sorting makes the byte layout of the output depend only on the cell set,
//! not on the store's iteration order.

use crate::store::VoxelStore;
use crate::types::{OutputMesh, VoxelRecord};

/// Reusable assembler state.
#[derive(Debug, Default)]
pub struct CuboidAssembler {
  scratch: Vec<VoxelRecord>,
}

impl CuboidAssembler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity(cells: usize) -> Self {
    Self {
      scratch: Vec::with_capacity(cells),
    }
  }

  /// Clear `output` and fill it with one cube per record in `store`.
  ///
  /// Returns the number of cells emitted.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, fields(cells = store.len())))]
  pub fn assemble(&mut self, store: &VoxelStore, voxel_size: f32, output: &mut OutputMesh) -> usize {
    self.scratch.clear();
    self.scratch.extend(store.records());
    self.scratch.sort_unstable_by_key(|record| record.cell);

    self.assemble_records(voxel_size, output)
  }

  fn assemble_records(&self, voxel_size: f32, output: &mut OutputMesh) -> usize {
    output.clear();
    output.reserve_cells(self.scratch.len());

    for record in &self.scratch {
      output.push_cube(record.cell.center(voxel_size), voxel_size, record.uv);
    }

    self.scratch.len()
  }

  /// Drop the scratch allocation.
  pub fn release(&mut self) {
    self.scratch = Vec::new();
  }
}
