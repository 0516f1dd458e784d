//! Core data types shared by the voxelization stages.

use glam::{Vec2, Vec3};

use crate::constants::{CUBE_CORNERS, INDICES_PER_CELL, VERTICES_PER_CELL};

/// Integer address of one cubic region of side `voxel_size`.
///
/// Obtained by rounding a grid-space position (world position divided by
/// `voxel_size`) to the nearest integer on every axis. Equality, hashing and
/// ordering use only the three components.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
  pub x: i32,
  pub y: i32,
  pub z: i32,
}

impl GridCell {
  pub const fn new(x: i32, y: i32, z: i32) -> Self {
    Self { x, y, z }
  }

  /// Cell containing a grid-space point.
  ///
  /// Non-finite components saturate (`NaN` maps to 0); callers filter
  /// non-finite geometry before tracing.
  #[inline]
  pub fn from_grid_point(point: Vec3) -> Self {
    let r = point.round();
    Self {
      x: r.x as i32,
      y: r.y as i32,
      z: r.z as i32,
    }
  }

  /// Cell containing a world-space point.
  #[inline]
  pub fn from_world_point(point: Vec3, voxel_size: f32) -> Self {
    Self::from_grid_point(point / voxel_size)
  }

  /// World-space center of this cell.
  #[inline]
  pub fn center(&self, voxel_size: f32) -> Vec3 {
    Vec3::new(self.x as f32, self.y as f32, self.z as f32) * voxel_size
  }

  /// Largest per-axis difference between two cells.
  ///
  /// Two consecutive cells of a gap-free trace are at most 1 apart.
  #[inline]
  pub fn chebyshev_distance(&self, other: &GridCell) -> u32 {
    let dx = self.x.abs_diff(other.x);
    let dy = self.y.abs_diff(other.y);
    let dz = self.z.abs_diff(other.z);
    dx.max(dy).max(dz)
  }
}

/// One deduplicated voxel: a cell and the UV it keeps for the cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelRecord {
  pub cell: GridCell,
  pub uv: Vec2,
}

/// Axis-aligned bounding box.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxAABB {
  pub min: [f32; 3],
  pub max: [f32; 3],
}

impl MinMaxAABB {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: [f32::INFINITY; 3],
      max: [f32::NEG_INFINITY; 3],
    }
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: [f32; 3]) {
    for i in 0..3 {
      self.min[i] = self.min[i].min(point[i]);
      self.max[i] = self.max[i].max(point[i]);
    }
  }

  /// Check if AABB is valid (min <= max on all axes).
  pub fn is_valid(&self) -> bool {
    self.min[0] <= self.max[0] && self.min[1] <= self.max[1] && self.min[2] <= self.max[2]
  }
}

impl Default for MinMaxAABB {
  fn default() -> Self {
    Self::empty()
  }
}

/// Renderable cuboid-per-cell mesh.
///
/// Buffer lengths are always exact multiples of the unique cell count:
/// 8 vertices and 8 UVs per cell, 36 indices per cell.
#[derive(Clone, Debug, Default)]
pub struct OutputMesh {
  /// Cube corner positions, world space.
  pub vertices: Vec<[f32; 3]>,

  /// One UV per vertex; all 8 corners of a cube share their cell's UV.
  pub uvs: Vec<[f32; 2]>,

  /// Triangle indices (3 indices per triangle).
  pub indices: Vec<u32>,

  /// Bounding box encompassing all vertices.
  pub bounds: MinMaxAABB,
}

impl OutputMesh {
  pub fn new() -> Self {
    Self::default()
  }

  /// Pre-size all buffers for `cells` voxels.
  pub fn with_cell_capacity(cells: usize) -> Self {
    Self {
      vertices: Vec::with_capacity(cells * VERTICES_PER_CELL),
      uvs: Vec::with_capacity(cells * VERTICES_PER_CELL),
      indices: Vec::with_capacity(cells * INDICES_PER_CELL),
      bounds: MinMaxAABB::empty(),
    }
  }

  /// Clear all buffers, preserving capacity.
  pub fn clear(&mut self) {
    self.vertices.clear();
    self.uvs.clear();
    self.indices.clear();
    self.bounds = MinMaxAABB::empty();
  }

  /// Make room for `cells` more voxels.
  pub fn reserve_cells(&mut self, cells: usize) {
    self.vertices.reserve(cells * VERTICES_PER_CELL);
    self.uvs.reserve(cells * VERTICES_PER_CELL);
    self.indices.reserve(cells * INDICES_PER_CELL);
  }

  /// Drop all buffers and their allocations.
  pub fn release(&mut self) {
    *self = Self::default();
  }

  /// Returns true if no geometry was generated.
  pub fn is_empty(&self) -> bool {
    self.vertices.is_empty()
  }

  /// Number of voxels in the mesh.
  pub fn cell_count(&self) -> usize {
    self.vertices.len() / VERTICES_PER_CELL
  }

  /// Number of triangles in the mesh.
  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  /// Append one cube centered at `center` with edge length `size`.
  ///
  /// Indices are offset by the current vertex count, so cubes must be pushed
  /// from a single writer.
  pub fn push_cube(&mut self, center: Vec3, size: f32, uv: Vec2) {
    let base = self.vertices.len() as u32;

    for corner in CUBE_CORNERS {
      let position = (center + Vec3::from_array(corner) * size).to_array();
      self.vertices.push(position);
      self.uvs.push(uv.to_array());
      self.bounds.encapsulate(position);
    }

    self
      .indices
      .extend(crate::constants::CUBE_INDICES.iter().map(|&i| base + i));
  }

  /// Byte-level copy of the buffers for upload to a renderer.
  pub fn to_mesh_data(&self) -> MeshData {
    MeshData {
      vertices: bytemuck::cast_slice(&self.vertices).to_vec(),
      uvs: bytemuck::cast_slice(&self.uvs).to_vec(),
      indices: bytemuck::cast_slice(&self.indices).to_vec(),
      vertex_count: self.vertices.len() as u32,
      index_count: self.indices.len() as u32,
      bounds: self.bounds,
    }
  }
}

/// Byte-level mesh data ready for FFI or GPU upload.
#[derive(Clone)]
pub struct MeshData {
  /// Positions as raw bytes (`[f32; 3]` layout).
  pub vertices: Vec<u8>,

  /// UVs as raw bytes (`[f32; 2]` layout).
  pub uvs: Vec<u8>,

  /// Index data as raw bytes (u32 layout).
  pub indices: Vec<u8>,

  /// Number of vertices.
  pub vertex_count: u32,

  /// Number of indices.
  pub index_count: u32,

  /// Mesh bounding box.
  pub bounds: MinMaxAABB,
}

impl std::fmt::Debug for MeshData {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MeshData")
      .field("vertex_count", &self.vertex_count)
      .field("index_count", &self.index_count)
      .field("bounds", &self.bounds)
      .finish()
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
