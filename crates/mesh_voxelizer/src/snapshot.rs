//! Mesh snapshot adapter.
//!
//! Copies the current state of a [`MeshSource`] into reusable buffers and
//! transforms positions into world space. The snapshot is read-only while a
//! cycle's parallel phase runs.

use glam::{Mat4, Vec2, Vec3};

use crate::config::VoxelizeMode;
use crate::error::{VoxelizeError, VoxelizeResult};

/// Provider of the mesh to voxelize.
///
/// Implemented by the host for whatever owns the geometry (a scene mesh, a
/// skinning baker, a file loader).
pub trait MeshSource {
  /// Vertex positions in local space.
  fn vertices(&self) -> &[Vec3];

  /// Per-vertex UVs. May be empty, in which case every UV is (0, 0).
  fn uvs(&self) -> &[Vec2];

  /// Triangles as triples of vertex indices.
  fn triangles(&self) -> &[[u32; 3]];

  /// Local-to-world transform applied to every vertex.
  fn local_to_world(&self) -> Mat4;
}

/// Blanket impl for boxed trait objects.
impl MeshSource for Box<dyn MeshSource> {
  fn vertices(&self) -> &[Vec3] {
    (**self).vertices()
  }

  fn uvs(&self) -> &[Vec2] {
    (**self).uvs()
  }

  fn triangles(&self) -> &[[u32; 3]] {
    (**self).triangles()
  }

  fn local_to_world(&self) -> Mat4 {
    (**self).local_to_world()
  }
}

/// Owned mesh implementing [`MeshSource`].
#[derive(Clone, Debug, Default)]
pub struct StaticMesh {
  pub positions: Vec<Vec3>,
  pub uvs: Vec<Vec2>,
  pub triangles: Vec<[u32; 3]>,
  pub transform: Mat4,
}

impl StaticMesh {
  pub fn new(positions: Vec<Vec3>, uvs: Vec<Vec2>, triangles: Vec<[u32; 3]>) -> Self {
    Self {
      positions,
      uvs,
      triangles,
      transform: Mat4::IDENTITY,
    }
  }

  /// Build from a flat index list (3 indices per triangle).
  ///
  /// A trailing partial triangle is dropped with a warning.
  pub fn from_flat_indices(positions: Vec<Vec3>, uvs: Vec<Vec2>, indices: &[u32]) -> Self {
    let remainder = indices.len() % 3;
    if remainder != 0 {
      tracing::warn!(
        index_count = indices.len(),
        "index list is not a multiple of 3, ignoring {} trailing indices",
        remainder
      );
    }

    let triangles = indices
      .chunks_exact(3)
      .map(|t| [t[0], t[1], t[2]])
      .collect();

    Self::new(positions, uvs, triangles)
  }

  pub fn with_transform(mut self, transform: Mat4) -> Self {
    self.transform = transform;
    self
  }

  pub fn set_transform(&mut self, transform: Mat4) {
    self.transform = transform;
  }
}

impl MeshSource for StaticMesh {
  fn vertices(&self) -> &[Vec3] {
    &self.positions
  }

  fn uvs(&self) -> &[Vec2] {
    &self.uvs
  }

  fn triangles(&self) -> &[[u32; 3]] {
    &self.triangles
  }

  fn local_to_world(&self) -> Mat4 {
    self.transform
  }
}

/// Read-only per-cycle copy of a mesh, positions in world space.
#[derive(Clone, Debug, Default)]
pub struct MeshSnapshot {
  local_positions: Vec<Vec3>,
  positions: Vec<Vec3>,
  uvs: Vec<Vec2>,
  triangles: Vec<[u32; 3]>,
  transform: Mat4,
  topology_cached: bool,
}

impl MeshSnapshot {
  pub fn new() -> Self {
    Self::default()
  }

  /// Capture `source` the way `mode` requires.
  ///
  /// `Rigid` reads vertices, UVs and triangles once and afterwards only
  /// re-reads the transform. The other modes read everything every time.
  pub fn capture_for_mode<S: MeshSource + ?Sized>(
    &mut self,
    source: &S,
    mode: VoxelizeMode,
  ) -> VoxelizeResult<()> {
    if mode == VoxelizeMode::Rigid && self.topology_cached {
      self.refresh_transform(source.local_to_world());
      Ok(())
    } else {
      self.capture(source)
    }
  }

  /// Copy everything from `source`.
  ///
  /// The source is validated before any buffer is touched, so a failed
  /// capture leaves the previous snapshot intact.
  pub fn capture<S: MeshSource + ?Sized>(&mut self, source: &S) -> VoxelizeResult<()> {
    let vertices = source.vertices();
    let triangles = source.triangles();
    validate(vertices, triangles)?;

    self.local_positions.clear();
    self.local_positions.extend_from_slice(vertices);

    self.triangles.clear();
    self.triangles.extend_from_slice(triangles);

    let uvs = source.uvs();
    self.uvs.clear();
    if uvs.is_empty() {
      self.uvs.resize(vertices.len(), Vec2::ZERO);
    } else {
      if uvs.len() != vertices.len() {
        tracing::warn!(
          uvs = uvs.len(),
          vertices = vertices.len(),
          "UV count does not match vertex count, missing UVs default to (0, 0)"
        );
      }
      let shared = uvs.len().min(vertices.len());
      self.uvs.extend_from_slice(&uvs[..shared]);
      self.uvs.resize(vertices.len(), Vec2::ZERO);
    }

    self.topology_cached = true;
    self.refresh_transform(source.local_to_world());
    Ok(())
  }

  /// Re-apply a transform to the cached local positions.
  pub fn refresh_transform(&mut self, transform: Mat4) {
    self.transform = transform;
    self.positions.clear();
    self.positions.extend(
      self
        .local_positions
        .iter()
        .map(|p| transform.transform_point3(*p)),
    );
  }

  /// Clear per-cycle world positions, keeping capacity and cached topology.
  pub fn clear(&mut self) {
    self.positions.clear();
  }

  /// Clear everything including cached topology, keeping capacity.
  pub fn forget_topology(&mut self) {
    self.local_positions.clear();
    self.positions.clear();
    self.uvs.clear();
    self.triangles.clear();
    self.topology_cached = false;
  }

  /// Drop all buffers and their allocations.
  pub fn release(&mut self) {
    *self = Self::default();
  }

  /// World-space vertex positions.
  pub fn positions(&self) -> &[Vec3] {
    &self.positions
  }

  pub fn uvs(&self) -> &[Vec2] {
    &self.uvs
  }

  pub fn triangles(&self) -> &[[u32; 3]] {
    &self.triangles
  }

  pub fn transform(&self) -> Mat4 {
    self.transform
  }

  pub fn triangle_count(&self) -> usize {
    self.triangles.len()
  }

  /// True once a capture has succeeded and positions are current.
  pub fn is_ready(&self) -> bool {
    self.topology_cached && !self.positions.is_empty()
  }

  /// World positions and UVs of one triangle's corners.
  ///
  /// Indices were validated at capture time.
  #[inline]
  pub fn corners(&self, triangle: usize) -> ([Vec3; 3], [Vec2; 3]) {
    let [a, b, c] = self.triangles[triangle].map(|i| i as usize);
    (
      [self.positions[a], self.positions[b], self.positions[c]],
      [self.uvs[a], self.uvs[b], self.uvs[c]],
    )
  }
}

fn validate(vertices: &[Vec3], triangles: &[[u32; 3]]) -> VoxelizeResult<()> {
  if vertices.is_empty() || triangles.is_empty() {
    return Err(VoxelizeError::EmptyMesh {
      vertices: vertices.len(),
      triangles: triangles.len(),
    });
  }

  let vertex_count = vertices.len();
  for (triangle, indices) in triangles.iter().enumerate() {
    if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
      return Err(VoxelizeError::TriangleIndexOutOfRange {
        triangle,
        index,
        vertex_count,
      });
    }
  }

  Ok(())
}

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod snapshot_test;
