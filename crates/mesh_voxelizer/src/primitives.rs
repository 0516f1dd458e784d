//! Procedural meshes for testing, benchmarking and debugging.
//!
//! Deterministic shapes whose voxelizations are easy to reason about by
//! hand, without loading assets.

use glam::{Vec2, Vec3};

use crate::constants::{CUBE_CORNERS, CUBE_INDICES};
use crate::snapshot::StaticMesh;

/// Axis-aligned box centered at the origin: 8 vertices, 12 triangles.
///
/// Uses the same corner layout and outward winding as the voxel cubes.
/// UVs map x and y of each corner to 0 or 1.
pub fn box_mesh(half_extents: Vec3) -> StaticMesh {
  let positions = CUBE_CORNERS
    .iter()
    .map(|c| Vec3::from_array(*c) * 2.0 * half_extents)
    .collect();
  let uvs = CUBE_CORNERS
    .iter()
    .map(|c| Vec2::new(c[0] + 0.5, c[1] + 0.5))
    .collect();

  StaticMesh::from_flat_indices(positions, uvs, &CUBE_INDICES)
}

/// Cube of edge length `2 * half_extent` centered at the origin.
pub fn cube_mesh(half_extent: f32) -> StaticMesh {
  box_mesh(Vec3::splat(half_extent))
}

/// Latitude/longitude sphere centered at the origin.
///
/// `rings` is clamped to at least 2 and `segments` to at least 3. The seam
/// column is duplicated so UVs wrap cleanly; the zero-area triangles at the
/// poles are left out, giving `2 * segments * (rings - 1)` triangles.
pub fn uv_sphere(radius: f32, rings: u32, segments: u32) -> StaticMesh {
  let rings = rings.max(2);
  let segments = segments.max(3);
  let columns = segments + 1;

  let mut positions = Vec::with_capacity(((rings + 1) * columns) as usize);
  let mut uvs = Vec::with_capacity(positions.capacity());

  for r in 0..=rings {
    let v = r as f32 / rings as f32;
    let theta = v * std::f32::consts::PI;
    for s in 0..=segments {
      let u = s as f32 / segments as f32;
      let phi = u * std::f32::consts::TAU;
      positions.push(
        Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin()) * radius,
      );
      uvs.push(Vec2::new(u, v));
    }
  }

  let mut triangles = Vec::with_capacity((2 * segments * (rings - 1)) as usize);
  for r in 0..rings {
    for s in 0..segments {
      let i0 = r * columns + s;
      let i1 = i0 + 1;
      let i2 = i0 + columns;
      let i3 = i2 + 1;

      if r != 0 {
        triangles.push([i0, i2, i1]);
      }
      if r != rings - 1 {
        triangles.push([i1, i2, i3]);
      }
    }
  }

  StaticMesh::new(positions, uvs, triangles)
}
