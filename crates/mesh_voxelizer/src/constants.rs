//! Cuboid topology tables and pipeline limits.
//!
//! # Cuboid Corner Layout
//!
//! Every voxel is emitted as an axis-aligned cube of 8 corners. Corners are
//! stored as unit offsets (±0.5) that get scaled by `voxel_size` and added to
//! the cell center.
//!
//! ```text
//!       7──────6         Corners:
//!      /│     /│           0=(-,-,-)  1=(+,-,-)  2=(+,+,-)  3=(-,+,-)
//!     3─┼────2 │           4=(-,-,+)  5=(+,-,+)  6=(+,+,+)  7=(-,+,+)
//!     │ 4────┼─5
//!     │/     │/          +Y
//!     0──────1            │  +Z
//!                         │ /
//!                         └───+X
//! ```
//!
//! # Face Order
//!
//! ```text
//! Face    Normal  Triangles
//! ──────  ──────  ───────────────────
//! front    +Z     [4,5,6] [4,6,7]
//! top      +Y     [7,6,2] [7,2,3]
//! right    +X     [5,1,2] [5,2,6]
//! left     -X     [0,4,7] [0,7,3]
//! back     -Z     [1,0,3] [1,3,2]
//! bottom   -Y     [0,1,5] [0,5,4]
//! ```
//!
//! All triangles wind counter-clockwise when viewed from outside the cube,
//! so `(b - a) × (c - a)` points away from the cube center.

/// Vertices emitted per voxel.
pub const VERTICES_PER_CELL: usize = 8;

/// Indices emitted per voxel (6 faces × 2 triangles × 3).
pub const INDICES_PER_CELL: usize = 36;

/// Unit corner offsets of a voxel cube, relative to its center.
pub const CUBE_CORNERS: [[f32; 3]; VERTICES_PER_CELL] = [
  [-0.5, -0.5, -0.5], // 0
  [0.5, -0.5, -0.5],  // 1
  [0.5, 0.5, -0.5],   // 2
  [-0.5, 0.5, -0.5],  // 3
  [-0.5, -0.5, 0.5],  // 4
  [0.5, -0.5, 0.5],   // 5
  [0.5, 0.5, 0.5],    // 6
  [-0.5, 0.5, 0.5],   // 7
];

/// Local corner indices for the 12 triangles of a voxel cube.
pub const CUBE_INDICES: [u32; INDICES_PER_CELL] = [
  4, 5, 6, 4, 6, 7, // front (+Z)
  7, 6, 2, 7, 2, 3, // top (+Y)
  5, 1, 2, 5, 2, 6, // right (+X)
  0, 4, 7, 0, 7, 3, // left (-X)
  1, 0, 3, 1, 3, 2, // back (-Z)
  0, 1, 5, 0, 5, 4, // bottom (-Y)
];

/// Outward normal of each face, in `CUBE_INDICES` face order.
pub const FACE_NORMALS: [[f32; 3]; 6] = [
  [0.0, 0.0, 1.0],
  [0.0, 1.0, 0.0],
  [1.0, 0.0, 0.0],
  [-1.0, 0.0, 0.0],
  [0.0, 0.0, -1.0],
  [0.0, -1.0, 0.0],
];

/// Default iteration cap for a single line trace.
///
/// A line of length `L` grid units crosses at most `3 * ceil(L) + 3` cell
/// boundaries, so this covers segments well beyond 2000 cells.
pub const DEFAULT_MAX_TRACE_STEPS: usize = 8192;

/// Default number of triangles handed to one parallel work unit.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Default number of cycles the orchestrator polls before blocking.
pub const DEFAULT_MAX_DEFERRED_CYCLES: u32 = 3;

/// Default pre-size of the deduplication store.
pub const DEFAULT_CAPACITY_HINT: usize = 4096;

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
