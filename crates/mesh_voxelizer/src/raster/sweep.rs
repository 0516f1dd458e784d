//! Two-edge triangle sweep.
//!
//! ```text
//!            C
//!           /|\
//!          / | \          pass 1: trace A → B, keep every sample
//!         /  |  \         pass 2: trace each sample → C
//!        /   |   \
//!       A────●────B       the union of pass-2 cells is the triangle's
//!         samples          shell footprint on the grid
//! ```
//!
//! This is a ruled-surface approximation rather than area rasterization.
//! Adjacent triangles of a closed mesh share edges, so their sweeps join
//! into a continuous shell.

use glam::{Vec2, Vec3};

use super::{trace_line, LineSample, TraceOutcome};
use crate::config::RasterMode;
use crate::types::GridCell;

/// Counters for one or more triangle sweeps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
  /// Lines traced (edge A→B plus one per edge sample).
  pub lines: usize,
  /// Lines that hit the iteration cap.
  pub truncated_lines: usize,
  /// Cells handed to the consumer, duplicates across lines included.
  pub cells_emitted: usize,
  /// Triangles with (near) zero area.
  pub degenerate_triangles: usize,
  /// Triangles skipped because a corner was not finite.
  pub skipped_triangles: usize,
}

impl SweepStats {
  fn record(&mut self, outcome: TraceOutcome) {
    self.lines += 1;
    if outcome.truncated {
      self.truncated_lines += 1;
    }
  }

  /// Combine counters from two sets of sweeps.
  pub fn merge(mut self, other: SweepStats) -> SweepStats {
    self.lines += other.lines;
    self.truncated_lines += other.truncated_lines;
    self.cells_emitted += other.cells_emitted;
    self.degenerate_triangles += other.degenerate_triangles;
    self.skipped_triangles += other.skipped_triangles;
    self
  }
}

/// Reusable triangle sweeper.
///
/// Holds the pass-1 sample buffer so repeated sweeps on one worker do not
/// allocate.
#[derive(Debug, Default)]
pub struct TriangleSweep {
  edge: Vec<LineSample>,
}

impl TriangleSweep {
  pub fn new() -> Self {
    Self::default()
  }

  /// Sweep one triangle given in grid space.
  ///
  /// `emit` receives every cell of every pass-2 line in trace order.
  pub fn sweep<F: FnMut(GridCell, Vec2)>(
    &mut self,
    corners: [Vec3; 3],
    uvs: [Vec2; 3],
    mode: RasterMode,
    max_steps: usize,
    mut emit: F,
  ) -> SweepStats {
    let mut stats = SweepStats::default();

    if !corners.iter().all(|c| c.is_finite()) {
      stats.skipped_triangles = 1;
      return stats;
    }

    let [a, b, c] = corners;
    if (b - a).cross(c - a).length_squared() <= f32::EPSILON {
      stats.degenerate_triangles = 1;
    }

    let edge = &mut self.edge;
    edge.clear();
    let outcome = trace_line(a, b, uvs[0], uvs[1], mode, max_steps, |s| edge.push(s));
    stats.record(outcome);

    for sample in self.edge.iter() {
      let mut emitted = 0usize;
      let outcome = trace_line(
        sample.point,
        c,
        sample.uv,
        uvs[2],
        mode,
        max_steps,
        |s| {
          emitted += 1;
          emit(s.cell, s.uv);
        },
      );
      stats.record(outcome);
      stats.cells_emitted += emitted;
    }

    stats
  }
}

#[cfg(test)]
#[path = "sweep_test.rs"]
mod sweep_test;
