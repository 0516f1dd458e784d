//! Grid line rasterizer.
//!
//! Turns a continuous segment in grid space (world position divided by
//! `voxel_size`) into an ordered sequence of cells, each paired with a UV
//! linearly interpolated along the segment.
//!
//! # Exact Traversal
//!
//! ```text
//!   cell boundaries sit at k + 0.5 because cells are found by rounding
//!
//!        -0.5      0.5       1.5       2.5
//!          │    0    │    1    │    2    │
//!   start ─●─────────┼──►──────┼─────────┼──●─ end
//!                    t_x(0)    t_x(1)
//!           segment parameter at which each boundary is crossed
//! ```
//!
//! The current cell is held as integers. Each step picks the axis whose next
//! boundary crossing comes first along the segment and moves the cell by one
//! on that axis, so consecutive cells are face neighbors. Crossing times are
//! recomputed in `f64` from the integer cell and the segment origin, so no
//! error accumulates and long segments far from the origin stay exact.
//!
//! An axis only steps while the end cell has not been reached on it, so the
//! trace always finishes in the cell containing `end` after exactly
//! `|end_cell - start_cell|` (summed over axes) steps. It stops early, after
//! `max_steps` samples, when that is larger (reported as `truncated`).
//!
//! # Subdivided Traversal
//!
//! `max(1, dominant_axis_delta * step_modifier)` evenly spaced samples. Cheap
//! and predictable, but with `step_modifier == 1` diagonal segments can skip
//! cells.

mod sweep;

use glam::{Vec2, Vec3};

pub use sweep::{SweepStats, TriangleSweep};

use crate::config::RasterMode;
use crate::types::GridCell;

/// One cell visited by a trace.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSample {
  /// Cell containing `point`.
  pub cell: GridCell,
  /// Grid-space position on the segment where the cell was entered.
  pub point: Vec3,
  /// UV interpolated by the fraction of the segment already traveled.
  pub uv: Vec2,
}

/// Summary of one trace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraceOutcome {
  /// Number of samples emitted.
  pub samples: usize,
  /// The iteration cap was hit before the segment was covered.
  pub truncated: bool,
}

/// Trace a segment with the configured rasterization variant.
///
/// Consecutive duplicate cells are collapsed, so every emitted sample enters
/// a new cell.
#[inline]
pub fn trace_line<F: FnMut(LineSample)>(
  start: Vec3,
  end: Vec3,
  uv_start: Vec2,
  uv_end: Vec2,
  mode: RasterMode,
  max_steps: usize,
  emit: F,
) -> TraceOutcome {
  match mode {
    RasterMode::Exact => trace_exact(start, end, uv_start, uv_end, max_steps, emit),
    RasterMode::Subdivided { step_modifier } => trace_subdivided(
      start,
      end,
      uv_start,
      uv_end,
      step_modifier,
      max_steps,
      emit,
    ),
  }
}

/// Gap-free grid traversal from `start` to `end`.
pub fn trace_exact<F: FnMut(LineSample)>(
  start: Vec3,
  end: Vec3,
  uv_start: Vec2,
  uv_end: Vec2,
  max_steps: usize,
  mut emit: F,
) -> TraceOutcome {
  let mut outcome = TraceOutcome::default();
  if max_steps == 0 {
    outcome.truncated = true;
    return outcome;
  }

  let length = (end - start).length();

  // Zero-length or NaN-producing segment: a single cell
  if !(length > f32::EPSILON && length.is_finite()) {
    emit(LineSample {
      cell: GridCell::from_grid_point(start),
      point: start,
      uv: uv_start,
    });
    outcome.samples = 1;
    return outcome;
  }

  let first = GridCell::from_grid_point(start);
  let last = GridCell::from_grid_point(end);

  let origin = start.as_dvec3();
  let delta = (end - start).as_dvec3();
  let mut cell = [first.x, first.y, first.z];
  let mut remaining = [
    (i64::from(last.x) - i64::from(first.x)).unsigned_abs(),
    (i64::from(last.y) - i64::from(first.y)).unsigned_abs(),
    (i64::from(last.z) - i64::from(first.z)).unsigned_abs(),
  ];

  emit(LineSample {
    cell: first,
    point: start,
    uv: uv_start,
  });
  outcome.samples = 1;

  loop {
    // Earliest crossing among the axes that still have cells to cross
    let mut next: Option<(usize, f64)> = None;
    for axis in 0..3 {
      if remaining[axis] == 0 {
        continue;
      }
      let t = crossing_time(cell[axis], origin[axis], delta[axis]);
      if next.map_or(true, |(_, best)| t < best) {
        next = Some((axis, t));
      }
    }

    let Some((axis, t)) = next else {
      return outcome;
    };

    if outcome.samples >= max_steps {
      outcome.truncated = true;
      return outcome;
    }

    cell[axis] += if delta[axis] > 0.0 { 1 } else { -1 };
    remaining[axis] -= 1;

    let t = t.clamp(0.0, 1.0);
    emit(LineSample {
      cell: GridCell::new(cell[0], cell[1], cell[2]),
      point: (origin + delta * t).as_vec3(),
      uv: uv_start.lerp(uv_end, t as f32),
    });
    outcome.samples += 1;
  }
}

/// Fixed-subdivision sampling from `start` to `end`.
pub fn trace_subdivided<F: FnMut(LineSample)>(
  start: Vec3,
  end: Vec3,
  uv_start: Vec2,
  uv_end: Vec2,
  step_modifier: u32,
  max_steps: usize,
  mut emit: F,
) -> TraceOutcome {
  let mut outcome = TraceOutcome::default();

  // NaN casts to 0 and infinity saturates; both are bounded below
  let dominant = (end - start).abs().max_element();
  let steps = ((dominant * step_modifier.max(1) as f32) as usize).max(1);

  let mut last: Option<GridCell> = None;
  for i in 0..=steps {
    if i >= max_steps {
      outcome.truncated = true;
      break;
    }

    let t = i as f32 / steps as f32;
    let point = start.lerp(end, t);
    let cell = GridCell::from_grid_point(point);
    if last != Some(cell) {
      emit(LineSample {
        cell,
        point,
        uv: uv_start.lerp(uv_end, t),
      });
      outcome.samples += 1;
      last = Some(cell);
    }
  }

  outcome
}

/// Segment parameter at which the trace leaves `cell` along one axis.
///
/// Cells are found by rounding, so `cell` spans `cell ± 0.5`. A start point
/// lying on the exit boundary yields `t <= 0`.
#[inline]
fn crossing_time(cell: i32, origin: f64, delta: f64) -> f64 {
  let boundary = f64::from(cell) + 0.5 * delta.signum();
  (boundary - origin) / delta
}
