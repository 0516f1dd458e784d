//! End-to-end tests for the voxelization cycle.
//!
//! Drives `Voxelizer` through every mode and execution contract and checks
//! the published mesh against cell sets enumerated by hand.

use std::collections::BTreeSet;
use std::time::Duration;

use glam::{Mat4, Vec2, Vec3};

use super::test_utils::{output_cells, output_uvs, EmptySource, GatedExecutor, RecordingSink};
use super::*;
use crate::config::{RasterMode, VoxelizeMode, VoxelizerConfig};
use crate::constants::{INDICES_PER_CELL, VERTICES_PER_CELL};
use crate::error::VoxelizeError;
use crate::primitives::{cube_mesh, uv_sphere};
use crate::snapshot::StaticMesh;
use crate::types::GridCell;

/// Every cell of `{-n..=n}³` with at least one coordinate at ±n.
fn cube_shell(n: i32) -> BTreeSet<GridCell> {
  let mut cells = BTreeSet::new();
  for x in -n..=n {
    for y in -n..=n {
      for z in -n..=n {
        if x.abs() == n || y.abs() == n || z.abs() == n {
          cells.insert(GridCell::new(x, y, z));
        }
      }
    }
  }
  cells
}

fn assert_size_invariant(mesh: &crate::types::OutputMesh, cells: usize) {
  assert_eq!(mesh.vertices.len(), VERTICES_PER_CELL * cells);
  assert_eq!(mesh.uvs.len(), VERTICES_PER_CELL * cells);
  assert_eq!(mesh.indices.len(), INDICES_PER_CELL * cells);
}

// =============================================================================
// Geometry
// =============================================================================

#[test]
fn test_unit_cube_scenario() {
  let mut voxelizer = Voxelizer::new(VoxelizerConfig::default()).unwrap();

  let mesh = voxelizer.run_once(&cube_mesh(1.0)).unwrap().clone();

  let expected = cube_shell(1);
  assert_eq!(expected.len(), 26);
  assert_eq!(output_cells(&mesh, 1.0), expected);
  assert_eq!(mesh.vertices.len(), 208);
  assert_eq!(mesh.indices.len(), 936);
  assert_eq!(mesh.bounds.min, [-1.5; 3]);
  assert_eq!(mesh.bounds.max, [1.5; 3]);

  let report = voxelizer.last_report().unwrap();
  assert_eq!(report.triangles, 12);
  assert_eq!(report.unique_cells, 26);
  assert_eq!(report.truncated_lines, 0);
  assert_eq!(report.degenerate_triangles, 0);
  assert_eq!(voxelizer.state(), CycleState::Complete);
}

#[test]
fn test_voxel_size_scales_grid() {
  let config = VoxelizerConfig::default().with_voxel_size(0.5);
  let mut voxelizer = Voxelizer::new(config).unwrap();

  let mesh = voxelizer.run_once(&cube_mesh(1.0)).unwrap();

  assert_eq!(output_cells(mesh, 0.5), cube_shell(2));
  assert_eq!(mesh.bounds.max, [1.25; 3]);
}

#[test]
fn test_subdivided_mode_stays_on_the_shell() {
  let config = VoxelizerConfig::default().with_raster_mode(RasterMode::Subdivided { step_modifier: 4 });
  let mut voxelizer = Voxelizer::new(config).unwrap();

  let mesh = voxelizer.run_once(&cube_mesh(1.0)).unwrap();
  let cells = output_cells(mesh, 1.0);

  assert!(cells.is_subset(&cube_shell(1)));
  assert_size_invariant(mesh, cells.len());
}

#[test]
fn test_size_invariant_across_voxel_sizes() {
  let sphere = uv_sphere(6.0, 16, 24);

  for voxel_size in [0.25, 0.7, 1.0, 3.0] {
    let config = VoxelizerConfig::default().with_voxel_size(voxel_size);
    let mut voxelizer = Voxelizer::new(config).unwrap();

    let mesh = voxelizer.run_once(&sphere).unwrap().clone();
    let report = voxelizer.last_report().unwrap();

    assert!(report.unique_cells > 0);
    assert_size_invariant(&mesh, report.unique_cells);
    assert_eq!(mesh.cell_count(), report.unique_cells);
  }
}

#[test]
fn test_idempotent_repeat_cycles() {
  let sphere = uv_sphere(4.0, 10, 16);
  let config = VoxelizerConfig::default().with_mode(VoxelizeMode::Skinned);
  let mut voxelizer = Voxelizer::new(config).unwrap();

  let first = voxelizer.run_once(&sphere).unwrap().clone();
  let second = voxelizer.run_once(&sphere).unwrap().clone();

  assert_eq!(first.vertices, second.vertices);
  assert_eq!(first.uvs, second.uvs);
  assert_eq!(first.indices, second.indices);
}

#[test]
fn test_deterministic_across_thread_counts() {
  let sphere = uv_sphere(9.0, 20, 32);
  let mut outputs = Vec::new();

  for threads in [1, 2, 4, 0] {
    let config = VoxelizerConfig::default()
      .with_voxel_size(0.5)
      .with_batch_size(1)
      .with_worker_threads(threads);
    let mut voxelizer = Voxelizer::new(config).unwrap();
    outputs.push(voxelizer.run_once(&sphere).unwrap().clone());
  }

  for other in &outputs[1..] {
    assert_eq!(outputs[0].vertices, other.vertices);
    assert_eq!(outputs[0].uvs, other.uvs);
    assert_eq!(outputs[0].indices, other.indices);
  }
}

// =============================================================================
// Contested Cells
// =============================================================================

/// Two coincident triangles that differ only in UV.
fn overlapping_triangles(first_uv: Vec2, second_uv: Vec2) -> StaticMesh {
  let corners = [
    Vec3::new(0.0, 0.0, 0.0),
    Vec3::new(6.0, 0.0, 0.0),
    Vec3::new(0.0, 5.0, 2.0),
  ];
  let positions = corners.iter().chain(corners.iter()).copied().collect();
  let uvs = vec![first_uv, first_uv, first_uv, second_uv, second_uv, second_uv];
  StaticMesh::new(positions, uvs, vec![[0, 1, 2], [3, 4, 5]])
}

#[test]
fn test_contested_cells_keep_lowest_triangle_uv() {
  let low = Vec2::new(0.1, 0.1);
  let high = Vec2::new(0.9, 0.9);

  for threads in [1, 4] {
    let config = VoxelizerConfig::default()
      .with_batch_size(1)
      .with_worker_threads(threads);
    let mut voxelizer = Voxelizer::new(config).unwrap();

    let mesh = voxelizer.run_once(&overlapping_triangles(low, high)).unwrap();
    assert!(!mesh.is_empty());
    for (cell, uv) in output_uvs(mesh, 1.0) {
      assert_eq!(uv, low.to_array(), "cell {:?} kept the wrong UV", cell);
    }

    // Swapping triangle order swaps the winner
    let mesh = voxelizer.run_once(&overlapping_triangles(high, low)).unwrap();
    for (_, uv) in output_uvs(mesh, 1.0) {
      assert_eq!(uv, high.to_array());
    }
  }
}

// =============================================================================
// Execution Contract
// =============================================================================

#[test]
fn test_spread_mode_forces_wait_after_cap() {
  let gated = GatedExecutor::closed();
  let config = VoxelizerConfig::default()
    .with_spread_across_cycles(true)
    .with_max_deferred_cycles(3);
  let mut voxelizer = Voxelizer::with_executor(config, gated.executor.clone());

  voxelizer.begin_cycle(&cube_mesh(1.0)).unwrap();
  for _ in 0..3 {
    assert_eq!(voxelizer.tick().unwrap(), CycleState::AwaitingFence);
  }
  assert!(gated.blocker_pending());

  gated.open_after(Duration::from_millis(100));
  assert_eq!(voxelizer.tick().unwrap(), CycleState::Complete);

  let report = voxelizer.last_report().unwrap();
  assert_eq!(report.cycles_deferred, 3);
  assert!(report.forced_wait);
  assert_eq!(report.unique_cells, 26);
}

#[test]
fn test_spread_mode_completes_within_cap() {
  let config = VoxelizerConfig::default()
    .with_mode(VoxelizeMode::Skinned)
    .with_spread_across_cycles(true)
    .with_max_deferred_cycles(2);
  let mut voxelizer = Voxelizer::new(config).unwrap();
  let sphere = uv_sphere(20.0, 24, 48);

  for _ in 0..5 {
    let mut calls = 1;
    let mut state = voxelizer.update(&sphere).unwrap();
    while state != CycleState::Complete {
      calls += 1;
      state = voxelizer.update(&sphere).unwrap();
    }

    assert!(calls <= 3, "cycle took {} calls", calls);
    let report = voxelizer.last_report().unwrap();
    assert!(report.cycles_deferred <= 2);
    if report.forced_wait {
      assert_eq!(report.cycles_deferred, 2);
    }
  }
}

#[test]
fn test_blocking_mode_completes_each_update() {
  let config = VoxelizerConfig::default().with_mode(VoxelizeMode::Skinned);
  let mut voxelizer = Voxelizer::new(config).unwrap();
  let cube = cube_mesh(1.0);

  for expected in 0..3 {
    assert_eq!(voxelizer.update(&cube).unwrap(), CycleState::Complete);
    let report = voxelizer.last_report().unwrap();
    assert_eq!(report.cycle_id, CycleId(expected));
    assert_eq!(report.cycles_deferred, 0);
    assert!(!report.forced_wait);
  }
}

#[test]
fn test_begin_while_in_flight_is_rejected() {
  let gated = GatedExecutor::closed();
  let config = VoxelizerConfig::default().with_spread_across_cycles(true);
  let mut voxelizer = Voxelizer::with_executor(config, gated.executor.clone());
  let cube = cube_mesh(1.0);

  assert_eq!(voxelizer.begin_cycle(&cube).unwrap(), CycleId(0));
  assert!(matches!(
    voxelizer.begin_cycle(&cube),
    Err(VoxelizeError::CycleInProgress)
  ));
  assert!(matches!(voxelizer.reset(), Err(VoxelizeError::CycleInProgress)));

  // update ticks the in-flight cycle instead of starting another
  assert_eq!(voxelizer.update(&cube).unwrap(), CycleState::AwaitingFence);

  gated.open();
  assert_eq!(voxelizer.finish().unwrap(), CycleState::Complete);
  assert_eq!(voxelizer.last_report().unwrap().cycle_id, CycleId(0));

  // Complete accepts a new cycle
  assert_eq!(voxelizer.begin_cycle(&cube).unwrap(), CycleId(1));
  voxelizer.finish().unwrap();
}

#[test]
fn test_tick_outside_fence_is_a_no_op() {
  let mut voxelizer = Voxelizer::new(VoxelizerConfig::default()).unwrap();

  assert_eq!(voxelizer.tick().unwrap(), CycleState::Idle);
  assert_eq!(voxelizer.finish().unwrap(), CycleState::Idle);
  assert!(voxelizer.last_report().is_none());
  assert!(voxelizer.output().is_empty());
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_failed_cycle_keeps_previous_output() {
  let sink = RecordingSink::default();
  let config = VoxelizerConfig::default().with_mode(VoxelizeMode::Skinned);
  let mut voxelizer = Voxelizer::new(config).unwrap().with_sink(sink.clone());

  let before = voxelizer.run_once(&cube_mesh(1.0)).unwrap().clone();

  let err = voxelizer.run_once(&EmptySource).unwrap_err();
  assert!(matches!(err, VoxelizeError::EmptyMesh { .. }));

  let mut bad = cube_mesh(1.0);
  bad.triangles.push([0, 1, 99]);
  assert!(matches!(
    voxelizer.update(&bad),
    Err(VoxelizeError::TriangleIndexOutOfRange { index: 99, .. })
  ));

  assert_eq!(voxelizer.state(), CycleState::Complete);
  assert_eq!(voxelizer.output().vertices, before.vertices);
  assert_eq!(voxelizer.output().indices, before.indices);
  assert_eq!(sink.count(), 1);
}

#[test]
fn test_geometry_anomalies_are_reported_not_raised() {
  let mut mesh = cube_mesh(1.0);
  mesh.positions.push(Vec3::new(f32::NAN, 0.0, 0.0));
  mesh.triangles.push([0, 1, 8]);
  mesh.triangles.push([2, 2, 2]);

  let mut voxelizer = Voxelizer::new(VoxelizerConfig::default()).unwrap();
  voxelizer.run_once(&mesh).unwrap();

  let report = voxelizer.last_report().unwrap();
  assert_eq!(report.triangles, 14);
  assert_eq!(report.skipped_triangles, 1);
  assert_eq!(report.degenerate_triangles, 1);
  assert_eq!(report.unique_cells, 26);
}

#[test]
fn test_truncation_is_reported() {
  let config = VoxelizerConfig::default().with_max_trace_steps(2);
  let mut voxelizer = Voxelizer::new(config).unwrap();

  let mesh = voxelizer.run_once(&uv_sphere(10.0, 8, 8)).unwrap().clone();
  let report = voxelizer.last_report().unwrap();

  assert!(report.truncated_lines > 0);
  assert_size_invariant(&mesh, report.unique_cells);
}

#[test]
fn test_capacity_overflow_grows_store() {
  let config = VoxelizerConfig::default().with_capacity_hint(4);
  let mut voxelizer = Voxelizer::new(config).unwrap();

  let mesh = voxelizer.run_once(&cube_mesh(1.0)).unwrap();
  assert_eq!(mesh.cell_count(), 26);
  assert!(voxelizer.last_report().unwrap().capacity_exceeded);
}

#[test]
fn test_invalid_config_is_corrected() {
  let config = VoxelizerConfig::default()
    .with_voxel_size(-2.0)
    .with_batch_size(0);
  let voxelizer = Voxelizer::new(config).unwrap();

  assert_eq!(voxelizer.config().voxel_size, 1.0);
  assert!(voxelizer.config().batch_size > 0);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_teardown_rejects_further_use() {
  let mut voxelizer = Voxelizer::new(VoxelizerConfig::default()).unwrap();
  voxelizer.run_once(&cube_mesh(1.0)).unwrap();

  voxelizer.teardown();
  voxelizer.teardown();

  assert!(voxelizer.is_torn_down());
  assert!(voxelizer.output().is_empty());
  assert!(matches!(
    voxelizer.begin_cycle(&cube_mesh(1.0)),
    Err(VoxelizeError::TornDown)
  ));
  assert!(matches!(voxelizer.tick(), Err(VoxelizeError::TornDown)));
  assert!(matches!(voxelizer.finish(), Err(VoxelizeError::TornDown)));
  assert!(matches!(voxelizer.reset(), Err(VoxelizeError::TornDown)));
  assert!(matches!(
    voxelizer.update(&cube_mesh(1.0)),
    Err(VoxelizeError::TornDown)
  ));
}

#[test]
fn test_teardown_drains_in_flight_cycle() {
  let gated = GatedExecutor::closed();
  let sink = RecordingSink::default();
  let config = VoxelizerConfig::default().with_spread_across_cycles(true);
  let mut voxelizer =
    Voxelizer::with_executor(config, gated.executor.clone()).with_sink(sink.clone());

  voxelizer.begin_cycle(&cube_mesh(1.0)).unwrap();
  gated.open_after(Duration::from_millis(20));
  voxelizer.teardown();

  assert_eq!(voxelizer.state(), CycleState::Idle);
  assert_eq!(gated.executor.pending_count(), 0);
  assert_eq!(sink.count(), 0);
}

#[test]
fn test_reset_returns_to_idle() {
  let mut voxelizer = Voxelizer::new(VoxelizerConfig::default()).unwrap();
  voxelizer.run_once(&cube_mesh(1.0)).unwrap();

  assert_eq!(voxelizer.reset().unwrap(), CycleState::Idle);
  // Published output survives the reset
  assert_eq!(voxelizer.output().cell_count(), 26);
  assert_eq!(voxelizer.reset().unwrap(), CycleState::Idle);
}

// =============================================================================
// Modes
// =============================================================================

#[test]
fn test_static_mode_runs_one_cycle() {
  let sink = RecordingSink::default();
  let mut voxelizer = Voxelizer::new(VoxelizerConfig::default())
    .unwrap()
    .with_sink(sink.clone());
  let cube = cube_mesh(1.0);

  for _ in 0..3 {
    assert_eq!(voxelizer.update(&cube).unwrap(), CycleState::Complete);
  }
  assert_eq!(sink.count(), 1);

  voxelizer.reset().unwrap();
  assert_eq!(voxelizer.update(&cube).unwrap(), CycleState::Complete);
  assert_eq!(sink.count(), 2);
  assert_eq!(sink.last().map(|(cells, _)| cells), Some(26));
}

#[test]
fn test_rigid_mode_follows_transform_only() {
  let config = VoxelizerConfig::default().with_mode(VoxelizeMode::Rigid);
  let mut voxelizer = Voxelizer::new(config).unwrap();
  let mut cube = cube_mesh(1.0);

  voxelizer.update(&cube).unwrap();
  assert_eq!(output_cells(voxelizer.output(), 1.0), cube_shell(1));

  // Deform and move; only the move is picked up
  cube.positions.iter_mut().for_each(|p| *p *= 2.0);
  cube.set_transform(Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));
  voxelizer.update(&cube).unwrap();

  let shifted: BTreeSet<GridCell> = cube_shell(1)
    .into_iter()
    .map(|c| GridCell::new(c.x + 10, c.y, c.z))
    .collect();
  assert_eq!(output_cells(voxelizer.output(), 1.0), shifted);
}

#[test]
fn test_rigid_mode_rereads_topology_after_reset() {
  let config = VoxelizerConfig::default().with_mode(VoxelizeMode::Rigid);
  let mut voxelizer = Voxelizer::new(config).unwrap();

  voxelizer.update(&cube_mesh(1.0)).unwrap();
  assert_eq!(output_cells(voxelizer.output(), 1.0), cube_shell(1));

  // A different mesh is ignored while the topology is cached
  voxelizer.update(&cube_mesh(2.0)).unwrap();
  assert_eq!(output_cells(voxelizer.output(), 1.0), cube_shell(1));

  voxelizer.reset().unwrap();
  voxelizer.update(&cube_mesh(2.0)).unwrap();
  assert_eq!(output_cells(voxelizer.output(), 1.0), cube_shell(2));
}

#[test]
fn test_skinned_mode_follows_deformation() {
  let config = VoxelizerConfig::default().with_mode(VoxelizeMode::Skinned);
  let mut voxelizer = Voxelizer::new(config).unwrap();
  let mut cube = cube_mesh(1.0);

  voxelizer.update(&cube).unwrap();
  assert_eq!(voxelizer.output().cell_count(), 26);

  cube.positions.iter_mut().for_each(|p| *p *= 2.0);
  voxelizer.update(&cube).unwrap();

  assert_eq!(output_cells(voxelizer.output(), 1.0), cube_shell(2));
  assert_eq!(voxelizer.last_report().unwrap().cycle_id, CycleId(1));
}

#[test]
fn test_sink_sees_published_mesh() {
  let sink = RecordingSink::default();
  let config = VoxelizerConfig::default().with_mode(VoxelizeMode::Skinned);
  let mut voxelizer = Voxelizer::new(config).unwrap().with_sink(sink.clone());

  voxelizer.update(&cube_mesh(1.0)).unwrap();
  voxelizer.update(&cube_mesh(2.0)).unwrap();

  let reports = sink.reports.lock().unwrap();
  assert_eq!(reports.len(), 2);
  assert_eq!(reports[0].0, 26);
  assert_eq!(reports[1].0, 98);
  assert_eq!(reports[1].1.unique_cells, 98);
}

#[cfg(feature = "metrics")]
#[test]
fn test_metrics_track_cycles() {
  let config = VoxelizerConfig::default().with_mode(VoxelizeMode::Skinned);
  let mut voxelizer = Voxelizer::new(config).unwrap();

  for _ in 0..4 {
    voxelizer.update(&cube_mesh(1.0)).unwrap();
  }

  let metrics = voxelizer.metrics();
  assert_eq!(metrics.cycles_completed, 4);
  assert_eq!(metrics.last_cell_count(), Some(26));
  assert_eq!(metrics.raster_timings.len(), 4);
}
