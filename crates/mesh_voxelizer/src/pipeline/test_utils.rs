//! Test utilities for pipeline tests.
//!
//! Provides mesh sources with controllable behavior, recording sinks and an
//! executor that can be held busy.

use std::collections::BTreeSet;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use glam::{Mat4, Vec2, Vec3};

use super::presentation::MeshSink;
use super::types::CycleReport;
use crate::constants::VERTICES_PER_CELL;
use crate::snapshot::MeshSource;
use crate::threading::{TaskExecutor, TaskId};
use crate::types::{GridCell, OutputMesh};

// =============================================================================
// Mesh Sources
// =============================================================================

/// Source with no geometry at all.
pub struct EmptySource;

impl MeshSource for EmptySource {
  fn vertices(&self) -> &[Vec3] {
    &[]
  }

  fn uvs(&self) -> &[Vec2] {
    &[]
  }

  fn triangles(&self) -> &[[u32; 3]] {
    &[]
  }

  fn local_to_world(&self) -> Mat4 {
    Mat4::IDENTITY
  }
}

// =============================================================================
// Sinks
// =============================================================================

/// Sink that records every report it receives.
#[derive(Clone, Default)]
pub struct RecordingSink {
  pub reports: Arc<Mutex<Vec<(usize, CycleReport)>>>,
}

impl RecordingSink {
  pub fn count(&self) -> usize {
    self.reports.lock().unwrap().len()
  }

  pub fn last(&self) -> Option<(usize, CycleReport)> {
    self.reports.lock().unwrap().last().cloned()
  }
}

impl MeshSink for RecordingSink {
  fn on_mesh_ready(&mut self, mesh: &OutputMesh, report: &CycleReport) {
    self
      .reports
      .lock()
      .unwrap()
      .push((mesh.cell_count(), report.clone()));
  }
}

// =============================================================================
// Executors
// =============================================================================

/// Single-worker executor whose only thread is parked on a gate.
///
/// Jobs spawned afterwards stay queued until `open` is called.
pub struct GatedExecutor {
  pub executor: TaskExecutor,
  gate: mpsc::Sender<()>,
  blocker: TaskId,
}

impl GatedExecutor {
  pub fn closed() -> Self {
    let executor = TaskExecutor::new(1).unwrap();
    let (gate, wait) = mpsc::channel::<()>();
    let blocker = executor.spawn(move || {
      let _ = wait.recv();
    });
    Self {
      executor,
      gate,
      blocker,
    }
  }

  /// Release the worker immediately.
  pub fn open(&self) {
    let _ = self.gate.send(());
  }

  /// Release the worker from another thread after `delay`.
  pub fn open_after(&self, delay: Duration) {
    let gate = self.gate.clone();
    std::thread::spawn(move || {
      std::thread::sleep(delay);
      let _ = gate.send(());
    });
  }

  pub fn blocker_pending(&self) -> bool {
    self.executor.is_pending(self.blocker)
  }
}

// =============================================================================
// Output Inspection
// =============================================================================

/// Cells of an output mesh, recovered from cube centers.
pub fn output_cells(mesh: &OutputMesh, voxel_size: f32) -> BTreeSet<GridCell> {
  mesh
    .vertices
    .chunks_exact(VERTICES_PER_CELL)
    .map(|cube| {
      let sum = cube
        .iter()
        .fold(Vec3::ZERO, |acc, v| acc + Vec3::from_array(*v));
      GridCell::from_world_point(sum / VERTICES_PER_CELL as f32, voxel_size)
    })
    .collect()
}

/// Retained UV per cell of an output mesh.
pub fn output_uvs(mesh: &OutputMesh, voxel_size: f32) -> Vec<(GridCell, [f32; 2])> {
  output_cells(mesh, voxel_size)
    .into_iter()
    .zip(mesh.uvs.chunks_exact(VERTICES_PER_CELL).map(|uvs| uvs[0]))
    .collect()
}
