//! MeshSink - callback interface for renderer bridges.
//!
//! The orchestrator notifies the host once per completed cycle, after the
//! new mesh has been published, without depending on any renderer.

use super::types::CycleReport;
use crate::types::OutputMesh;

/// Receiver of completed meshes.
///
/// Called on the thread that drives the orchestrator, inside `tick`,
/// `finish`, `update` or `run_once`.
///
/// # Example
///
/// ```ignore
/// struct GpuUpload {
///     queue: UploadQueue,
/// }
///
/// impl MeshSink for GpuUpload {
///     fn on_mesh_ready(&mut self, mesh: &OutputMesh, report: &CycleReport) {
///         self.queue.push(report.cycle_id, mesh.to_mesh_data());
///     }
/// }
/// ```
pub trait MeshSink: Send {
  /// A cycle reached `Complete` and `mesh` is the newly published output.
  fn on_mesh_ready(&mut self, mesh: &OutputMesh, report: &CycleReport);
}

/// No-op implementation for testing and headless operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl MeshSink for NullSink {
  fn on_mesh_ready(&mut self, _mesh: &OutputMesh, _report: &CycleReport) {
    // No-op
  }
}

impl<F> MeshSink for F
where
  F: FnMut(&OutputMesh, &CycleReport) + Send,
{
  fn on_mesh_ready(&mut self, mesh: &OutputMesh, report: &CycleReport) {
    self(mesh, report)
  }
}
