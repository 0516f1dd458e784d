//! Pipeline orchestrator.
//!
//! Drives one cycle at a time through the state machine in
//! [`CycleState`], owning every buffer between cycles.
//!
//! ```text
//!            caller thread                          worker pool
//!  ─────────────────────────────────────   ──────────────────────────────
//!  begin_cycle(source)
//!    capture snapshot into buffers
//!    spawn(buffers) ─────────────────────► run_raster_job(buffers)
//!                                            par_chunks → sweep → store
//!  tick()  poll ─── pending ──► AwaitingFence      │
//!  tick()  poll ─── pending ──► AwaitingFence      │
//!  tick()  poll ◄────────────────────────── RasterOutput { buffers, .. }
//!    assemble(store) into staging
//!    swap(staging, output) ──► MeshSink
//!    Complete
//! ```
//!
//! The raster job owns the snapshot and the store while it runs and hands
//! them back when it finishes. Getting them back is the fence: assembly
//! cannot start before every insert has happened because until then the
//! orchestrator does not hold the store.
//!
//! # Execution Contract
//!
//! - `spread_across_cycles == false`: `tick` blocks until the parallel phase
//!   finishes, so `update` completes a cycle per call.
//! - `spread_across_cycles == true`: `tick` polls and returns
//!   `AwaitingFence` while the job runs, at most `max_deferred_cycles`
//!   times; the next `tick` blocks.
//!
//! # Re-entrancy
//!
//! `begin_cycle` while a cycle is in flight returns
//! [`VoxelizeError::CycleInProgress`]. `finish` force-completes the
//! in-flight cycle; `update` ticks it rather than starting another.

use web_time::Instant;

use super::presentation::{MeshSink, NullSink};
use super::rasterize::{run_raster_job, CycleBuffers, RasterOutput};
use super::types::{CycleId, CycleReport, CycleState};
use crate::assembler::CuboidAssembler;
use crate::config::{VoxelizeMode, VoxelizerConfig};
use crate::error::{VoxelizeError, VoxelizeResult};
use crate::metrics::VoxelizerMetrics;
use crate::snapshot::MeshSource;
use crate::threading::{TaskExecutor, TaskId};
use crate::types::OutputMesh;

/// Bookkeeping for the cycle whose raster job is running.
#[derive(Clone, Copy, Debug)]
struct InFlight {
  cycle_id: CycleId,
  task: TaskId,
  deferred: u32,
}

/// How `advance` may wait on the fence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FenceWait {
  /// Follow the configured execution contract.
  Configured,
  /// Block regardless of configuration.
  Force,
}

/// Mesh-to-voxel-shell orchestrator.
pub struct Voxelizer {
  config: VoxelizerConfig,
  executor: TaskExecutor,
  state: CycleState,

  /// `None` exactly while a raster job owns the buffers.
  buffers: Option<CycleBuffers>,
  in_flight: Option<InFlight>,
  cycle_counter: CycleId,

  assembler: CuboidAssembler,
  staging: OutputMesh,
  output: OutputMesh,
  last_report: Option<CycleReport>,

  sink: Box<dyn MeshSink>,
  metrics: VoxelizerMetrics,
  torn_down: bool,
}

impl Voxelizer {
  /// Create a voxelizer, validating `config` and building its worker pool.
  pub fn new(config: VoxelizerConfig) -> VoxelizeResult<Self> {
    let config = config.validated();
    let executor = TaskExecutor::new(config.worker_threads)?;
    Ok(Self::with_executor(config, executor))
  }

  /// Create a voxelizer that runs its raster jobs on `executor`.
  ///
  /// `worker_threads` in `config` is ignored.
  pub fn with_executor(config: VoxelizerConfig, executor: TaskExecutor) -> Self {
    let config = config.validated();
    let capacity = config.capacity_hint;

    Self {
      executor,
      state: CycleState::Idle,
      buffers: Some(CycleBuffers::with_capacity(capacity)),
      in_flight: None,
      cycle_counter: CycleId::new(),
      assembler: CuboidAssembler::with_capacity(capacity),
      staging: OutputMesh::with_cell_capacity(capacity),
      output: OutputMesh::with_cell_capacity(capacity),
      last_report: None,
      sink: Box::new(NullSink),
      metrics: VoxelizerMetrics::new(),
      torn_down: false,
      config,
    }
  }

  /// Builder form of [`set_sink`](Self::set_sink).
  pub fn with_sink(mut self, sink: impl MeshSink + 'static) -> Self {
    self.set_sink(sink);
    self
  }

  /// Replace the receiver notified on every completed cycle.
  pub fn set_sink(&mut self, sink: impl MeshSink + 'static) {
    self.sink = Box::new(sink);
  }

  // ===========================================================================
  // Cycle Control
  // ===========================================================================

  /// Capture `source` and dispatch the parallel phase.
  ///
  /// Legal from `Idle` and `Complete` (which is reset first). On a capture
  /// error nothing changes: state, buffers and the published output stay
  /// as they were.
  pub fn begin_cycle<S: MeshSource + ?Sized>(&mut self, source: &S) -> VoxelizeResult<CycleId> {
    self.ensure_alive()?;

    if self.state.is_in_flight() {
      tracing::warn!(state = ?self.state, "cycle start rejected, previous cycle not complete");
      return Err(VoxelizeError::CycleInProgress);
    }

    let mode = self.config.mode;
    let buffers = self.buffers.as_mut().ok_or(VoxelizeError::WorkerLost)?;
    if let Err(err) = buffers.snapshot.capture_for_mode(source, mode) {
      tracing::warn!(%err, "mesh capture failed, cycle not started");
      return Err(err);
    }

    if self.state == CycleState::Complete {
      self.transition(CycleState::Idle);
    }

    let Some(mut buffers) = self.buffers.take() else {
      return Err(VoxelizeError::WorkerLost);
    };
    buffers.store.clear();

    self.transition(CycleState::RasterizingParallel);

    let cycle_id = self.cycle_counter.advance();
    let config = self.config.clone();
    let task = self
      .executor
      .spawn(move || run_raster_job(buffers, &config));

    self.in_flight = Some(InFlight {
      cycle_id,
      task,
      deferred: 0,
    });
    self.transition(CycleState::AwaitingFence);

    tracing::debug!(cycle = cycle_id.0, "cycle dispatched");
    Ok(cycle_id)
  }

  /// Advance the in-flight cycle according to the execution contract.
  ///
  /// Returns the state after the call. Outside `AwaitingFence` this does
  /// nothing.
  pub fn tick(&mut self) -> VoxelizeResult<CycleState> {
    self.ensure_alive()?;
    self.advance(FenceWait::Configured)
  }

  /// Block until the in-flight cycle, if any, is complete.
  pub fn finish(&mut self) -> VoxelizeResult<CycleState> {
    self.ensure_alive()?;
    self.advance(FenceWait::Force)
  }

  /// Drive one caller cycle in the configured mode.
  ///
  /// - A cycle in flight is ticked, never restarted.
  /// - `Static`: the first call starts the only cycle; once `Complete`,
  ///   calls are no-ops until [`reset`](Self::reset).
  /// - `Rigid` / `Skinned`: every call after `Complete` starts a new cycle.
  pub fn update<S: MeshSource + ?Sized>(&mut self, source: &S) -> VoxelizeResult<CycleState> {
    self.ensure_alive()?;

    match self.state {
      CycleState::AwaitingFence => self.tick(),
      CycleState::Complete if self.config.mode == VoxelizeMode::Static => Ok(CycleState::Complete),
      CycleState::Idle | CycleState::Complete => {
        self.begin_cycle(source)?;
        self.tick()
      }
      state => Ok(state),
    }
  }

  /// Run a full cycle and return the published mesh.
  pub fn run_once<S: MeshSource + ?Sized>(&mut self, source: &S) -> VoxelizeResult<&OutputMesh> {
    self.begin_cycle(source)?;
    self.finish()?;
    Ok(&self.output)
  }

  /// Return from `Complete` to `Idle`, clearing the working buffers.
  ///
  /// Capacity is kept. The topology cached by `Rigid` mode is dropped, so
  /// the next cycle reads vertices, UVs and triangles from its source again.
  /// The published output stays readable until the next cycle replaces it.
  pub fn reset(&mut self) -> VoxelizeResult<CycleState> {
    self.ensure_alive()?;

    if self.state.is_in_flight() {
      return Err(VoxelizeError::CycleInProgress);
    }

    if let Some(buffers) = self.buffers.as_mut() {
      buffers.store.clear();
      buffers.snapshot.forget_topology();
    }
    self.staging.clear();

    if self.state == CycleState::Complete {
      self.transition(CycleState::Idle);
    }
    Ok(self.state)
  }

  /// Drain any in-flight cycle and release every buffer.
  ///
  /// All later calls return [`VoxelizeError::TornDown`]. Calling this twice
  /// is harmless.
  pub fn teardown(&mut self) {
    if self.torn_down {
      return;
    }

    if let Some(in_flight) = self.in_flight.take() {
      tracing::debug!(cycle = in_flight.cycle_id.0, "draining in-flight cycle");
      let _ = self.executor.wait::<RasterOutput>(in_flight.task);
      self.transition(CycleState::Idle);
    }

    self.buffers = None;
    self.assembler.release();
    self.staging.release();
    self.output.release();
    self.last_report = None;
    self.state = CycleState::Idle;
    self.torn_down = true;

    tracing::debug!("voxelizer torn down");
  }

  // ===========================================================================
  // Accessors
  // ===========================================================================

  pub fn state(&self) -> CycleState {
    self.state
  }

  /// Most recently completed mesh. Empty before the first completion.
  pub fn output(&self) -> &OutputMesh {
    &self.output
  }

  pub fn last_report(&self) -> Option<&CycleReport> {
    self.last_report.as_ref()
  }

  /// The validated configuration in use.
  pub fn config(&self) -> &VoxelizerConfig {
    &self.config
  }

  /// Rolling statistics; only populated with the `metrics` feature.
  pub fn metrics(&self) -> &VoxelizerMetrics {
    &self.metrics
  }

  pub fn is_torn_down(&self) -> bool {
    self.torn_down
  }

  // ===========================================================================
  // Internals
  // ===========================================================================

  fn ensure_alive(&self) -> VoxelizeResult<()> {
    if self.torn_down {
      Err(VoxelizeError::TornDown)
    } else {
      Ok(())
    }
  }

  fn transition(&mut self, next: CycleState) {
    debug_assert!(
      self.state.can_transition_to(next),
      "illegal cycle transition {:?} -> {:?}",
      self.state,
      next
    );
    tracing::trace!(from = ?self.state, to = ?next, "cycle state");
    self.state = next;
  }

  fn advance(&mut self, wait: FenceWait) -> VoxelizeResult<CycleState> {
    if self.state != CycleState::AwaitingFence {
      return Ok(self.state);
    }
    let Some(mut in_flight) = self.in_flight else {
      return self.recover_lost_job();
    };

    let task = in_flight.task;
    let mut forced = false;

    let output = match self.executor.poll::<RasterOutput>(task) {
      Some(output) => Some(output),
      None if wait == FenceWait::Force => {
        forced = true;
        self.executor.wait::<RasterOutput>(task)
      }
      None if self.config.spread_across_cycles && self.executor.is_pending(task) => {
        if in_flight.deferred < self.config.max_deferred_cycles {
          in_flight.deferred += 1;
          self.in_flight = Some(in_flight);
          tracing::trace!(deferred = in_flight.deferred, "parallel phase still running");
          return Ok(CycleState::AwaitingFence);
        }

        forced = true;
        tracing::debug!(
          deferred = in_flight.deferred,
          "deferral cap reached, blocking on parallel phase"
        );
        self.executor.wait::<RasterOutput>(task)
      }
      None => self.executor.wait::<RasterOutput>(task),
    };

    match output {
      Some(output) => {
        self.in_flight = None;
        self.complete_cycle(output, in_flight, forced);
        Ok(self.state)
      }
      None => self.recover_lost_job(),
    }
  }

  fn complete_cycle(&mut self, raster: RasterOutput, in_flight: InFlight, forced_wait: bool) {
    self.transition(CycleState::AssemblingSequential);

    let RasterOutput {
      buffers,
      stats,
      raster_us,
    } = raster;

    let span = tracing::info_span!("assemble", cycle = in_flight.cycle_id.0);
    let start = Instant::now();
    let cells = span.in_scope(|| {
      self
        .assembler
        .assemble(&buffers.store, self.config.voxel_size, &mut self.staging)
    });
    let assembly_us = start.elapsed().as_micros() as u64;

    // Publish
    std::mem::swap(&mut self.staging, &mut self.output);

    let report = CycleReport {
      cycle_id: in_flight.cycle_id,
      triangles: buffers.snapshot.triangle_count(),
      unique_cells: cells,
      lines: stats.lines,
      truncated_lines: stats.truncated_lines,
      degenerate_triangles: stats.degenerate_triangles,
      skipped_triangles: stats.skipped_triangles,
      capacity_exceeded: buffers.store.capacity_exceeded(),
      cycles_deferred: in_flight.deferred,
      forced_wait,
      raster_us,
      assembly_us,
    };

    self.buffers = Some(buffers);
    self.transition(CycleState::Complete);

    tracing::debug!(
      cycle = report.cycle_id.0,
      cells = report.unique_cells,
      raster_us = report.raster_us,
      assembly_us = report.assembly_us,
      "cycle complete"
    );

    self.metrics.record_cycle(&report);
    self.sink.on_mesh_ready(&self.output, &report);
    self.last_report = Some(report);
  }

  /// The raster job vanished with the buffers; start over from `Idle`.
  fn recover_lost_job(&mut self) -> VoxelizeResult<CycleState> {
    tracing::error!("raster job produced no result, cycle aborted");
    self.in_flight = None;
    self.buffers = Some(CycleBuffers::with_capacity(self.config.capacity_hint));
    self.transition(CycleState::Idle);
    Err(VoxelizeError::WorkerLost)
  }
}

impl Drop for Voxelizer {
  fn drop(&mut self) {
    self.teardown();
  }
}

impl std::fmt::Debug for Voxelizer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Voxelizer")
      .field("state", &self.state)
      .field("config", &self.config)
      .field("cells", &self.output.cell_count())
      .field("torn_down", &self.torn_down)
      .finish()
  }
}
