//! Cycle state, identifiers and reports.

// =============================================================================
// Cycle State Machine
// =============================================================================

/// Phase of the voxelization cycle.
///
/// ```text
///   ┌──────┐ begin_cycle ┌─────────────────────┐ dispatched ┌───────────────┐
///   │ Idle ├────────────►│ RasterizingParallel ├───────────►│ AwaitingFence │
///   └──▲───┘             └─────────────────────┘            └──────┬────────┘
///      │ reset / begin_cycle                                       │ job done
///   ┌──┴───────┐          ┌──────────────────────┐                 │
///   │ Complete │◄─────────┤ AssemblingSequential │◄────────────────┘
///   └──────────┘ assembled└──────────────────────┘
/// ```
///
/// `RasterizingParallel` and `AssemblingSequential` only exist while the
/// orchestrator is inside a call; callers observe `Idle`, `AwaitingFence`
/// and `Complete`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CycleState {
  #[default]
  Idle,
  RasterizingParallel,
  AwaitingFence,
  AssemblingSequential,
  Complete,
}

impl CycleState {
  /// Whether `self → next` is an edge of the state machine.
  ///
  /// `AwaitingFence → Idle` is the abort edge taken when a raster job is
  /// lost or drained during teardown.
  pub fn can_transition_to(self, next: CycleState) -> bool {
    use CycleState::*;
    matches!(
      (self, next),
      (Idle, RasterizingParallel)
        | (RasterizingParallel, AwaitingFence)
        | (AwaitingFence, AssemblingSequential)
        | (AwaitingFence, Idle)
        | (AssemblingSequential, Complete)
        | (Complete, Idle)
    )
  }

  /// A cycle has started and not yet reached `Complete`.
  pub fn is_in_flight(self) -> bool {
    matches!(
      self,
      CycleState::RasterizingParallel | CycleState::AwaitingFence | CycleState::AssemblingSequential
    )
  }
}

// =============================================================================
// Cycle Identity
// =============================================================================

/// Monotonic cycle counter, one per `begin_cycle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleId(pub u64);

impl CycleId {
  pub fn new() -> Self {
    Self(0)
  }

  /// Return the current id and advance the counter.
  pub fn advance(&mut self) -> CycleId {
    let current = *self;
    self.0 += 1;
    current
  }
}

// =============================================================================
// Cycle Report
// =============================================================================

/// Summary of one completed cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CycleReport {
  pub cycle_id: CycleId,
  /// Triangles in the snapshot.
  pub triangles: usize,
  /// Unique cells, and therefore cubes in the output.
  pub unique_cells: usize,
  /// Line traces performed.
  pub lines: usize,
  /// Line traces cut short by `max_trace_steps`.
  pub truncated_lines: usize,
  /// Zero-area triangles (still swept).
  pub degenerate_triangles: usize,
  /// Triangles with a non-finite corner (not swept).
  pub skipped_triangles: usize,
  /// The store grew past `capacity_hint`.
  pub capacity_exceeded: bool,
  /// Ticks that returned while the parallel phase was still running.
  pub cycles_deferred: u32,
  /// The fence ended in a blocking wait forced by the deferral cap or
  /// `finish()`.
  pub forced_wait: bool,
  /// Parallel phase wall time, microseconds.
  pub raster_us: u64,
  /// Sequential phase wall time, microseconds.
  pub assembly_us: u64,
}
