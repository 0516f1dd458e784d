//! Voxelizer configuration.

use crate::constants::{
  DEFAULT_BATCH_SIZE, DEFAULT_CAPACITY_HINT, DEFAULT_MAX_DEFERRED_CYCLES, DEFAULT_MAX_TRACE_STEPS,
};

/// How often the mesh is re-voxelized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VoxelizeMode {
  /// One cycle; the result is kept until `reset`.
  #[default]
  Static,

  /// Every cycle, against topology captured on the first cycle. Only the
  /// local-to-world transform is re-read.
  Rigid,

  /// Every cycle, re-reading all vertex data (deforming meshes).
  Skinned,
}

/// Line rasterization fidelity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RasterMode {
  /// Grid traversal, one cell boundary per step. Always gap-free.
  Exact,

  /// Fixed subdivision: `max(1, dominant_axis_delta * step_modifier)`
  /// samples per line. Cheaper; may leave gaps when `step_modifier` is low.
  Subdivided {
    /// Samples per grid unit along the dominant axis (≥ 1).
    step_modifier: u32,
  },
}

impl Default for RasterMode {
  fn default() -> Self {
    RasterMode::Exact
  }
}

/// Configuration for the voxelization pipeline.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VoxelizerConfig {
  /// Edge length of one voxel in world units.
  pub voxel_size: f32,

  /// Static, rigid or skinned operation.
  pub mode: VoxelizeMode,

  /// Line rasterization variant.
  pub raster_mode: RasterMode,

  /// Let the parallel phase run across several caller cycles.
  pub spread_across_cycles: bool,

  /// Cycles to poll before forcing a blocking wait (spread mode only).
  pub max_deferred_cycles: u32,

  /// Expected unique cell count; pre-sizes the store and output buffers.
  pub capacity_hint: usize,

  /// Triangles per parallel work unit.
  pub batch_size: usize,

  /// Iteration cap for one line trace.
  pub max_trace_steps: usize,

  /// Worker pool size. 0 uses rayon's global pool.
  pub worker_threads: usize,
}

impl Default for VoxelizerConfig {
  fn default() -> Self {
    Self {
      voxel_size: 1.0,
      mode: VoxelizeMode::default(),
      raster_mode: RasterMode::default(),
      spread_across_cycles: false,
      max_deferred_cycles: DEFAULT_MAX_DEFERRED_CYCLES,
      capacity_hint: DEFAULT_CAPACITY_HINT,
      batch_size: DEFAULT_BATCH_SIZE,
      max_trace_steps: DEFAULT_MAX_TRACE_STEPS,
      worker_threads: 0,
    }
  }
}

impl VoxelizerConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_voxel_size(mut self, size: f32) -> Self {
    self.voxel_size = size;
    self
  }

  pub fn with_mode(mut self, mode: VoxelizeMode) -> Self {
    self.mode = mode;
    self
  }

  pub fn with_raster_mode(mut self, raster_mode: RasterMode) -> Self {
    self.raster_mode = raster_mode;
    self
  }

  pub fn with_spread_across_cycles(mut self, spread: bool) -> Self {
    self.spread_across_cycles = spread;
    self
  }

  pub fn with_max_deferred_cycles(mut self, cycles: u32) -> Self {
    self.max_deferred_cycles = cycles;
    self
  }

  pub fn with_capacity_hint(mut self, cells: usize) -> Self {
    self.capacity_hint = cells;
    self
  }

  pub fn with_batch_size(mut self, triangles: usize) -> Self {
    self.batch_size = triangles;
    self
  }

  pub fn with_max_trace_steps(mut self, steps: usize) -> Self {
    self.max_trace_steps = steps;
    self
  }

  pub fn with_worker_threads(mut self, threads: usize) -> Self {
    self.worker_threads = threads;
    self
  }

  /// Copy with every out-of-range value replaced by a safe default.
  ///
  /// Each correction is logged as a warning; none of them are fatal.
  pub fn validated(&self) -> Self {
    let mut config = self.clone();

    if !(config.voxel_size.is_finite() && config.voxel_size > 0.0) {
      tracing::warn!(
        voxel_size = config.voxel_size,
        "voxel_size must be a positive finite number, using 1.0"
      );
      config.voxel_size = 1.0;
    }

    if let RasterMode::Subdivided { step_modifier: 0 } = config.raster_mode {
      tracing::warn!("step_modifier must be at least 1, using 1");
      config.raster_mode = RasterMode::Subdivided { step_modifier: 1 };
    }

    if config.batch_size == 0 {
      tracing::warn!("batch_size must be at least 1, using {}", DEFAULT_BATCH_SIZE);
      config.batch_size = DEFAULT_BATCH_SIZE;
    }

    if config.max_trace_steps == 0 {
      tracing::warn!(
        "max_trace_steps must be at least 1, using {}",
        DEFAULT_MAX_TRACE_STEPS
      );
      config.max_trace_steps = DEFAULT_MAX_TRACE_STEPS;
    }

    if config.max_deferred_cycles == 0 {
      tracing::warn!("max_deferred_cycles must be at least 1, using 1");
      config.max_deferred_cycles = 1;
    }

    config
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
