//! Parallel rasterization phase.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │ Rasterization                                                           │
//! │                                                                         │
//! │  MeshSnapshot.triangles ──par_chunks(batch_size)──┐                     │
//! │                                                   ▼                     │
//! │   worker: TriangleSweep (reused per worker via map_init)                │
//! │     corners / voxel_size ──► sweep ──► VoxelStore::try_insert           │
//! │                                                   │                     │
//! │   SweepStats per batch ───────── reduce(merge) ───┘                     │
//! │                                                                         │
//! │  The parallel iterator returning is the fence: every insert has         │
//! │  happened before the buffers move back to the orchestrator.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rayon::prelude::*;
use web_time::Instant;

use crate::config::VoxelizerConfig;
use crate::raster::{SweepStats, TriangleSweep};
use crate::snapshot::MeshSnapshot;
use crate::store::VoxelStore;

/// Buffers owned by the orchestrator between cycles and moved into the
/// raster job while one is in flight.
#[derive(Debug)]
pub(crate) struct CycleBuffers {
  pub snapshot: MeshSnapshot,
  pub store: VoxelStore,
}

impl CycleBuffers {
  pub fn with_capacity(capacity_hint: usize) -> Self {
    Self {
      snapshot: MeshSnapshot::new(),
      store: VoxelStore::with_capacity(capacity_hint),
    }
  }
}

/// What a raster job hands back across the fence.
#[derive(Debug)]
pub(crate) struct RasterOutput {
  pub buffers: CycleBuffers,
  pub stats: SweepStats,
  pub raster_us: u64,
}

/// Sweep every triangle of `snapshot` into `store`.
///
/// Triangle indices double as the store's tie-break key.
#[cfg_attr(
  feature = "profiling",
  tracing::instrument(skip_all, fields(triangles = snapshot.triangle_count()))
)]
pub fn rasterize_snapshot(
  snapshot: &MeshSnapshot,
  store: &VoxelStore,
  config: &VoxelizerConfig,
) -> SweepStats {
  let inv_voxel_size = 1.0 / config.voxel_size;
  let batch_size = config.batch_size.max(1);
  let mode = config.raster_mode;
  let max_steps = config.max_trace_steps;

  snapshot
    .triangles()
    .par_chunks(batch_size)
    .enumerate()
    .map_init(TriangleSweep::new, |sweep, (batch, chunk)| {
      let first = batch * batch_size;
      let mut stats = SweepStats::default();

      for triangle in first..first + chunk.len() {
        let (corners, uvs) = snapshot.corners(triangle);
        let grid = corners.map(|c| c * inv_voxel_size);
        let key = u32::try_from(triangle).unwrap_or(u32::MAX);

        let swept = sweep.sweep(grid, uvs, mode, max_steps, |cell, uv| {
          store.try_insert(cell, uv, key);
        });
        stats = stats.merge(swept);
      }

      stats
    })
    .reduce(SweepStats::default, SweepStats::merge)
}

/// Job body: rasterize and return the buffers with timing.
pub(crate) fn run_raster_job(buffers: CycleBuffers, config: &VoxelizerConfig) -> RasterOutput {
  let span = tracing::info_span!("rasterize", triangles = buffers.snapshot.triangle_count());
  let _guard = span.enter();

  let start = Instant::now();
  let stats = rasterize_snapshot(&buffers.snapshot, &buffers.store, config);
  let raster_us = start.elapsed().as_micros() as u64;

  if stats.truncated_lines > 0 {
    tracing::warn!(
      truncated = stats.truncated_lines,
      max_trace_steps = config.max_trace_steps,
      "line traces hit the iteration cap and were truncated"
    );
  }
  if stats.skipped_triangles > 0 {
    tracing::warn!(
      skipped = stats.skipped_triangles,
      "triangles with non-finite positions were skipped"
    );
  }
  if stats.degenerate_triangles > 0 {
    tracing::debug!(degenerate = stats.degenerate_triangles, "zero-area triangles swept");
  }

  RasterOutput {
    buffers,
    stats,
    raster_us,
  }
}
