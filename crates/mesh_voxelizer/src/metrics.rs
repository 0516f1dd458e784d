//! Voxelizer statistics collected per completed cycle.
//!
//! Feature-gated and runtime-toggled to ensure zero overhead when disabled.
//!
//! # Usage
//!
//! ```ignore
//! use mesh_voxelizer::metrics::COLLECT_METRICS;
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! // Read after a few cycles:
//! let avg = voxelizer.metrics().avg_raster_timing_us();
//! ```

use std::collections::VecDeque;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
use std::sync::atomic::AtomicBool;

use crate::pipeline::CycleReport;

/// Runtime toggle for metrics collection.
/// Set to false to disable metrics gathering at runtime.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
    #[cfg(feature = "metrics")]
    {
        COLLECT_METRICS.load(Ordering::Relaxed)
    }
    #[cfg(not(feature = "metrics"))]
    {
        false
    }
}

/// Rolling window for storing recent values (e.g., timing history).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    /// Create a new rolling window with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a new value, evicting the oldest if at capacity.
    pub fn push(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Iterate over values (oldest to newest).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    /// Get the most recent value.
    pub fn last(&self) -> Option<&T> {
        self.buffer.back()
    }
}

impl<T: Copy + Default + std::ops::Add<Output = T>> RollingWindow<T> {
    /// Compute the sum of all values.
    pub fn sum(&self) -> T {
        self.buffer.iter().copied().fold(T::default(), |acc, x| acc + x)
    }
}

impl RollingWindow<u64> {
    /// Compute the average of all values.
    pub fn average(&self) -> f64 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.sum() as f64 / self.buffer.len() as f64
        }
    }

    /// Get min and max values.
    pub fn min_max(&self) -> Option<(u64, u64)> {
        let min = self.buffer.iter().min()?;
        let max = self.buffer.iter().max()?;
        Some((*min, *max))
    }
}

impl Default for RollingWindow<u64> {
    fn default() -> Self {
        Self::new(128) // ~2 seconds of cycles at 60 per second
    }
}

/// Voxelizer statistics, updated once per completed cycle.
#[derive(Debug, Clone, Default)]
pub struct VoxelizerMetrics {
    // Timing
    /// Rolling window of parallel rasterization times in microseconds.
    pub raster_timings: RollingWindow<u64>,
    /// Rolling window of sequential assembly times in microseconds.
    pub assembly_timings: RollingWindow<u64>,

    // Output size
    /// Rolling window of unique cell counts.
    pub cell_counts: RollingWindow<u64>,

    // Cumulative counters
    /// Cycles that reached `Complete`.
    pub cycles_completed: u64,
    /// Line traces cut short by the iteration cap.
    pub truncated_lines: u64,
    /// Zero-area triangles seen.
    pub degenerate_triangles: u64,
    /// Triangles dropped for non-finite positions.
    pub skipped_triangles: u64,
    /// Cycles whose fence ended in a forced blocking wait.
    pub forced_waits: u64,
    /// Cycles whose store grew past its capacity hint.
    pub capacity_overflows: u64,
}

impl VoxelizerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all windows and counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fold one completed cycle into the statistics.
    pub fn record_cycle(&mut self, report: &CycleReport) {
        if !is_enabled() {
            return;
        }

        self.raster_timings.push(report.raster_us);
        self.assembly_timings.push(report.assembly_us);
        self.cell_counts.push(report.unique_cells as u64);

        self.cycles_completed += 1;
        self.truncated_lines += report.truncated_lines as u64;
        self.degenerate_triangles += report.degenerate_triangles as u64;
        self.skipped_triangles += report.skipped_triangles as u64;
        if report.forced_wait {
            self.forced_waits += 1;
        }
        if report.capacity_exceeded {
            self.capacity_overflows += 1;
        }
    }

    /// Get average rasterization timing in microseconds.
    pub fn avg_raster_timing_us(&self) -> f64 {
        self.raster_timings.average()
    }

    /// Get average assembly timing in microseconds.
    pub fn avg_assembly_timing_us(&self) -> f64 {
        self.assembly_timings.average()
    }

    /// Most recent unique cell count.
    pub fn last_cell_count(&self) -> Option<u64> {
        self.cell_counts.last().copied()
    }
}
