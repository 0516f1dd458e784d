//! Voxel deduplication store.
//!
//! A sharded concurrent map from [`GridCell`] to the UV retained for it.
//! Written concurrently by raster workers during the parallel phase, read
//! once by the assembler after the fence.
//!
//! # Retention Rule
//!
//! ```text
//!   triangle 7 reaches (3,1,0) first ──► stored { uv: a, triangle: 7 }
//!   triangle 2 reaches (3,1,0) later ──► 2 < 7, replaced { uv: b, triangle: 2 }
//!   triangle 9 reaches (3,1,0) later ──► 9 > 2, ignored
//!   triangle 2 reaches (3,1,0) again ──► same triangle, ignored
//! ```
//!
//! The lowest triangle index wins and, within one triangle, the first
//! emission wins. A triangle's emissions happen in a fixed order on a single
//! worker, so the retained UV does not depend on scheduling.
//!
//! # Capacity
//!
//! The map is pre-sized from `capacity_hint` and grows past it. The first
//! overflow in a cycle logs one warning and raises
//! [`capacity_exceeded`](VoxelStore::capacity_exceeded).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use glam::Vec2;

use crate::types::{GridCell, VoxelRecord};

/// Value half of a store entry.
#[derive(Clone, Copy, Debug, PartialEq)]
struct StoredVoxel {
  uv: Vec2,
  triangle: u32,
}

/// Concurrent insert-if-absent map of voxels for one cycle.
#[derive(Debug)]
pub struct VoxelStore {
  cells: DashMap<GridCell, StoredVoxel>,
  len: AtomicUsize,
  capacity_hint: usize,
  overflowed: AtomicBool,
}

impl VoxelStore {
  pub fn with_capacity(capacity_hint: usize) -> Self {
    Self {
      cells: DashMap::with_capacity(capacity_hint),
      len: AtomicUsize::new(0),
      capacity_hint,
      overflowed: AtomicBool::new(false),
    }
  }

  /// Record `uv` for `cell` on behalf of `triangle`.
  ///
  /// Insert-if-absent keyed on `cell`, with one exception: an already
  /// present cell is overwritten when `triangle` is strictly lower than the
  /// stored index, so the retained UV does not depend on insert order.
  ///
  /// Returns true only when `cell` was not yet present. A replacement still
  /// returns false, since the number of unique cells did not change.
  #[inline]
  pub fn try_insert(&self, cell: GridCell, uv: Vec2, triangle: u32) -> bool {
    match self.cells.entry(cell) {
      Entry::Vacant(vacant) => {
        vacant.insert(StoredVoxel { uv, triangle });
        let len = self.len.fetch_add(1, Ordering::Relaxed) + 1;
        if len > self.capacity_hint && !self.overflowed.swap(true, Ordering::Relaxed) {
          tracing::warn!(
            capacity_hint = self.capacity_hint,
            "voxel store grew past its capacity hint"
          );
        }
        true
      }
      Entry::Occupied(mut occupied) => {
        if triangle < occupied.get().triangle {
          occupied.insert(StoredVoxel { uv, triangle });
        }
        false
      }
    }
  }

  /// Number of unique cells.
  pub fn len(&self) -> usize {
    self.len.load(Ordering::Relaxed)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn capacity_hint(&self) -> usize {
    self.capacity_hint
  }

  /// More unique cells than `capacity_hint` were inserted this cycle.
  pub fn capacity_exceeded(&self) -> bool {
    self.overflowed.load(Ordering::Relaxed)
  }

  /// Retained UV of `cell`, if present.
  pub fn get(&self, cell: &GridCell) -> Option<Vec2> {
    self.cells.get(cell).map(|entry| entry.uv)
  }

  /// Contents as records, in unspecified order.
  ///
  /// Meant for after the parallel phase: concurrent inserts during
  /// iteration may or may not be observed.
  pub fn records(&self) -> impl Iterator<Item = VoxelRecord> + '_ {
    self.cells.iter().map(|entry| VoxelRecord {
      cell: *entry.key(),
      uv: entry.value().uv,
    })
  }

  /// Empty the store for the next cycle, keeping its allocation.
  pub fn clear(&mut self) {
    self.cells.clear();
    *self.len.get_mut() = 0;
    *self.overflowed.get_mut() = false;
  }

  /// Drop the backing allocation.
  pub fn release(&mut self) {
    self.cells = DashMap::new();
    *self.len.get_mut() = 0;
    *self.overflowed.get_mut() = false;
  }
}

impl Default for VoxelStore {
  fn default() -> Self {
    Self::with_capacity(crate::constants::DEFAULT_CAPACITY_HINT)
  }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
