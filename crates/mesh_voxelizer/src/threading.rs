//! Worker pool executor with pollable completion handles.
//!
//! Jobs run on a rayon pool: either a dedicated fixed-size pool or rayon's
//! global one. Parallel iterators started inside a job stay on the pool that
//! runs it.
//!
//! # Usage
//!
//! ```ignore
//! let executor = TaskExecutor::new(4)?;
//!
//! // Queue work (non-blocking)
//! let task_id = executor.spawn(move || expensive_computation());
//!
//! // Poll for results each cycle...
//! if let Some(result) = executor.poll::<MyResult>(task_id) {
//!     // Use result
//! }
//!
//! // ...or block until the job is done
//! let result = executor.wait::<MyResult>(task_id);
//! ```

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::VoxelizeResult;

/// Unique identifier for a spawned task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
  fn next() -> Self {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    Self(COUNTER.fetch_add(1, Ordering::Relaxed))
  }
}

/// Type-erased result container.
struct TaskResult {
  data: Box<dyn Any + Send>,
}

#[derive(Default)]
struct TaskTable {
  /// Completed results waiting to be collected.
  results: HashMap<TaskId, TaskResult>,
  /// Queued or running tasks.
  pending: HashSet<TaskId>,
}

#[derive(Default)]
struct Shared {
  table: Mutex<TaskTable>,
  finished: Condvar,
}

/// Rayon-backed task executor.
///
/// A task that panics is dropped from the pending set without a result;
/// `poll` and `wait` then return `None`.
#[derive(Clone)]
pub struct TaskExecutor {
  shared: Arc<Shared>,
  pool: Option<Arc<rayon::ThreadPool>>,
}

impl TaskExecutor {
  /// Create an executor with a dedicated pool of `num_threads` workers.
  ///
  /// `0` uses rayon's global pool.
  pub fn new(num_threads: usize) -> VoxelizeResult<Self> {
    let pool = if num_threads == 0 {
      None
    } else {
      let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("voxelizer-worker-{}", i))
        .build()?;
      Some(Arc::new(pool))
    };

    Ok(Self {
      shared: Arc::new(Shared::default()),
      pool,
    })
  }

  /// Create an executor on rayon's global pool.
  pub fn default_threads() -> Self {
    Self {
      shared: Arc::new(Shared::default()),
      pool: None,
    }
  }

  /// Spawn a task on the pool (non-blocking).
  ///
  /// Returns a TaskId that can be used to poll or wait for the result.
  pub fn spawn<F, T>(&self, work: F) -> TaskId
  where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
  {
    let task_id = TaskId::next();
    self.shared.table.lock().pending.insert(task_id);

    let shared = Arc::clone(&self.shared);
    let job = move || {
      let outcome = panic::catch_unwind(AssertUnwindSafe(work));

      let mut table = shared.table.lock();
      match outcome {
        Ok(result) => {
          table.results.insert(
            task_id,
            TaskResult {
              data: Box::new(result),
            },
          );
        }
        Err(_) => {
          tracing::error!(?task_id, "task panicked, result discarded");
        }
      }
      table.pending.remove(&task_id);
      drop(table);

      shared.finished.notify_all();
    };

    match &self.pool {
      Some(pool) => pool.spawn(job),
      None => rayon::spawn(job),
    }

    task_id
  }

  /// Poll for a task's result (non-blocking).
  ///
  /// Returns `Some(result)` if the task completed, `None` if still running.
  /// Returns `None` if the task ID is invalid or already consumed.
  pub fn poll<T: 'static>(&self, task_id: TaskId) -> Option<T> {
    let mut table = self.shared.table.lock();
    take_result(&mut table, task_id)
  }

  /// Block until a task finishes and take its result.
  ///
  /// Returns `None` if the task ID is unknown, already consumed, or the
  /// task panicked.
  pub fn wait<T: 'static>(&self, task_id: TaskId) -> Option<T> {
    let mut table = self.shared.table.lock();
    loop {
      if table.results.contains_key(&task_id) {
        return take_result(&mut table, task_id);
      }
      if !table.pending.contains(&task_id) {
        return None;
      }
      self.shared.finished.wait(&mut table);
    }
  }

  /// Check if a task is still pending.
  pub fn is_pending(&self, task_id: TaskId) -> bool {
    self.shared.table.lock().pending.contains(&task_id)
  }

  /// Get the number of worker threads backing this executor.
  pub fn num_threads(&self) -> usize {
    match &self.pool {
      Some(pool) => pool.current_num_threads(),
      None => rayon::current_num_threads(),
    }
  }

  /// Get the number of tasks currently queued or running.
  pub fn pending_count(&self) -> usize {
    self.shared.table.lock().pending.len()
  }
}

impl Default for TaskExecutor {
  fn default() -> Self {
    Self::default_threads()
  }
}

fn take_result<T: 'static>(table: &mut TaskTable, task_id: TaskId) -> Option<T> {
  table
    .results
    .remove(&task_id)
    .and_then(|result| result.data.downcast::<T>().ok())
    .map(|b| *b)
}

// =============================================================================
// Tests
// =============================================================================
