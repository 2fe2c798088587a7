//! Worker pool selection for build/update passes.
//!
//! Passes run either on rayon's global pool or on a pool owned by the field:
//!
//! ```ignore
//! let workers = WorkerPool::new(8)?;
//! let outcome = workers.install(|| builder.update(&mut tree, samples, &mut regions, &config));
//! ```
//!
//! Everything inside `install` (the fork-join descent, the parallel sort and
//! the statistics reduction) then runs on that pool's threads.

/// Global rayon pool or a dedicated one.
#[derive(Debug)]
pub struct WorkerPool {
  pool: Option<rayon::ThreadPool>,
}

impl WorkerPool {
  /// Pool with `num_threads` workers; 0 uses rayon's global pool.
  pub fn new(num_threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
    if num_threads == 0 {
      return Ok(Self::global());
    }
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(num_threads)
      .thread_name(|i| format!("guiding-field-{i}"))
      .build()?;
    Ok(Self { pool: Some(pool) })
  }

  /// Use rayon's global pool.
  pub fn global() -> Self {
    Self { pool: None }
  }

  /// True if this pool owns its threads.
  pub fn is_dedicated(&self) -> bool {
    self.pool.is_some()
  }

  /// Number of worker threads passes run on.
  pub fn num_threads(&self) -> usize {
    self
      .pool
      .as_ref()
      .map_or_else(rayon::current_num_threads, rayon::ThreadPool::current_num_threads)
  }

  /// Run `op` with this pool as the current rayon pool. Blocks until done.
  pub fn install<OP, R>(&self, op: OP) -> R
  where
    OP: FnOnce() -> R + Send,
    R: Send,
  {
    match &self.pool {
      Some(pool) => pool.install(op),
      None => op(),
    }
  }
}

impl Default for WorkerPool {
  fn default() -> Self {
    Self::global()
  }
}
