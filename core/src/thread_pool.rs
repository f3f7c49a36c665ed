//! Scoped thread pool for parallel CPU work.

/// A thread pool for parallel CPU-bound work such as texture decoding.
///
/// Uses `std::thread::scope` for scoped parallel execution: all tasks
/// spawned within a scope complete before the scope returns, so tasks can
/// borrow local data. Spawning is one OS thread per task; callers with many
/// small work items should chunk them by [`ThreadPool::num_threads`].
///
/// # Example
///
/// ```
/// use oleander_core::thread_pool::ThreadPool;
///
/// let pool = ThreadPool::new(4);
///
/// let mut results = vec![0u32; 4];
/// pool.scope(|s| {
///     for (i, slot) in results.iter_mut().enumerate() {
///         s.spawn(move || {
///             *slot = (i as u32) * 10;
///         });
///     }
/// });
/// assert_eq!(results, vec![0, 10, 20, 30]);
/// ```
pub struct ThreadPool {
    num_threads: usize,
}

impl ThreadPool {
    /// Creates a new thread pool with the given number of worker threads.
    pub fn new(num_threads: usize) -> Self {
        Self {
            num_threads: num_threads.max(1),
        }
    }

    /// Creates a thread pool sized to the number of available CPU cores.
    pub fn default_threads() -> Self {
        Self::new(std::thread::available_parallelism().map_or(1, |n| n.get()))
    }

    /// Number of worker threads this pool was sized for.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Executes tasks within a scoped context.
    ///
    /// All tasks spawned within the closure are guaranteed to complete
    /// before this method returns. Tasks can borrow local variables
    /// thanks to scoped lifetimes.
    pub fn scope<'env, F>(&self, f: F)
    where
        F: for<'scope> FnOnce(&Scope<'scope, 'env>),
    {
        std::thread::scope(|s| {
            let scope = Scope { inner: s };
            f(&scope);
        });
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::default_threads()
    }
}

/// A scope for spawning tasks that must complete before the scope exits.
///
/// All tasks spawned within a scope are guaranteed to complete before
/// [`ThreadPool::scope`] returns.
pub struct Scope<'scope, 'env: 'scope> {
    inner: &'scope std::thread::Scope<'scope, 'env>,
}

impl<'scope, 'env> Scope<'scope, 'env> {
    /// Spawns a task within this scope.
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'scope,
    {
        self.inner.spawn(f);
    }
}
