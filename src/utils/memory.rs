//! Buffer reuse for the capture pipeline's PNG encode path.
//!
//! Provides `PooledBuffer<T>` for reusing Vec allocations across encodes
//! instead of allocating a fresh buffer per screenshot, and a
//! `clear_caches()` function callers can use to release unused memory.

use std::cell::RefCell;

/// A thread-local pool of reusable `Vec<T>` buffers.
///
/// Instead of allocating new Vecs for temporary work, callers can acquire
/// a pre-allocated buffer from the pool and return it when done.
pub struct PooledBuffer<T> {
    pool: RefCell<Vec<Vec<T>>>,
    max_pool_size: usize,
}

impl<T> PooledBuffer<T> {
    /// Creates a new buffer pool that retains up to `max_pool_size` buffers.
    pub fn new(max_pool_size: usize) -> Self {
        Self {
            pool: RefCell::new(Vec::new()),
            max_pool_size,
        }
    }

    /// Acquires a buffer from the pool, or creates a new one if the pool is empty.
    /// The returned buffer is cleared (length 0) but retains its allocation.
    pub fn acquire(&self) -> Vec<T> {
        let mut pool = self.pool.borrow_mut();
        match pool.pop() {
            Some(mut buf) => {
                buf.clear();
                buf
            }
            None => Vec::new(),
        }
    }

    /// Returns a buffer to the pool for reuse.
    /// If the pool is full, the buffer is dropped.
    pub fn release(&self, buf: Vec<T>) {
        let mut pool = self.pool.borrow_mut();
        if pool.len() < self.max_pool_size {
            pool.push(buf);
        }
        // else: buffer is dropped, freeing memory
    }

    /// Returns the number of buffers currently in the pool.
    pub fn pool_size(&self) -> usize {
        self.pool.borrow().len()
    }

    /// Clears all pooled buffers, freeing their memory.
    pub fn clear(&self) {
        self.pool.borrow_mut().clear();
    }
}

impl<T> Default for PooledBuffer<T> {
    fn default() -> Self {
        Self::new(8)
    }
}

/// Releases unused memory across all caches.
///
/// This is a centralized function that managers can call periodically
/// (e.g., after large operations or when the system is idle) to free
/// memory that is no longer needed.
///
/// Currently a no-op placeholder; individual managers should call their
/// own `compact()` or `clear_caches()` methods as they are implemented.
pub fn clear_caches() {
    tracing::debug!("clear_caches: releasing unused memory");
    // Future: call into each manager's cache clearing method
}
