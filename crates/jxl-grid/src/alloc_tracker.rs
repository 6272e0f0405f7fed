use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Allocation tracker with a total memory budget.
///
/// Threaded through every buffer-allocating call so a pathological header
/// (absurd image or channel dimensions) fails with a resource error instead
/// of exhausting host memory.
#[derive(Debug, Clone)]
pub struct AllocTracker {
    inner: Arc<AllocTrackerInner>,
}

#[derive(Debug)]
struct AllocTrackerInner {
    bytes_left: AtomicUsize,
}

impl AllocTracker {
    pub fn with_limit(bytes_left: usize) -> Self {
        Self {
            inner: Arc::new(AllocTrackerInner {
                bytes_left: AtomicUsize::new(bytes_left),
            }),
        }
    }

    /// Records an allocation of `count` elements of `T`, returning a handle
    /// that releases the budget back on drop. Fails if the allocation would
    /// exceed the remaining budget.
    pub fn alloc<T>(&self, count: usize) -> Result<AllocHandle, crate::Error> {
        let bytes = count.saturating_mul(std::mem::size_of::<T>());
        let result = self.inner.bytes_left.fetch_update(
            Ordering::Relaxed,
            Ordering::Relaxed,
            |bytes_left| bytes_left.checked_sub(bytes),
        );

        match result {
            Ok(prev) => {
                tracing::trace!(bytes, left = prev - bytes, "allocation recorded");
                Ok(AllocHandle {
                    bytes,
                    inner: Arc::clone(&self.inner),
                })
            }
            Err(left) => {
                tracing::trace!(bytes, left, "allocation denied: budget exceeded");
                Err(crate::Error::OutOfMemory(bytes))
            }
        }
    }
}

#[derive(Debug)]
pub struct AllocHandle {
    bytes: usize,
    inner: Arc<AllocTrackerInner>,
}

impl Drop for AllocHandle {
    fn drop(&mut self) {
        let bytes = self.bytes;
        self.inner.bytes_left.fetch_add(bytes, Ordering::Relaxed);
        self.bytes = 0;
    }
}
