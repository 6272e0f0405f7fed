use crate::{AllocHandle, AllocTracker, Error};

/// A dense `width x height` buffer of samples in row-major order.
pub struct SimpleGrid<S> {
    width: usize,
    height: usize,
    buf: Vec<S>,
    _handle: Option<AllocHandle>,
}

impl<S: std::fmt::Debug> std::fmt::Debug for SimpleGrid<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleGrid")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl<S: Default + Clone> SimpleGrid<S> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            buf: vec![S::default(); width * height],
            _handle: None,
        }
    }

    pub fn with_alloc_tracker(
        width: usize,
        height: usize,
        tracker: Option<&AllocTracker>,
    ) -> Result<Self, Error> {
        let len = width.checked_mul(height).ok_or(Error::OutOfMemory(usize::MAX))?;
        let handle = tracker.map(|t| t.alloc::<S>(len)).transpose()?;
        Ok(Self {
            width,
            height,
            buf: vec![S::default(); len],
            _handle: handle,
        })
    }

    pub fn try_clone(&self) -> Result<Self, Error>
    where
        S: Clone,
    {
        Ok(Self {
            width: self.width,
            height: self.height,
            buf: self.buf.clone(),
            _handle: None,
        })
    }
}

impl<S> SimpleGrid<S> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn buf(&self) -> &[S] {
        &self.buf
    }

    pub fn buf_mut(&mut self) -> &mut [S] {
        &mut self.buf
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &S {
        &self.buf[y * self.width + x]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut S {
        &mut self.buf[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: S) {
        self.buf[y * self.width + x] = value;
    }

    pub fn row(&self, y: usize) -> &[S] {
        &self.buf[y * self.width..(y + 1) * self.width]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [S] {
        &mut self.buf[y * self.width..(y + 1) * self.width]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_grid_has_no_pixels() {
        let grid = SimpleGrid::<i32>::new(0, 0);
        assert_eq!(grid.buf().len(), 0);
    }

    #[test]
    fn get_set_roundtrip() {
        let mut grid = SimpleGrid::<i32>::new(3, 2);
        grid.set(2, 1, 42);
        assert_eq!(*grid.get(2, 1), 42);
        assert_eq!(*grid.get(0, 0), 0);
    }

    #[test]
    fn alloc_tracker_denies_oversized_allocation() {
        let tracker = AllocTracker::with_limit(16);
        let result = SimpleGrid::<i32>::with_alloc_tracker(100, 100, Some(&tracker));
        assert!(result.is_err());
    }

    #[test]
    fn alloc_tracker_releases_on_drop() {
        let tracker = AllocTracker::with_limit(64);
        {
            let _grid = SimpleGrid::<i32>::with_alloc_tracker(4, 4, Some(&tracker)).unwrap();
            assert!(SimpleGrid::<i32>::with_alloc_tracker(1, 1, Some(&tracker)).is_err());
        }
        assert!(SimpleGrid::<i32>::with_alloc_tracker(1, 1, Some(&tracker)).is_ok());
    }
}
