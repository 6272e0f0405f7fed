mod alloc_tracker;
mod simple_grid;

pub use alloc_tracker::{AllocHandle, AllocTracker};
pub use simple_grid::SimpleGrid;

#[derive(Debug)]
pub enum Error {
    OutOfMemory(usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfMemory(bytes) => write!(f, "failed to allocate {bytes} byte(s)"),
        }
    }
}

impl std::error::Error for Error {}
