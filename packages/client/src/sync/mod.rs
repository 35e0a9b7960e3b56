//! Synchronization primitives used by the transfer engine.

mod semaphore;

pub use semaphore::BoundedSemaphore;
