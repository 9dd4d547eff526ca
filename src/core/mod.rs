//! Core module: Lock-Free SPSC Circular Queue
//!
//! Prinsip desain:
//! - Lock-Free: Hanya atomic operations, tidak ada Mutex/RwLock
//! - No-Allocation: Semua slot inline di dalam struct queue
//! - Single Writer per Cursor: producer hanya menulis `write`, consumer hanya menulis `read`

mod handle;
mod queue;
mod slot;

pub use handle::{Consumer, Producer, TryIter};
pub use queue::{CircularQueue, Full};
