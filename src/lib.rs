//! Tandem - Bounded Lock-Free SPSC Circular Queue
//!
//! Arsitektur:
//! - Lock-Free: hanya dua cursor atomic dengan pasangan Acquire/Release
//! - No-Allocation: slot disimpan inline, tidak ada heap setelah `new()`
//! - Fixed Capacity: `N` slot, `N - 1` elemen yang bisa dipakai
//!
//! Satu producer memanggil `enqueue`, satu consumer memanggil `dequeue`.
//! Cara paling aman memakai queue dari dua thread adalah lewat
//! [`CircularQueue::split`]:
//!
//! ```
//! use tandem::CircularQueue;
//!
//! let mut queue: CircularQueue<u64, 16> = CircularQueue::new();
//! let (mut producer, mut consumer) = queue.split();
//!
//! std::thread::scope(|s| {
//!     s.spawn(move || {
//!         for i in 0..100u64 {
//!             while !producer.enqueue(&i) {
//!                 std::hint::spin_loop();
//!             }
//!         }
//!     });
//!
//!     let mut value = 0u64;
//!     for expected in 0..100u64 {
//!         while !consumer.dequeue(&mut value) {
//!             std::hint::spin_loop();
//!         }
//!         assert_eq!(value, expected);
//!     }
//! });
//! ```

pub mod core;

pub use crate::core::{CircularQueue, Consumer, Full, Producer, TryIter};
