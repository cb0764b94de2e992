//! Fibonacci heap for Rust
//!
//! This crate provides a mergeable min-priority queue with efficient
//! handle-based `decrease_key` support:
//!
//! - **insert**: O(1) amortized
//! - **find_min**: O(1)
//! - **merge**: O(1), a structural splice of the two root rings
//! - **extract_min**: O(log n) amortized (pays for the deferred cleanup)
//! - **decrease_key**: O(1) amortized (cut + cascading cuts)
//!
//! The heap is a forest of heap-ordered trees whose roots form a circular
//! doubly-linked ring with a minimum pointer. It is single-threaded by
//! design; callers needing shared access must serialize externally.
//!
//! # Example
//!
//! ```rust
//! use fibonacci_heap::FibonacciHeap;
//!
//! let mut heap = FibonacciHeap::new();
//! let handle = heap.insert(5);
//! heap.insert(3);
//! heap.decrease_key(&handle, 1).unwrap();
//! assert_eq!(heap.find_min(), Some(&1));
//! ```

mod error;
mod heap;
mod node;

pub use error::HeapError;
pub use heap::{FibonacciHeap, NodeHandle};
