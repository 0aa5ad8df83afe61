//! An object pool for fixed-size payloads that amortizes backing allocations
//! across many acquisitions and grows on demand.
//!
//! This crate provides [`FixedPool`], an allocator for environments where
//! general-purpose dynamic allocation is unavailable, costly, or must be
//! tightly controlled - for example a low-level platform layer where every
//! backing allocation is an expensive, possibly syscall-backed operation.
//! The pool obtains whole arenas of equally-sized slots from a pluggable
//! [`BackingAllocator`] and hands them out one at a time, so one backing
//! call serves many acquisitions. Reserved capacity is never returned early:
//! arenas stay with the pool, banked if unused, until the pool is dropped.
//!
//! # Key Features
//!
//! - **Amortized backing allocation**: one arena-sized backing call serves
//!   many slot acquisitions
//! - **On-demand growth**: exhausted pools grow by a caller-chosen amount,
//!   while plain acquisitions are guaranteed never to allocate
//! - **Banked capacity**: arenas obtained by growth are drawn on only once
//!   existing capacity is exhausted, and are never lost
//! - **LIFO slot reuse**: released slots are handed out most-recent-first
//! - **Pluggable backing allocator**: [`SystemBacking`] by default, anything
//!   implementing [`BackingAllocator`] otherwise
//! - **Pluggable locking**: the same pool code runs single-threaded with
//!   no-op hooks ([`SingleThreaded`]) or shared across threads with a real
//!   mutex ([`ThreadSafe`]), selected at the type level
//! - **Safe handles**: acquisitions return a [`Lease`] that cannot be
//!   copied, cannot outlive the pool, and is consumed on release, so double
//!   release and use-after-release do not compile
//! - **Granularity helpers**: [`capacity_align_down`] and
//!   [`capacity_align_up`] size capacities so arena allocations are exact
//!   multiples of an external granule size
//!
//! # Examples
//!
//! Basic usage:
//!
//! ```
//! use std::num::NonZero;
//!
//! use fixed_pool::FixedPool;
//!
//! let pool = FixedPool::<String>::builder()
//!     .initial_capacity(NonZero::new(8).unwrap())
//!     .build()
//!     .unwrap();
//!
//! let mut lease = pool.acquire("Hello".to_string()).unwrap();
//! lease.push_str(", World!");
//! assert_eq!(&*lease, "Hello, World!");
//!
//! pool.release(lease);
//! assert!(pool.is_empty());
//! ```
//!
//! Growth on demand, with plain acquisitions guaranteed allocation-free:
//!
//! ```
//! use std::num::NonZero;
//!
//! use fixed_pool::{Error, FixedPool};
//!
//! let pool = FixedPool::<u64>::builder()
//!     .initial_capacity(NonZero::new(1).unwrap())
//!     .build()
//!     .unwrap();
//!
//! let first = pool.acquire(1).unwrap();
//!
//! // The pool is exhausted; a plain acquisition refuses rather than allocate.
//! assert!(matches!(pool.acquire(2), Err(Error::CapacityExhausted)));
//!
//! // An acquisition carrying a growth size obtains a new arena instead.
//! let second = pool.acquire_or_grow(2, NonZero::new(16).unwrap()).unwrap();
//! assert_eq!(pool.capacity(), 17);
//! # pool.release(first);
//! # pool.release(second);
//! ```
//!
//! Sharing a pool across threads by swapping the lock policy:
//!
//! ```
//! use std::num::NonZero;
//! use std::sync::Arc;
//! use std::thread;
//!
//! use fixed_pool::{FixedPool, ThreadSafe};
//!
//! let pool = Arc::new(
//!     FixedPool::<usize>::builder()
//!         .initial_capacity(NonZero::new(4).unwrap())
//!         .lock(ThreadSafe::new())
//!         .build()
//!         .unwrap(),
//! );
//!
//! let worker = {
//!     let pool = Arc::clone(&pool);
//!     thread::spawn(move || {
//!         let lease = pool.acquire(42).unwrap();
//!         pool.release(lease);
//!     })
//! };
//!
//! worker.join().unwrap();
//! assert!(pool.is_empty());
//! ```

mod arena;
mod backing;
mod builder;
mod coordinates;
mod drop_policy;
mod error;
mod granularity;
mod lease;
mod locking;
mod pool;

pub(crate) use arena::*;
pub use backing::*;
pub use builder::*;
pub(crate) use coordinates::*;
pub use drop_policy::*;
pub use error::*;
pub use granularity::*;
pub use lease::*;
pub use locking::*;
pub use pool::FixedPool;
