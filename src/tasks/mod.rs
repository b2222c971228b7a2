//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of a cache manager.
//!
//! # Tasks
//! - Expiry sweep: removes expired cache entries at configured intervals

mod sweep;

pub use sweep::spawn_sweep_task;
