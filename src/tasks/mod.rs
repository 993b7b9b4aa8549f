//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a backend is live.
//!
//! # Tasks
//! - TTL Sweep: Removes expired memory-backend entries at configured intervals

mod sweep;

pub use sweep::{spawn_sweep_task, sweep_expired, EntryMap, SweepHandle};
