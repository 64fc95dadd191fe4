//! Countdown module for timed launch progress
//!
//! The scheduler emits one tick per interval while a countdown instance
//! is live. Mission control owns it and cancels it on liftoff or reset.

mod scheduler;

pub use scheduler::{CountdownScheduler, Tick};
