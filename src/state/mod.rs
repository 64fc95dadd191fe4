//! State module for mission management
//!
//! Provides the pure transition table over three states:
//! - Idle: rocket on the pad
//! - CountingDown: ten-second countdown running
//! - Launched: rocket in orbit until reset
//!
//! and `MissionControl`, the single owner that applies it.

mod announcement;
mod machine;
mod mission;

pub use announcement::Announcement;
pub use machine::{MissionControl, MissionSnapshot};
pub use mission::{apply, MissionState, Trigger, COUNTDOWN_SECONDS};
