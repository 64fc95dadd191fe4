//! Command module for spoken utterance interpretation
//!
//! Maps free-form recognized speech onto the small, closed intent
//! vocabulary understood by mission control.

mod intent;

pub use intent::{interpret, normalize, Intent};
