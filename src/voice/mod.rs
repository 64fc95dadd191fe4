//! Voice module for speech input and output
//!
//! Mission control talks to speech engines only through the `Recognizer`
//! and `Synthesizer` traits, so tests can substitute scripted fakes.

mod error;
mod recognizer;
mod synthesizer;

pub use error::VoiceError;
pub use recognizer::{Recognizer, StdinRecognizer};
pub use synthesizer::{LogSynthesizer, ProcessSynthesizer, SpeechSettings, Synthesizer};
