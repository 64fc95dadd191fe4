//! Events module for mission control traffic
//!
//! `ControlInput` is what flows into mission control from clicks, buttons
//! and the recognizer. `MissionEvent` is what flows out to observers.

use serde::{Deserialize, Serialize};

use crate::state::{Announcement, MissionSnapshot};

/// Inputs queued for mission control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlInput {
    /// Pointer click on the rocket
    Click,

    /// Reset button pressed
    Reset,

    /// Recognized speech, interim or final
    Heard {
        /// Raw recognizer text
        text: String,
        /// Only final transcripts are interpreted
        is_final: bool,
    },

    /// Start or stop listening for voice commands
    ToggleListening,

    /// The recognizer stopped on its own
    RecognizerEnded,
}

/// Events emitted by mission control to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MissionEvent {
    /// Something observers render has changed
    Updated(MissionSnapshot),

    /// A phrase was handed to the synthesizer
    Announced {
        announcement: Announcement,
        /// Spoken text
        text: String,
    },

    /// User-facing notice that is not spoken (e.g. voice unavailable)
    Notice { message: String },
}

impl MissionEvent {
    /// Build an `Announced` event from a phrase
    pub fn announced(announcement: Announcement) -> Self {
        MissionEvent::Announced {
            announcement,
            text: announcement.to_string(),
        }
    }
}

impl std::fmt::Display for MissionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissionEvent::Updated(snapshot) => write!(f, "UPDATED ({})", snapshot.state),
            MissionEvent::Announced { text, .. } => write!(f, "ANNOUNCED \"{}\"", text),
            MissionEvent::Notice { message } => write!(f, "NOTICE {}", message),
        }
    }
}
