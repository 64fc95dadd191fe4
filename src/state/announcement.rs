//! Spoken announcements produced by mission transitions

use serde::{Deserialize, Serialize};

/// A phrase handed to the synthesizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Announcement {
    /// Voice launch accepted
    InitiatingLaunch,
    /// Click launch accepted
    LaunchInitiated,
    /// Countdown start, "T minus 10"
    TMinus(u8),
    /// Launch requested while counting down
    AlreadyInProgress,
    /// Launch requested after liftoff
    AlreadyLaunched,
    /// Bare numeral spoken during the final seconds
    Count(u8),
    /// Countdown reached zero
    Liftoff,
    /// Mission returned to the pad
    MissionReset,
    /// Status while idle
    ReadyReport,
    /// Status while counting down
    CountdownReport(u8),
    /// Status after liftoff
    OrbitReport,
    /// Utterance did not match any command
    NotRecognized,
}

impl std::fmt::Display for Announcement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Announcement::InitiatingLaunch => write!(f, "Initiating launch sequence"),
            Announcement::LaunchInitiated => write!(f, "Launch sequence initiated"),
            Announcement::TMinus(n) => write!(f, "T minus {}", n),
            Announcement::AlreadyInProgress => write!(f, "Launch sequence already in progress"),
            Announcement::AlreadyLaunched => write!(f, "Rocket has already been launched"),
            Announcement::Count(n) => write!(f, "{}", n),
            Announcement::Liftoff => write!(f, "Liftoff! We have liftoff!"),
            Announcement::MissionReset => write!(f, "Mission reset. Ready for launch"),
            Announcement::ReadyReport => {
                write!(f, "Rocket is ready for launch. Say launch to begin countdown")
            }
            Announcement::CountdownReport(r) => {
                write!(f, "Launch sequence in progress. T minus {} seconds", r)
            }
            Announcement::OrbitReport => write!(f, "Mission successful. Rocket is in orbit"),
            Announcement::NotRecognized => {
                write!(f, "Command not recognized. Try saying launch, reset, or status")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_text() {
        assert_eq!(Announcement::TMinus(10).to_string(), "T minus 10");
        assert_eq!(Announcement::Count(3).to_string(), "3");
        assert_eq!(
            Announcement::CountdownReport(7).to_string(),
            "Launch sequence in progress. T minus 7 seconds"
        );
    }

    #[test]
    fn test_announcement_serialization() {
        let json = serde_json::to_string(&Announcement::Count(4)).unwrap();
        assert!(json.contains("count"));
        assert!(json.contains('4'));
    }
}
