//! Intent vocabulary and the substring interpreter
//!
//! Keyword families are checked in a fixed priority order, so an utterance
//! like "reset the launch" resolves to Launch.

use serde::{Deserialize, Serialize};

/// Phrases that start a launch
const LAUNCH_PHRASES: &[&str] = &["launch", "blast off", "take off"];
/// Phrases that reset the mission
const RESET_PHRASES: &[&str] = &["reset", "restart"];
/// Phrases that request a status report
const STATUS_PHRASES: &[&str] = &["status", "report"];

/// Command category derived from an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Begin the launch countdown
    Launch,
    /// Return the mission to the pad
    Reset,
    /// Ask for a spoken mission report
    Status,
    /// Nothing matched
    Unknown,
}

impl Intent {
    /// Stable lowercase label
    pub fn label(&self) -> &'static str {
        match self {
            Intent::Launch => "launch",
            Intent::Reset => "reset",
            Intent::Status => "status",
            Intent::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalize raw recognizer output for matching and display
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Interpret an utterance. First matching family wins.
pub fn interpret(text: &str) -> Intent {
    let text = normalize(text);
    let contains_any = |phrases: &[&str]| phrases.iter().any(|p| text.contains(p));

    if contains_any(LAUNCH_PHRASES) {
        Intent::Launch
    } else if contains_any(RESET_PHRASES) {
        Intent::Reset
    } else if contains_any(STATUS_PHRASES) {
        Intent::Status
    } else {
        Intent::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_phrases() {
        assert_eq!(interpret("let's launch now"), Intent::Launch);
        assert_eq!(interpret("Blast Off!"), Intent::Launch);
        assert_eq!(interpret("ready for take off"), Intent::Launch);
    }

    #[test]
    fn test_reset_phrases() {
        assert_eq!(interpret("please restart"), Intent::Reset);
        assert_eq!(interpret("RESET"), Intent::Reset);
    }

    #[test]
    fn test_status_phrases() {
        assert_eq!(interpret("give me a status report"), Intent::Status);
        assert_eq!(interpret("report in"), Intent::Status);
    }

    #[test]
    fn test_unknown() {
        assert_eq!(interpret("banana"), Intent::Unknown);
        assert_eq!(interpret(""), Intent::Unknown);
        assert_eq!(interpret("   "), Intent::Unknown);
    }

    #[test]
    fn test_priority_order() {
        // Launch outranks reset, reset outranks status
        assert_eq!(interpret("reset and launch"), Intent::Launch);
        assert_eq!(interpret("status after restart"), Intent::Reset);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Launch Now \n"), "launch now");
    }

    #[test]
    fn test_intent_serialization() {
        let json = serde_json::to_string(&Intent::Status).unwrap();
        assert_eq!(json, r#""status""#);
    }
}
