//! Mission state and the pure transition function
//!
//! `apply` is total over every state/event pair. Side effects such as
//! speaking or starting the countdown timer are left to the caller.

use serde::{Deserialize, Serialize};

use crate::command::Intent;

use super::announcement::Announcement;

/// Seconds on the clock when a countdown starts
pub const COUNTDOWN_SECONDS: u8 = 10;

/// Highest remaining value that is spoken aloud on a tick
const SPOKEN_FROM: u8 = 4;

/// Launch progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", content = "remaining", rename_all = "snake_case")]
pub enum MissionState {
    /// Rocket on the pad
    #[default]
    Idle,
    /// Countdown running with this many seconds left
    CountingDown(u8),
    /// Rocket in orbit; only a reset leaves this state
    Launched,
}

impl MissionState {
    /// Check if a countdown is running
    pub fn is_counting_down(&self) -> bool {
        matches!(self, MissionState::CountingDown(_))
    }
}

impl std::fmt::Display for MissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissionState::Idle => write!(f, "Ready for Launch"),
            MissionState::CountingDown(r) => write!(f, "T-{}", r),
            MissionState::Launched => write!(f, "In Orbit"),
        }
    }
}

/// Anything that can move the mission forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// An interpreted voice command
    Command(Intent),
    /// Pointer click on the rocket
    Click,
    /// One second of countdown elapsed
    Tick,
}

/// Apply an event to a state, returning the next state and what to say
pub fn apply(state: MissionState, event: Trigger) -> (MissionState, Vec<Announcement>) {
    use MissionState::{CountingDown, Idle, Launched};
    use Trigger::{Click, Command, Tick};

    match (state, event) {
        (_, Command(Intent::Reset)) => (Idle, vec![Announcement::MissionReset]),
        (_, Command(Intent::Unknown)) => (state, vec![Announcement::NotRecognized]),

        (Idle, Command(Intent::Launch)) => (
            CountingDown(COUNTDOWN_SECONDS),
            vec![
                Announcement::InitiatingLaunch,
                Announcement::TMinus(COUNTDOWN_SECONDS),
            ],
        ),
        (CountingDown(_), Command(Intent::Launch)) => {
            (state, vec![Announcement::AlreadyInProgress])
        }
        (Launched, Command(Intent::Launch)) => (state, vec![Announcement::AlreadyLaunched]),

        (Idle, Command(Intent::Status)) => (state, vec![Announcement::ReadyReport]),
        (CountingDown(r), Command(Intent::Status)) => {
            (state, vec![Announcement::CountdownReport(r)])
        }
        (Launched, Command(Intent::Status)) => (state, vec![Announcement::OrbitReport]),

        (Idle, Click) => (
            CountingDown(COUNTDOWN_SECONDS),
            vec![
                Announcement::LaunchInitiated,
                Announcement::TMinus(COUNTDOWN_SECONDS),
            ],
        ),
        (CountingDown(_) | Launched, Click) => (state, Vec::new()),

        (CountingDown(r), Tick) if r <= 1 => (Launched, vec![Announcement::Liftoff]),
        (CountingDown(r), Tick) => {
            let remaining = r - 1;
            let spoken = if remaining <= SPOKEN_FROM {
                vec![Announcement::Count(remaining)]
            } else {
                Vec::new()
            };
            (CountingDown(remaining), spoken)
        }
        // No countdown to advance
        (Idle | Launched, Tick) => (state, Vec::new()),
    }
}
