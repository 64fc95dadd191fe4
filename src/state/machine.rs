//! Mission control: the single owner of mission state
//!
//! Applies clicks, voice commands and countdown ticks one at a time,
//! keeps the countdown scheduler in step with the state, and hands
//! announcements to the synthesizer.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::command::{interpret, normalize, Intent};
use crate::countdown::{CountdownScheduler, Tick};
use crate::events::{ControlInput, MissionEvent};
use crate::voice::{Recognizer, Synthesizer, VoiceError};

use super::{apply, Announcement, MissionState, Trigger};

/// Everything the presentation layer renders
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionSnapshot {
    /// Current launch progress
    pub state: MissionState,
    /// Most recent transcript, interim or final
    pub transcript: String,
    /// Most recent final transcript
    pub last_command: String,
    /// Whether a recognizer is available
    pub voice_supported: bool,
    /// Whether the recognizer is listening
    pub listening: bool,
}

/// Owns mission state and drives its side effects
pub struct MissionControl {
    /// Current state
    state: MissionState,
    /// Last transcript heard
    transcript: String,
    /// Last final transcript
    last_command: String,
    /// Time when current non-Idle state was entered
    state_entered_at: Option<Instant>,
    scheduler: CountdownScheduler,
    synthesizer: Box<dyn Synthesizer>,
    recognizer: Option<Box<dyn Recognizer>>,
    /// Channel for emitting mission events
    event_tx: broadcast::Sender<MissionEvent>,
}

impl MissionControl {
    /// Create mission control in the Idle state
    ///
    /// Passing no recognizer means voice control is unsupported.
    pub fn new(
        scheduler: CountdownScheduler,
        synthesizer: Box<dyn Synthesizer>,
        recognizer: Option<Box<dyn Recognizer>>,
        event_tx: broadcast::Sender<MissionEvent>,
    ) -> Self {
        Self {
            state: MissionState::Idle,
            transcript: String::new(),
            last_command: String::new(),
            state_entered_at: None,
            scheduler,
            synthesizer,
            recognizer,
            event_tx,
        }
    }

    /// Get the current state
    pub fn state(&self) -> MissionState {
        self.state
    }

    /// Check whether voice control is available
    pub fn voice_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Check whether the recognizer is listening right now
    pub fn is_listening(&self) -> bool {
        self.recognizer
            .as_ref()
            .map_or(false, |recognizer| recognizer.is_listening())
    }

    /// Current view for observers
    pub fn snapshot(&self) -> MissionSnapshot {
        MissionSnapshot {
            state: self.state,
            transcript: self.transcript.clone(),
            last_command: self.last_command.clone(),
            voice_supported: self.voice_supported(),
            listening: self.is_listening(),
        }
    }

    /// Run mission control until the input channel closes
    ///
    /// Inputs and ticks share this one task, so each is applied to
    /// completion before the next is looked at.
    pub async fn run(
        &mut self,
        mut input_rx: mpsc::Receiver<ControlInput>,
        mut tick_rx: mpsc::Receiver<Tick>,
    ) {
        info!(voice_supported = self.voice_supported(), "mission control started in Idle state");
        self.publish();

        loop {
            tokio::select! {
                biased;

                input = input_rx.recv() => match input {
                    Some(input) => self.handle_input(input),
                    None => break,
                },
                Some(tick) = tick_rx.recv() => self.handle_tick(tick),
            }
        }

        self.shutdown();
    }

    /// Cancel any live countdown and stop listening
    ///
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.scheduler.is_running() {
            info!("abandoning countdown");
            self.scheduler.cancel();
        }
        if let Some(recognizer) = self.recognizer.as_mut() {
            if recognizer.is_listening() {
                recognizer.stop();
            }
        }

        info!("mission control stopped");
    }

    /// Handle one queued input
    pub fn handle_input(&mut self, input: ControlInput) {
        debug!(?input, "handling input");

        match input {
            ControlInput::Click => self.handle_click(),
            ControlInput::Reset => self.handle_reset(),
            ControlInput::Heard { text, is_final } => self.handle_transcript(&text, is_final),
            ControlInput::ToggleListening => self.toggle_listening(),
            ControlInput::RecognizerEnded => {
                info!(listening = self.is_listening(), "recognizer ended");
                self.publish();
            }
        }
    }

    /// Handle a countdown tick, dropping it unless it belongs to the live countdown
    pub fn handle_tick(&mut self, tick: Tick) {
        if !self.scheduler.is_current(tick.countdown) {
            debug!(countdown = %tick.countdown, "dropping stale tick");
            return;
        }
        self.dispatch(Trigger::Tick);
    }

    /// Click on the rocket; launches only from Idle
    pub fn handle_click(&mut self) {
        self.dispatch(Trigger::Click);
    }

    /// Reset button
    pub fn handle_reset(&mut self) {
        self.dispatch(Trigger::Command(Intent::Reset));
    }

    /// Handle recognized speech; only final transcripts are interpreted
    pub fn handle_transcript(&mut self, text: &str, is_final: bool) {
        let text = normalize(text);
        self.transcript = text.clone();

        if !is_final {
            debug!(transcript = %text, "interim transcript");
            self.publish();
            return;
        }

        let intent = interpret(&text);
        info!(%intent, command = %text, "voice command");
        self.last_command = text;
        self.dispatch(Trigger::Command(intent));
    }

    /// Start or stop the recognizer
    pub fn toggle_listening(&mut self) {
        let Some(recognizer) = self.recognizer.as_mut() else {
            warn!("voice control requested but no recognizer is available");
            self.notify(VoiceError::Unsupported.to_string());
            return;
        };

        if recognizer.is_listening() {
            recognizer.stop();
        } else {
            match recognizer.start() {
                Ok(()) | Err(VoiceError::AlreadyListening) => {}
                Err(e) => {
                    warn!(?e, "failed to start recognizer");
                    self.notify(e.to_string());
                }
            }
        }

        info!(listening = self.is_listening(), "listening toggled");
        self.publish();
    }

    /// Apply a trigger and carry out everything that follows from it
    fn dispatch(&mut self, trigger: Trigger) {
        let old_state = self.state;
        let (new_state, announcements) = apply(old_state, trigger);

        if trigger == Trigger::Command(Intent::Reset) {
            self.transcript.clear();
            self.last_command.clear();
        }

        // Must happen before the next input is taken off the queue
        self.sync_scheduler(old_state, new_state);

        if new_state != old_state {
            self.transition_to(new_state);
        }

        for announcement in announcements {
            self.speak(announcement);
        }

        self.publish();
    }

    /// Start the countdown on entering CountingDown, cancel it on leaving
    fn sync_scheduler(&mut self, old_state: MissionState, new_state: MissionState) {
        if !new_state.is_counting_down() {
            self.scheduler.cancel();
        } else if !old_state.is_counting_down() {
            if let Err(e) = self.scheduler.start() {
                warn!(?e, "countdown scheduler refused to start");
            }
        }
    }

    /// Perform a state transition
    fn transition_to(&mut self, new_state: MissionState) {
        let old_state = self.state;
        let duration_ms = self
            .state_entered_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        // Per-second countdown steps are routine
        if old_state.is_counting_down() && new_state.is_counting_down() {
            debug!(from = %old_state, to = %new_state, "countdown step");
        } else {
            info!(
                from = %old_state,
                to = %new_state,
                duration_ms = duration_ms,
                "state transition"
            );
            self.state_entered_at = if new_state != MissionState::Idle {
                Some(Instant::now())
            } else {
                None
            };
        }

        self.state = new_state;
    }

    /// Hand a phrase to the synthesizer and tell observers
    fn speak(&self, announcement: Announcement) {
        let event = MissionEvent::announced(announcement);
        self.synthesizer.announce(&announcement.to_string());

        debug!(%event, "emitting announcement");
        let _ = self.event_tx.send(event);
    }

    fn notify(&self, message: String) {
        let _ = self.event_tx.send(MissionEvent::Notice { message });
    }

    fn publish(&self) {
        let _ = self.event_tx.send(MissionEvent::Updated(self.snapshot()));
    }
}
