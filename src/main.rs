//! launch-control: voice-driven rocket launch simulator daemon
//!
//! Provides:
//! - A substring command interpreter for spoken utterances
//! - An explicit mission state machine with a ten-second countdown
//! - Spoken progress announcements through a pluggable synthesizer
//! - IPC server for frontends that render the mission and forward clicks
//!
//! Voice input is read line-by-line from stdin when enabled; a line
//! starting with `~` is treated as an interim transcript.

mod command;
mod config;
mod countdown;
mod events;
mod ipc;
mod lifecycle;
mod state;
mod voice;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::countdown::CountdownScheduler;
use crate::events::{ControlInput, MissionEvent};
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::state::{MissionControl, COUNTDOWN_SECONDS};
use crate::voice::{LogSynthesizer, ProcessSynthesizer, Recognizer, StdinRecognizer, Synthesizer};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "launch-control starting"
    );

    // Load configuration
    let config = Config::load()?;
    info!(
        ?config.socket_path,
        ?config.data_dir,
        tick_ms = config.tick_interval.as_millis() as u64,
        voice = config.voice_enabled,
        "configuration loaded"
    );

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Create channels for inter-component communication
    // Recognizer / IPC -> mission control
    let (input_tx, input_rx) = mpsc::channel::<ControlInput>(32);
    // Countdown scheduler -> mission control
    let (tick_tx, tick_rx) = mpsc::channel(16);
    // Mission control -> IPC server and subscribers
    let (event_tx, _event_rx) = broadcast::channel::<MissionEvent>(64);

    let synthesizer = build_synthesizer(&config);

    let recognizer: Option<Box<dyn Recognizer>> = if config.voice_enabled {
        Some(Box::new(StdinRecognizer::new(input_tx.clone())))
    } else {
        warn!("voice control disabled");
        None
    };
    let voice_supported = recognizer.is_some();

    let scheduler = CountdownScheduler::new(config.tick_interval, COUNTDOWN_SECONDS, tick_tx);
    let mut mission_control =
        MissionControl::new(scheduler, synthesizer, recognizer, event_tx.clone());

    // Create IPC server
    let server = Server::new(&config.socket_path, input_tx.clone(), event_tx.clone())?;

    // Subscribe to mission events for IPC status updates
    let mut ipc_event_rx = event_tx.subscribe();
    let server_for_events = &server;

    // Start listening right away when voice is available
    if voice_supported {
        input_tx.send(ControlInput::ToggleListening).await?;
    }

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run mission control (processes inputs and ticks)
        _ = mission_control.run(input_rx, tick_rx) => {
            info!("mission control exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Handle mission events for IPC synchronization
        _ = async {
            loop {
                match ipc_event_rx.recv().await {
                    Ok(MissionEvent::Updated(snapshot)) => {
                        server_for_events.set_snapshot(snapshot).await;
                    }
                    Ok(MissionEvent::Notice { message }) => {
                        warn!(%message, "notice");
                    }
                    Ok(MissionEvent::Announced { .. }) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "mission event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("mission event handler exited");
        }

        // Wait for shutdown signal
        _ = async {
            if let Err(e) = shutdown.wait().await {
                error!(?e, "failed to install signal handlers");
                std::future::pending::<()>().await;
            }
        } => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    // The run loop was dropped mid-flight; release its timer and recognizer
    mission_control.shutdown();
    server.shutdown().await;

    info!(state = %mission_control.state(), "launch-control stopped");

    Ok(())
}

/// Pick the synthesizer named by the configuration
fn build_synthesizer(config: &Config) -> Box<dyn Synthesizer> {
    if let Some(command_line) = config.tts_command.as_deref() {
        if let Some(synth) = ProcessSynthesizer::new(command_line, config.speech) {
            info!(program = synth.program(), "using external speech program");
            return Box::new(synth);
        }
    }

    info!("announcements will be logged only");
    Box::new(LogSynthesizer::new(config.speech))
}
