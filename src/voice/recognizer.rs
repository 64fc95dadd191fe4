//! Speech recognizer capability and a line-based adapter
//!
//! `StdinRecognizer` treats each line typed on stdin as a recognized
//! utterance. It runs on a dedicated thread because stdin reads block.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::events::ControlInput;

use super::error::VoiceError;

/// Prefix marking a line as an interim (not yet final) transcript
const INTERIM_PREFIX: char = '~';

/// Produces transcripts while listening
///
/// Implementations deliver `ControlInput::Heard` for every result and
/// `ControlInput::RecognizerEnded` when recognition stops by itself.
pub trait Recognizer: Send {
    /// Begin listening
    fn start(&mut self) -> Result<(), VoiceError>;

    /// Stop listening
    fn stop(&mut self);

    /// Check if the recognizer is listening
    fn is_listening(&self) -> bool;
}

/// Recognizer fed by lines of text, standard input by default
pub struct StdinRecognizer {
    input_tx: mpsc::Sender<ControlInput>,
    /// Line source, taken by the reader thread on first start
    input: Option<Box<dyn BufRead + Send>>,
    listening: Arc<AtomicBool>,
    /// Set once the reader thread has hit EOF or a read error
    exhausted: Arc<AtomicBool>,
}

impl StdinRecognizer {
    /// Create a new stdin recognizer
    pub fn new(input_tx: mpsc::Sender<ControlInput>) -> Self {
        Self::with_input(std::io::BufReader::new(std::io::stdin()), input_tx)
    }

    /// Create a recognizer reading from any line source
    pub fn with_input<R>(input: R, input_tx: mpsc::Sender<ControlInput>) -> Self
    where
        R: BufRead + Send + 'static,
    {
        Self {
            input_tx,
            input: Some(Box::new(input)),
            listening: Arc::new(AtomicBool::new(false)),
            exhausted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn the reader thread on first use
    ///
    /// Stdin cannot be interrupted, so the thread lives until EOF and the
    /// `listening` flag gates what it forwards.
    fn spawn_reader(&mut self) -> Result<(), VoiceError> {
        let Some(input) = self.input.take() else {
            return Ok(());
        };

        let input_tx = self.input_tx.clone();
        let listening = Arc::clone(&self.listening);
        let exhausted = Arc::clone(&self.exhausted);

        let spawned = thread::Builder::new()
            .name("stdin-recognizer".to_string())
            .spawn(move || {
                info!("recognizer thread started");
                let reached_end = read_lines(input, &input_tx, &listening);

                exhausted.store(true, Ordering::SeqCst);
                let was_listening = listening.swap(false, Ordering::SeqCst);
                if reached_end && was_listening {
                    let _ = input_tx.blocking_send(ControlInput::RecognizerEnded);
                }
                info!("recognizer thread stopped");
            });

        if let Err(e) = spawned {
            self.exhausted.store(true, Ordering::SeqCst);
            return Err(VoiceError::ThreadSpawn(e.to_string()));
        }
        Ok(())
    }
}

impl Recognizer for StdinRecognizer {
    fn start(&mut self) -> Result<(), VoiceError> {
        if self.exhausted.load(Ordering::SeqCst) {
            return Err(VoiceError::InputClosed);
        }
        if self.listening.load(Ordering::SeqCst) {
            return Err(VoiceError::AlreadyListening);
        }
        self.listening.store(true, Ordering::SeqCst);
        if let Err(e) = self.spawn_reader() {
            self.listening.store(false, Ordering::SeqCst);
            return Err(e);
        }
        info!("listening for voice commands on stdin");
        Ok(())
    }

    fn stop(&mut self) {
        self.listening.store(false, Ordering::SeqCst);
        info!("stopped listening");
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}

/// Parse one input line into a transcript
fn parse_line(line: &str) -> Option<ControlInput> {
    let line = line.trim();
    let (text, is_final) = match line.strip_prefix(INTERIM_PREFIX) {
        Some(rest) => (rest.trim(), false),
        None => (line, true),
    };

    if text.is_empty() {
        return None;
    }

    Some(ControlInput::Heard {
        text: text.to_string(),
        is_final,
    })
}

/// Forward lines while listening
///
/// Returns true when the input ran out, false when mission control went away.
fn read_lines<R: BufRead>(
    reader: R,
    input_tx: &mpsc::Sender<ControlInput>,
    listening: &AtomicBool,
) -> bool {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(?e, "failed to read recognizer input");
                return true;
            }
        };

        if !listening.load(Ordering::SeqCst) {
            debug!("not listening, dropping input line");
            continue;
        }

        if let Some(input) = parse_line(&line) {
            // We use blocking_send since this is a plain thread
            if input_tx.blocking_send(input).is_err() {
                warn!("{}", VoiceError::ChannelSend);
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_final_line() {
        assert_eq!(
            parse_line("  Launch now "),
            Some(ControlInput::Heard {
                text: "Launch now".into(),
                is_final: true
            })
        );
    }

    #[test]
    fn test_parse_interim_line() {
        assert_eq!(
            parse_line("~laun"),
            Some(ControlInput::Heard {
                text: "laun".into(),
                is_final: false
            })
        );
    }

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("~"), None);
    }

    #[test]
    fn test_read_lines_forwards_until_end() {
        let (tx, mut rx) = mpsc::channel(8);
        let listening = AtomicBool::new(true);
        let input = std::io::Cursor::new("~sta\nstatus\n\n");

        assert!(read_lines(input, &tx, &listening));

        assert!(matches!(rx.try_recv(), Ok(ControlInput::Heard { is_final: false, .. })));
        assert!(matches!(rx.try_recv(), Ok(ControlInput::Heard { is_final: true, .. })));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_read_lines_drops_when_not_listening() {
        let (tx, mut rx) = mpsc::channel(8);
        let listening = AtomicBool::new(false);

        read_lines(std::io::Cursor::new("launch\n"), &tx, &listening);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_read_lines_stops_when_receiver_closed() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let listening = AtomicBool::new(true);

        assert!(!read_lines(std::io::Cursor::new("launch\n"), &tx, &listening));
    }

    #[test]
    fn test_recognizer_creation() {
        let (tx, _rx) = mpsc::channel(8);
        let recognizer = StdinRecognizer::new(tx);
        assert!(!recognizer.is_listening());
    }

    #[test]
    fn test_restart_after_end_of_input_is_refused() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut recognizer = StdinRecognizer::with_input(std::io::Cursor::new("launch\n"), tx);

        recognizer.start().unwrap();
        assert_eq!(
            rx.blocking_recv(),
            Some(ControlInput::Heard {
                text: "launch".into(),
                is_final: true
            })
        );
        assert_eq!(rx.blocking_recv(), Some(ControlInput::RecognizerEnded));
        assert!(!recognizer.is_listening());

        assert!(matches!(recognizer.start(), Err(VoiceError::InputClosed)));
        assert!(!recognizer.is_listening());
    }

    #[test]
    fn test_start_twice_reports_already_listening() {
        let (tx, _rx) = mpsc::channel(8);
        let mut recognizer = StdinRecognizer::with_input(std::io::Cursor::new(""), tx);
        recognizer.listening.store(true, Ordering::SeqCst);

        assert!(matches!(recognizer.start(), Err(VoiceError::AlreadyListening)));
    }
}
