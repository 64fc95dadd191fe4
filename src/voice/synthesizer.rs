//! Speech synthesizer capability and adapters
//!
//! Announcements are fire-and-forget: no adapter reports completion.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use super::error::VoiceError;

/// Voice parameters applied to every utterance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechSettings {
    /// Speaking rate, 1.0 is the engine's normal speed
    pub rate: f32,
    /// Pitch multiplier
    pub pitch: f32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            rate: 0.8,
            pitch: 1.0,
        }
    }
}

/// Speaks text aloud
pub trait Synthesizer: Send {
    /// Queue text for speaking without waiting for it to finish
    fn announce(&self, text: &str);
}

/// Synthesizer that only writes utterances to the log
#[derive(Debug, Clone, Default)]
pub struct LogSynthesizer {
    settings: SpeechSettings,
}

impl LogSynthesizer {
    pub fn new(settings: SpeechSettings) -> Self {
        Self { settings }
    }
}

impl Synthesizer for LogSynthesizer {
    fn announce(&self, text: &str) {
        info!(
            rate = self.settings.rate,
            pitch = self.settings.pitch,
            "speaking: {}",
            text
        );
    }
}

/// Normal speaking rate of `espeak` and `say`, in words per minute
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// Neutral `espeak` pitch on its 0-99 scale
const ESPEAK_BASE_PITCH: f32 = 50.0;

/// How a speech program expects rate and pitch on its command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpeechFlags {
    /// `espeak` / `espeak-ng`: `-s <wpm> -p <0-99>`
    Espeak,
    /// macOS `say`: `-r <wpm>`, no pitch control
    Say,
    /// speech-dispatcher `spd-say`: `-r <-100..100> -p <-100..100>`
    SpdSay,
    /// Unknown program, settings are not passed
    Unknown,
}

impl SpeechFlags {
    fn for_program(program: &str) -> Self {
        let name = Path::new(program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(program);

        match name {
            "espeak" | "espeak-ng" => SpeechFlags::Espeak,
            "say" => SpeechFlags::Say,
            "spd-say" => SpeechFlags::SpdSay,
            _ => SpeechFlags::Unknown,
        }
    }

    fn args(self, settings: SpeechSettings) -> Vec<String> {
        let wpm = (BASE_WORDS_PER_MINUTE * settings.rate).round().max(1.0) as u32;
        // spd-say centres both scales on 0
        let relative = |factor: f32| ((factor - 1.0) * 100.0).round().clamp(-100.0, 100.0) as i32;

        match self {
            SpeechFlags::Espeak => {
                let pitch = (ESPEAK_BASE_PITCH * settings.pitch).round().clamp(0.0, 99.0) as u32;
                vec![
                    "-s".to_string(),
                    wpm.to_string(),
                    "-p".to_string(),
                    pitch.to_string(),
                ]
            }
            SpeechFlags::Say => vec!["-r".to_string(), wpm.to_string()],
            SpeechFlags::SpdSay => vec![
                "-r".to_string(),
                relative(settings.rate).to_string(),
                "-p".to_string(),
                relative(settings.pitch).to_string(),
            ],
            SpeechFlags::Unknown => Vec::new(),
        }
    }
}

/// Synthesizer that runs an external text-to-speech program per utterance
///
/// The phrase is passed as the last argument, which suits `espeak`, `say`
/// and `spd-say`. Rate and pitch are translated into those programs' flags.
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct ProcessSynthesizer {
    program: String,
    args: Vec<String>,
    settings: SpeechSettings,
    flags: SpeechFlags,
}

impl ProcessSynthesizer {
    /// Create a synthesizer from a command line such as `espeak -v en`
    pub fn new(command_line: &str, settings: SpeechSettings) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        let flags = SpeechFlags::for_program(&program);

        if flags == SpeechFlags::Unknown {
            warn!(%program, "unknown speech program, rate and pitch will not be applied");
        }

        Some(Self {
            program,
            args: parts.collect(),
            settings,
            flags,
        })
    }

    /// Program name
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument list for one utterance
    fn command_args(&self, text: &str) -> Vec<String> {
        let mut args = self.args.clone();
        args.extend(self.flags.args(self.settings));
        args.push(text.to_string());
        args
    }

    fn spawn(&self, text: &str) -> Result<tokio::process::Child, VoiceError> {
        Command::new(&self.program)
            .args(self.command_args(text))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| VoiceError::SpeechSpawn {
                program: self.program.clone(),
                source,
            })
    }
}

impl Synthesizer for ProcessSynthesizer {
    fn announce(&self, text: &str) {
        debug!(
            program = %self.program,
            rate = self.settings.rate,
            pitch = self.settings.pitch,
            text,
            "speaking"
        );

        match self.spawn(text) {
            Ok(mut child) => {
                // Reap in the background so finished speakers don't linger
                tokio::spawn(async move {
                    if let Err(e) = child.wait().await {
                        warn!(?e, "speech program did not exit cleanly");
                    }
                });
            }
            Err(e) => warn!(?e, "announcement dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = SpeechSettings::default();
        assert_eq!(settings.rate, 0.8);
        assert_eq!(settings.pitch, 1.0);
    }

    #[test]
    fn test_process_synthesizer_parses_command_line() {
        let synth = ProcessSynthesizer::new("espeak -v en", SpeechSettings::default()).unwrap();
        assert_eq!(synth.program(), "espeak");
        assert_eq!(synth.args, vec!["-v", "en"]);
    }

    #[test]
    fn test_process_synthesizer_rejects_empty_command() {
        assert!(ProcessSynthesizer::new("   ", SpeechSettings::default()).is_none());
    }

    #[tokio::test]
    async fn test_missing_program_is_not_fatal() {
        let synth = ProcessSynthesizer::new(
            "definitely-not-a-speech-program-4f2a",
            SpeechSettings::default(),
        )
        .unwrap();
        synth.announce("T minus 10");
        assert!(matches!(
            synth.spawn("T minus 10"),
            Err(VoiceError::SpeechSpawn { .. })
        ));
    }

    #[test]
    fn test_espeak_receives_rate_and_pitch() {
        let settings = SpeechSettings {
            rate: 0.8,
            pitch: 1.0,
        };
        let synth = ProcessSynthesizer::new("espeak -v en", settings).unwrap();
        assert_eq!(
            synth.command_args("T minus 10"),
            vec!["-v", "en", "-s", "140", "-p", "50", "T minus 10"]
        );
    }

    #[test]
    fn test_say_receives_rate_only() {
        let synth = ProcessSynthesizer::new("/usr/bin/say", SpeechSettings::default()).unwrap();
        assert_eq!(synth.command_args("3"), vec!["-r", "140", "3"]);
    }

    #[test]
    fn test_spd_say_uses_relative_scale() {
        let settings = SpeechSettings {
            rate: 0.5,
            pitch: 2.0,
        };
        let synth = ProcessSynthesizer::new("spd-say", settings).unwrap();
        assert_eq!(
            synth.command_args("Liftoff"),
            vec!["-r", "-50", "-p", "100", "Liftoff"]
        );
    }

    #[test]
    fn test_espeak_pitch_is_clamped() {
        let settings = SpeechSettings {
            rate: 0.5,
            pitch: 2.0,
        };
        let args = SpeechFlags::Espeak.args(settings);
        assert_eq!(args, vec!["-s", "88", "-p", "99"]);
    }

    #[test]
    fn test_unknown_program_gets_no_speech_flags() {
        let synth = ProcessSynthesizer::new("my-tts --quiet", SpeechSettings::default()).unwrap();
        assert_eq!(synth.command_args("4"), vec!["--quiet", "4"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawned_program_sees_speech_flags() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("espeak");
        let out = dir.path().join("argv.txt");
        std::fs::write(
            &script,
            format!("#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\n", out.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let settings = SpeechSettings {
            rate: 0.5,
            pitch: 2.0,
        };
        let synth = ProcessSynthesizer::new(script.to_str().unwrap(), settings).unwrap();
        let status = synth.spawn("T minus 10").unwrap().wait().await.unwrap();
        assert!(status.success());

        let argv = std::fs::read_to_string(&out).unwrap();
        let argv: Vec<&str> = argv.lines().collect();
        assert_eq!(argv, vec!["-s", "88", "-p", "99", "T minus 10"]);
    }
}
