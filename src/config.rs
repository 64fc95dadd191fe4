//! Configuration loading and management

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::voice::SpeechSettings;

const SOCKET_VAR: &str = "LAUNCH_CONTROL_SOCKET";
const TICK_MS_VAR: &str = "LAUNCH_CONTROL_TICK_MS";
const VOICE_VAR: &str = "LAUNCH_CONTROL_VOICE";
const TTS_VAR: &str = "LAUNCH_CONTROL_TTS";
const RATE_VAR: &str = "LAUNCH_CONTROL_SPEECH_RATE";
const PITCH_VAR: &str = "LAUNCH_CONTROL_SPEECH_PITCH";

const DEFAULT_TICK_MS: u64 = 1000;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Time between countdown ticks
    pub tick_interval: Duration,

    /// Whether to listen for voice commands on stdin
    pub voice_enabled: bool,

    /// External text-to-speech command line, if any
    pub tts_command: Option<String>,

    /// Voice parameters for announcements
    pub speech: SpeechSettings,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = lookup("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("launch-control");

        let socket_path = lookup(SOCKET_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("control.sock"));

        let tick_ms: u64 = parse_var(&lookup, TICK_MS_VAR)?.unwrap_or(DEFAULT_TICK_MS);
        if tick_ms == 0 {
            bail!("{} must be greater than zero", TICK_MS_VAR);
        }

        let voice_enabled = match lookup(VOICE_VAR) {
            Some(value) => parse_flag(&value).with_context(|| format!("invalid {}", VOICE_VAR))?,
            None => true,
        };

        let tts_command = lookup(TTS_VAR).filter(|cmd| !cmd.trim().is_empty());

        let defaults = SpeechSettings::default();
        let speech = SpeechSettings {
            rate: parse_var(&lookup, RATE_VAR)?.unwrap_or(defaults.rate),
            pitch: parse_var(&lookup, PITCH_VAR)?.unwrap_or(defaults.pitch),
        };

        Ok(Self {
            socket_path,
            data_dir,
            tick_interval: Duration::from_millis(tick_ms),
            voice_enabled,
            tts_command,
            speech,
        })
    }
}

/// Parse an optional variable into `T`
fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid {}: {:?}", key, raw))
        })
        .transpose()
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load_with(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load_with(&[("HOME", "/home/test")]).unwrap();
        assert_eq!(
            config.socket_path,
            PathBuf::from("/home/test/.local/share/launch-control/control.sock")
        );
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert!(config.voice_enabled);
        assert!(config.tts_command.is_none());
        assert_eq!(config.speech, SpeechSettings::default());
    }

    #[test]
    fn test_config_overrides() {
        let config = load_with(&[
            ("HOME", "/home/test"),
            (SOCKET_VAR, "/tmp/launch.sock"),
            (TICK_MS_VAR, "250"),
            (VOICE_VAR, "off"),
            (TTS_VAR, "espeak -v en"),
            (RATE_VAR, "1.2"),
        ])
        .unwrap();
        assert_eq!(config.socket_path, PathBuf::from("/tmp/launch.sock"));
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert!(!config.voice_enabled);
        assert_eq!(config.tts_command.as_deref(), Some("espeak -v en"));
        assert_eq!(config.speech.rate, 1.2);
    }

    #[test]
    fn test_config_requires_home() {
        assert!(load_with(&[]).is_err());
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(load_with(&[("HOME", "/h"), (TICK_MS_VAR, "0")]).is_err());
        assert!(load_with(&[("HOME", "/h"), (TICK_MS_VAR, "soon")]).is_err());
        assert!(load_with(&[("HOME", "/h"), (VOICE_VAR, "maybe")]).is_err());
    }

    #[test]
    fn test_config_load() {
        if std::env::var("HOME").is_ok() {
            let config = Config::load().unwrap();
            assert!(config.data_dir.to_string_lossy().contains("launch-control"));
        }
    }
}
