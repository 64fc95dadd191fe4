//! Voice error types

/// Errors that can occur in the voice collaborators
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("voice recognition not supported")]
    Unsupported,

    #[error("recognizer input is closed")]
    InputClosed,

    #[error("recognizer is already listening")]
    AlreadyListening,

    #[error("failed to spawn recognizer thread: {0}")]
    ThreadSpawn(String),

    #[error("failed to send transcript to mission control")]
    ChannelSend,

    #[error("failed to start speech program '{program}': {source}")]
    SpeechSpawn {
        program: String,
        source: std::io::Error,
    },
}
