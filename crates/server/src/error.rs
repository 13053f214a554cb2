use yaca::{EventError, FrequencyError, PlayerId};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    #[error("player {0} already joined")]
    AlreadyJoined(PlayerId),
    #[error("player {0} has no voice engine session yet")]
    NotReady(PlayerId),
    #[error("no free voice name after {0} attempts")]
    NamesExhausted(u32),
    #[error("invalid radio channel {0}")]
    InvalidChannel(u8),
    #[error(transparent)]
    Frequency(#[from] FrequencyError),
    #[error(transparent)]
    Event(#[from] EventError),
    #[error("frequency {0} is secured")]
    AccessDenied(String),
    #[error("radio is disabled")]
    RadioDisabled,
    #[error("radio channel {0} is not tuned")]
    NotTuned(u8),
    #[error("not transmitting on radio channel {0}")]
    NotTalking(u8),
    #[error("already tuned to {0} on another channel")]
    AlreadyTuned(String),
    #[error("voice range {0} is not allowed")]
    InvalidVoiceRange(f32),
    #[error("players {0} and {1} are not in a call")]
    NotInCall(PlayerId, PlayerId),
    #[error("player {0} has no active call")]
    NoCall(PlayerId),
    #[error("a player cannot call themselves")]
    SelfCall,
    #[error("phone speaker is off")]
    SpeakerOff,
    #[error("megaphone not allowed")]
    MegaphoneDenied,
    #[error("nothing to change")]
    Unchanged,
}
