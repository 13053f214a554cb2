use bitflags::bitflags;
use serde::Deserialize;
use serde_json::Value;

use crate::EngineClientId;

use super::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    Ok,
    TalkState,
    SoundState,
    OtherTalkState,
    MovedChannel,
    WrongTsServer,
    OutdatedVersion,
    MaxPlayerCountReached,
    LicenseServerTimedOut,
    MoveError,
    WaitGameInit,
    Heartbeat,
    MuteState,
    Unknown(String),
}

impl ResponseCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "OK" => Self::Ok,
            "TALK_STATE" => Self::TalkState,
            "SOUND_STATE" => Self::SoundState,
            "OTHER_TALK_STATE" => Self::OtherTalkState,
            "MOVED_CHANNEL" => Self::MovedChannel,
            "WRONG_TS_SERVER" => Self::WrongTsServer,
            "OUTDATED_VERSION" => Self::OutdatedVersion,
            "MAX_PLAYER_COUNT_REACHED" => Self::MaxPlayerCountReached,
            "LICENSE_SERVER_TIMED_OUT" => Self::LicenseServerTimedOut,
            "MOVE_ERROR" => Self::MoveError,
            "WAIT_GAME_INIT" => Self::WaitGameInit,
            "HEARTBEAT" => Self::Heartbeat,
            "MUTE_STATE" => Self::MuteState,
            other => Self::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineResponse {
    pub code: String,
    #[serde(rename = "requestType", default)]
    pub request_type: String,
    #[serde(default)]
    message: Value,
}

impl EngineResponse {
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(raw).map_err(ProtocolError::Decode)
    }

    pub fn code(&self) -> ResponseCode {
        ResponseCode::parse(&self.code)
    }

    pub fn is_join(&self) -> bool {
        self.request_type == "JOIN"
    }

    /// Message payload as text. Non-string payloads are rendered as JSON.
    pub fn message(&self) -> String {
        match &self.message {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn engine_client_id(&self) -> Result<EngineClientId, ProtocolError> {
        let message = self.message();
        message
            .trim()
            .parse()
            .map_err(|_| ProtocolError::InvalidClientId(message))
    }

    pub fn is_talking_flag(&self) -> bool {
        self.message().trim() == "1"
    }

    pub fn sound_state(&self) -> Result<SoundState, ProtocolError> {
        let raw: RawSoundState = self.sub_payload()?;
        Ok(raw.into())
    }

    pub fn other_talk_state(&self) -> Result<OtherTalkState, ProtocolError> {
        self.sub_payload()
    }

    pub fn moved_channel(&self) -> Option<ChannelKind> {
        match self.message().as_str() {
            "INGAME_CHANNEL" => Some(ChannelKind::Ingame),
            "EXCLUDED_CHANNEL" => Some(ChannelKind::Excluded),
            _ => None,
        }
    }

    fn sub_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, ProtocolError> {
        match &self.message {
            Value::String(s) => serde_json::from_str(s).map_err(ProtocolError::Payload),
            other => serde_json::from_value(other.clone()).map_err(ProtocolError::Payload),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Ingame,
    Excluded,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SoundState: u8 {
        const MICROPHONE_MUTED = 1 << 0;
        const MICROPHONE_DISABLED = 1 << 1;
        const SOUND_MUTED = 1 << 2;
        const SOUND_DISABLED = 1 << 3;
    }
}

impl SoundState {
    pub fn microphone_off(&self) -> bool {
        self.intersects(Self::MICROPHONE_MUTED | Self::MICROPHONE_DISABLED)
    }

    /// Sub-states that differ from `previous`, with their new value.
    pub fn changes_since(&self, previous: SoundState) -> Vec<(SoundState, bool)> {
        let changed = *self ^ previous;
        changed
            .iter()
            .map(|flag| (flag, self.contains(flag)))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSoundState {
    #[serde(default)]
    microphone_muted: bool,
    #[serde(default)]
    microphone_disabled: bool,
    #[serde(default)]
    sound_muted: bool,
    #[serde(default)]
    sound_disabled: bool,
}

impl From<RawSoundState> for SoundState {
    fn from(raw: RawSoundState) -> Self {
        let mut state = SoundState::empty();
        state.set(SoundState::MICROPHONE_MUTED, raw.microphone_muted);
        state.set(SoundState::MICROPHONE_DISABLED, raw.microphone_disabled);
        state.set(SoundState::SOUND_MUTED, raw.sound_muted);
        state.set(SoundState::SOUND_DISABLED, raw.sound_disabled);
        state
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherTalkState {
    pub client_id: EngineClientId,
    pub is_talking: bool,
}
