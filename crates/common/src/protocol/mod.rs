mod device;
mod inbound;
mod outbound;

pub use device::{CommDeviceMode, CommDeviceType, StereoMode};
pub use inbound::{ChannelKind, EngineResponse, OtherTalkState, ResponseCode, SoundState};
pub use outbound::{
    CommDevice, CommDeviceLeft, CommDeviceSettings, DeviceMember, EngineFrame, IngameUpdate,
    InitFrame, JsonVec3, PlayerEntry, PlayerFrame,
};

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("failed to encode engine frame: {0}")]
    Encode(serde_json::Error),
    #[error("malformed engine response: {0}")]
    Decode(serde_json::Error),
    #[error("malformed response payload: {0}")]
    Payload(serde_json::Error),
    #[error("invalid engine client id {0:?}")]
    InvalidClientId(String),
}
