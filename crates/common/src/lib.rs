pub mod config;
pub mod event;
pub mod geometry;
pub mod protocol;
pub mod radio;
pub mod state;
pub mod voice_range;

/// Game-session participant id, assigned by the game server.
pub type PlayerId = u32;
/// Client id assigned by the external voice engine.
pub type EngineClientId = u32;

pub use config::{
    BuildType, HearNearbyMode, MegaphoneConfig, MufflingConfig, MufflingIntensities, NameConfig,
    PhoneConfig, Platform, RadioConfig, TeamspeakConfig, TimingConfig, VoiceConfig,
    VoiceRangeConfig,
};
pub use event::{ClientEvent, EventError, RosterEntry, ServerEvent};
pub use geometry::{DoorState, RoofState, SeatInfo, VehicleHandle, VehicleInfo};
pub use protocol::{
    ChannelKind, CommDevice, CommDeviceLeft, CommDeviceMode, CommDeviceSettings, CommDeviceType,
    EngineFrame, EngineResponse, InitFrame, PlayerEntry, PlayerFrame, ProtocolError,
    ResponseCode, SoundState, StereoMode,
};
pub use radio::{FrequencyError, FrequencyRange, RadioReach, UNSET_FREQUENCY};
pub use state::{ReplicatedState, StateBag, StateChange, StateField, StateOwner, StateValue};
pub use voice_range::{RangeStep, VoiceRangeCursor};
