use rkyv::{Archive, Deserialize, Serialize};

use crate::state::{StateOwner, StateValue};
use crate::{EngineClientId, PlayerId};

/// Intents a client sends to the server. The server validates every one of
/// them before anything takes effect.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ClientEvent {
    EngineReady {
        engine_client_id: EngineClientId,
    },
    ChangeVoiceRange {
        range: f32,
    },
    TalkState {
        talking: bool,
    },
    EnableRadio {
        enabled: bool,
    },
    ChangeRadioFrequency {
        channel: u8,
        frequency: String,
    },
    MuteRadioChannel {
        channel: u8,
        muted: bool,
    },
    RadioTalking {
        channel: u8,
        talking: bool,
        tower_distance: Option<f32>,
    },
    RadioTowerDistance {
        channel: u8,
        distance: f32,
    },
    UseMegaphone {
        enabled: bool,
    },
    LeftVehicle,
    /// Nearby listeners of this player's phone speaker that changed (whisper mode).
    PhoneSpeakerEmit {
        enable: Vec<PlayerId>,
        disable: Vec<PlayerId>,
    },
    /// Nearby players whose voices should be relayed to call partners.
    PhoneHearNearby {
        add: Vec<PlayerId>,
        remove: Vec<PlayerId>,
    },
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct RosterEntry {
    pub id: PlayerId,
    pub engine_client_id: EngineClientId,
    pub muted_on_phone: bool,
    pub state: Vec<StateValue>,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ServerEvent {
    Init {
        ingame_name: String,
    },
    RosterAdd {
        players: Vec<RosterEntry>,
    },
    RosterRemove {
        id: PlayerId,
    },
    StateChanged {
        owner: StateOwner,
        value: StateValue,
    },
    RadioFrequencySet {
        channel: u8,
        frequency: String,
    },
    RadioMuteSet {
        channel: u8,
        muted: bool,
    },
    RadioMembersLeft {
        channel: u8,
        engine_client_ids: Vec<EngineClientId>,
    },
    RadioTalking {
        sender: PlayerId,
        engine_client_id: EngineClientId,
        channel: u8,
        talking: bool,
        error_level: f32,
    },
    RadioWhisperTargets {
        channel: u8,
        talking: bool,
        engine_client_ids: Vec<EngineClientId>,
    },
    PhoneCall {
        partner: PlayerId,
        engine_client_id: EngineClientId,
        active: bool,
        historical: bool,
    },
    PhoneMuted {
        player: PlayerId,
        muted: bool,
    },
    PhoneSpeakerChanged {
        speaker: PlayerId,
        enabled: bool,
        members: Vec<PlayerId>,
    },
    PhoneSpeakerListeners {
        active: bool,
        engine_client_ids: Vec<EngineClientId>,
    },
    PhoneNearby {
        active: bool,
        engine_client_ids: Vec<EngineClientId>,
    },
    Intercom {
        active: bool,
        engine_client_ids: Vec<EngineClientId>,
    },
    Notify {
        key: String,
    },
    Kick {
        reason: String,
    },
}
