use glam::Vec3;
use serde::Serialize;

use crate::EngineClientId;
use crate::config::VoiceConfig;

use super::ProtocolError;
use super::device::{CommDeviceMode, CommDeviceType, StereoMode};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JsonVec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for JsonVec3 {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct RequestBase {
    request_type: &'static str,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    base: RequestBase,
    #[serde(flatten)]
    body: &'a T,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitFrame {
    pub server_guid: String,
    pub ingame_name: String,
    pub ingame_channel: u32,
    pub default_channel: u32,
    pub ingame_channel_password: String,
    pub excluded_channels: Vec<u32>,
    pub muffling_range: i32,
    pub build_type: u8,
    pub unmute_delay: u32,
    pub operation_mode: u8,
}

impl InitFrame {
    pub fn from_config(config: &VoiceConfig, ingame_name: impl Into<String>) -> Self {
        let ts = &config.teamspeak;
        Self {
            server_guid: ts.server_guid.clone(),
            ingame_name: ingame_name.into(),
            ingame_channel: ts.ingame_channel_id,
            default_channel: ts.default_channel_id,
            ingame_channel_password: ts.ingame_channel_password.clone(),
            excluded_channels: ts.excluded_channels.clone(),
            muffling_range: config.muffling.muffling_range,
            build_type: ts.build_type as u8,
            unmute_delay: ts.unmute_delay,
            operation_mode: u8::from(ts.use_whisper),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceMember {
    pub client_id: EngineClientId,
    pub mode: CommDeviceMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommDevice {
    pub on: bool,
    pub comm_type: CommDeviceType,
    pub members: Vec<DeviceMember>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_level: Option<f32>,
}

impl CommDevice {
    pub fn new(comm_type: CommDeviceType, on: bool) -> Self {
        Self {
            on,
            comm_type,
            members: Vec::new(),
            channel: None,
            range: None,
            error_level: None,
        }
    }

    pub fn own(mut self, client_id: Option<EngineClientId>, mode: CommDeviceMode) -> Self {
        if let Some(client_id) = client_id {
            self.members.push(DeviceMember { client_id, mode });
        }
        self
    }

    pub fn others(
        mut self,
        client_ids: impl IntoIterator<Item = EngineClientId>,
        mode: CommDeviceMode,
    ) -> Self {
        self.members.extend(
            client_ids
                .into_iter()
                .map(|client_id| DeviceMember { client_id, mode }),
        );
        self
    }

    pub fn channel(mut self, channel: u8) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn range(mut self, range: f32) -> Self {
        self.range = Some(range);
        self
    }

    pub fn error_level(mut self, error_level: Option<f32>) -> Self {
        self.error_level = error_level;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommDeviceSettings {
    pub comm_type: CommDeviceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_mode: Option<StereoMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommDeviceLeft {
    pub comm_type: CommDeviceType,
    pub client_ids: Vec<EngineClientId>,
    pub channel: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerEntry {
    pub client_id: EngineClientId,
    pub position: JsonVec3,
    pub direction: JsonVec3,
    pub range: f32,
    pub is_underwater: bool,
    pub muffle_intensity: u8,
    pub is_muted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerFrame {
    pub player_direction: JsonVec3,
    pub player_position: JsonVec3,
    pub player_range: f32,
    pub player_is_underwater: bool,
    pub player_is_muted: bool,
    pub players_list: Vec<PlayerEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngameUpdate {
    CommDevice(CommDevice),
    CommDeviceSettings(CommDeviceSettings),
    CommDeviceLeft(CommDeviceLeft),
    Player(PlayerFrame),
}

/// Every frame the client sends to the voice engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineFrame {
    Init(InitFrame),
    Ingame(IngameUpdate),
}

impl EngineFrame {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        let json = match self {
            Self::Init(init) => serde_json::to_string(&Envelope {
                base: RequestBase {
                    request_type: "INIT",
                },
                body: init,
            }),
            Self::Ingame(update) => serde_json::to_string(&Envelope {
                base: RequestBase {
                    request_type: "INGAME",
                },
                body: update,
            }),
        };
        json.map_err(ProtocolError::Encode)
    }

    pub fn comm_device(&self) -> Option<&CommDevice> {
        match self {
            Self::Ingame(IngameUpdate::CommDevice(device)) => Some(device),
            _ => None,
        }
    }

    pub fn player_frame(&self) -> Option<&PlayerFrame> {
        match self {
            Self::Ingame(IngameUpdate::Player(frame)) => Some(frame),
            _ => None,
        }
    }
}

impl From<InitFrame> for EngineFrame {
    fn from(init: InitFrame) -> Self {
        Self::Init(init)
    }
}

impl From<CommDevice> for EngineFrame {
    fn from(device: CommDevice) -> Self {
        Self::Ingame(IngameUpdate::CommDevice(device))
    }
}

impl From<CommDeviceSettings> for EngineFrame {
    fn from(settings: CommDeviceSettings) -> Self {
        Self::Ingame(IngameUpdate::CommDeviceSettings(settings))
    }
}

impl From<CommDeviceLeft> for EngineFrame {
    fn from(left: CommDeviceLeft) -> Self {
        Self::Ingame(IngameUpdate::CommDeviceLeft(left))
    }
}

impl From<PlayerFrame> for EngineFrame {
    fn from(frame: PlayerFrame) -> Self {
        Self::Ingame(IngameUpdate::Player(frame))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn to_value(frame: EngineFrame) -> Value {
        serde_json::from_str(&frame.to_json().unwrap()).unwrap()
    }

    #[test]
    fn init_frame_layout() {
        let mut config = VoiceConfig::default();
        config.teamspeak.server_guid = "guid".into();
        config.teamspeak.ingame_channel_id = 5;
        config.teamspeak.default_channel_id = 1;
        config.teamspeak.excluded_channels = vec![7, 8];
        config.teamspeak.use_whisper = true;

        let value = to_value(EngineFrame::Init(InitFrame::from_config(&config, "[YACA] abc")));

        assert_eq!(value["base"]["request_type"], "INIT");
        assert_eq!(value["server_guid"], "guid");
        assert_eq!(value["ingame_name"], "[YACA] abc");
        assert_eq!(value["ingame_channel"], 5);
        assert_eq!(value["default_channel"], 1);
        assert_eq!(value["excluded_channels"], json!([7, 8]));
        assert_eq!(value["operation_mode"], 1);
        assert_eq!(value["build_type"], 0);
    }

    #[test]
    fn comm_device_frame_layout() {
        let device = CommDevice::new(CommDeviceType::Radio, true)
            .own(Some(3), CommDeviceMode::Receiver)
            .others([9], CommDeviceMode::Sender)
            .channel(2);

        let value = to_value(device.into());

        assert_eq!(value["base"]["request_type"], "INGAME");
        assert_eq!(value["comm_device"]["on"], true);
        assert_eq!(value["comm_device"]["comm_type"], "RADIO");
        assert_eq!(
            value["comm_device"]["members"],
            json!([
                {"client_id": 3, "mode": "RECEIVER"},
                {"client_id": 9, "mode": "SENDER"}
            ])
        );
        assert_eq!(value["comm_device"]["channel"], 2);
        assert!(value["comm_device"].get("range").is_none());
    }

    #[test]
    fn own_member_skipped_without_engine_id() {
        let device = CommDevice::new(CommDeviceType::Megaphone, false)
            .own(None, CommDeviceMode::Sender)
            .others([4], CommDeviceMode::Receiver);
        assert_eq!(device.members.len(), 1);
    }

    #[test]
    fn settings_and_left_frames() {
        let settings = CommDeviceSettings {
            comm_type: CommDeviceType::Radio,
            volume: Some(0.5),
            output_mode: Some(StereoMode::MonoLeft),
            channel: Some(1),
        };
        let value = to_value(settings.into());
        assert_eq!(value["comm_device_settings"]["output_mode"], "MONO_LEFT");
        assert_eq!(value["comm_device_settings"]["volume"], 0.5);

        let left = CommDeviceLeft {
            comm_type: CommDeviceType::Radio,
            client_ids: vec![1, 2],
            channel: 3,
        };
        let value = to_value(left.into());
        assert_eq!(value["comm_device_left"]["client_ids"], json!([1, 2]));
        assert_eq!(value["comm_device_left"]["channel"], 3);
    }

    #[test]
    fn player_frame_layout() {
        let frame = PlayerFrame {
            player_direction: Vec3::Y.into(),
            player_position: Vec3::new(1.0, 2.0, 3.0).into(),
            player_range: 8.0,
            player_is_underwater: false,
            player_is_muted: false,
            players_list: vec![PlayerEntry {
                client_id: 12,
                position: Vec3::ZERO.into(),
                direction: Vec3::X.into(),
                range: 15.0,
                is_underwater: true,
                muffle_intensity: 6,
                is_muted: false,
            }],
        };

        let value = to_value(frame.into());

        assert_eq!(value["player"]["player_position"], json!({"x": 1.0, "y": 2.0, "z": 3.0}));
        assert_eq!(value["player"]["players_list"][0]["client_id"], 12);
        assert_eq!(value["player"]["players_list"][0]["muffle_intensity"], 6);
        assert_eq!(value["player"]["players_list"][0]["is_underwater"], true);
    }
}
