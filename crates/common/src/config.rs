use std::time::Duration;

use glam::Vec3;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Fivem,
    Redm,
}

impl Platform {
    pub fn supports_vehicle_muffling(self) -> bool {
        matches!(self, Self::Fivem)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BuildType {
    #[default]
    Release = 0,
    Develop = 1,
}

/// When a caller's nearby voices are relayed to their call partners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HearNearbyMode {
    #[default]
    Off,
    PhoneSpeaker,
    Always,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceRangeConfig {
    pub ranges: Vec<f32>,
    pub default_index: usize,
}

impl Default for VoiceRangeConfig {
    fn default() -> Self {
        Self {
            ranges: vec![1.0, 3.0, 8.0, 15.0, 20.0, 25.0, 30.0, 40.0],
            default_index: 2,
        }
    }
}

impl VoiceRangeConfig {
    pub const FALLBACK_RANGE: f32 = 1.0;

    pub fn validated(self) -> Self {
        let invalid = self.ranges.is_empty()
            || self.ranges.iter().any(|r| !r.is_finite() || *r <= 0.0);

        if invalid {
            log::error!(
                "Invalid voice range list {:?}, falling back to [{}]",
                self.ranges,
                Self::FALLBACK_RANGE
            );
            return Self {
                ranges: vec![Self::FALLBACK_RANGE],
                default_index: 0,
            };
        }

        if self.default_index >= self.ranges.len() {
            log::error!(
                "Default voice range index {} out of bounds for {} ranges, using 0",
                self.default_index,
                self.ranges.len()
            );
            return Self {
                default_index: 0,
                ..self
            };
        }

        self
    }

    pub fn default_range(&self) -> f32 {
        self.ranges
            .get(self.default_index)
            .copied()
            .unwrap_or(Self::FALLBACK_RANGE)
    }

    pub fn max_range(&self) -> f32 {
        self.ranges
            .iter()
            .copied()
            .fold(Self::FALLBACK_RANGE, f32::max)
    }

    pub fn contains(&self, range: f32) -> bool {
        self.ranges.iter().any(|r| (r - range).abs() < f32::EPSILON)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TeamspeakConfig {
    pub server_guid: String,
    pub ingame_channel_id: u32,
    pub default_channel_id: u32,
    pub ingame_channel_password: String,
    pub excluded_channels: Vec<u32>,
    pub unmute_delay: u32,
    pub build_type: BuildType,
    pub use_whisper: bool,
}

impl Default for TeamspeakConfig {
    fn default() -> Self {
        Self {
            server_guid: String::new(),
            ingame_channel_id: 0,
            default_channel_id: 0,
            ingame_channel_password: String::new(),
            excluded_channels: Vec::new(),
            unmute_delay: 400,
            build_type: BuildType::Release,
            use_whisper: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MufflingIntensities {
    pub different_room: u8,
    pub both_car_doors_closed: u8,
    pub one_car_door_closed: u8,
    pub megaphone_in_car: u8,
}

impl Default for MufflingIntensities {
    fn default() -> Self {
        Self {
            different_room: 10,
            both_car_doors_closed: 10,
            one_car_door_closed: 6,
            megaphone_in_car: 6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MufflingConfig {
    pub vehicle_muffling: bool,
    pub muffling_range: i32,
    pub intensities: MufflingIntensities,
    pub vehicle_opening_whitelist: Vec<u32>,
    pub platform: Platform,
}

impl Default for MufflingConfig {
    fn default() -> Self {
        Self {
            vehicle_muffling: true,
            muffling_range: 2,
            intensities: MufflingIntensities::default(),
            vehicle_opening_whitelist: Vec::new(),
            platform: Platform::Fivem,
        }
    }
}

impl MufflingConfig {
    pub fn vehicle_muffling_active(&self) -> bool {
        self.vehicle_muffling && self.platform.supports_vehicle_muffling()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhoneConfig {
    pub max_phone_speaker_range: f32,
    pub hear_players_nearby: HearNearbyMode,
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            max_phone_speaker_range: 5.0,
            hear_players_nearby: HearNearbyMode::Off,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    pub channel_count: u8,
    pub default_channel: u8,
    pub use_towers: bool,
    pub towers: Vec<Vec3>,
    pub max_tower_distance: f32,
    pub tower_report_interval_ms: u64,
    pub secured_frequencies: Vec<String>,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            channel_count: 9,
            default_channel: 1,
            use_towers: false,
            towers: Vec::new(),
            max_tower_distance: 8000.0,
            tower_report_interval_ms: 1000,
            secured_frequencies: Vec::new(),
        }
    }
}

impl RadioConfig {
    pub fn tower_report_interval(&self) -> Duration {
        Duration::from_millis(self.tower_report_interval_ms)
    }

    pub fn is_valid_channel(&self, channel: u8) -> bool {
        (1..=self.channel_count).contains(&channel)
    }

    pub fn channels(&self) -> impl Iterator<Item = u8> {
        1..=self.channel_count
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MegaphoneConfig {
    pub range: f32,
    pub allowed_vehicle_classes: Vec<u32>,
    pub allowed_vehicle_models: Vec<u32>,
    pub automatic_vehicle_detection: bool,
}

impl Default for MegaphoneConfig {
    fn default() -> Self {
        Self {
            range: 30.0,
            allowed_vehicle_classes: vec![18, 19],
            allowed_vehicle_models: Vec::new(),
            automatic_vehicle_detection: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NameConfig {
    pub prefix: String,
    pub length: usize,
    pub max_attempts: u32,
}

impl Default for NameConfig {
    fn default() -> Self {
        Self {
            prefix: String::from("[YACA] "),
            length: 10,
            max_attempts: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub voice_range: VoiceRangeConfig,
    pub teamspeak: TeamspeakConfig,
    pub muffling: MufflingConfig,
    pub phone: PhoneConfig,
    pub radio: RadioConfig,
    pub megaphone: MegaphoneConfig,
    pub names: NameConfig,
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub tick_interval_ms: u64,
    pub streaming_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 250,
            streaming_timeout_ms: 5000,
        }
    }
}

impl TimingConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn streaming_timeout(&self) -> Duration {
        Duration::from_millis(self.streaming_timeout_ms)
    }
}

impl VoiceConfig {
    pub fn validated(mut self) -> Self {
        self.voice_range = self.voice_range.validated();

        if self.radio.channel_count == 0 {
            log::error!("Radio channel count must be at least 1, using 1");
            self.radio.channel_count = 1;
        }
        if !self.radio.is_valid_channel(self.radio.default_channel) {
            log::error!(
                "Default radio channel {} out of range, using 1",
                self.radio.default_channel
            );
            self.radio.default_channel = 1;
        }
        if self.radio.max_tower_distance <= 0.0 {
            log::error!("Radio tower distance must be positive, disabling towers");
            self.radio.use_towers = false;
        }

        self
    }

    pub fn use_whisper(&self) -> bool {
        self.teamspeak.use_whisper
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_voice_range() {
        let config = VoiceRangeConfig::default().validated();
        assert_eq!(config.default_range(), 8.0);
        assert_eq!(config.max_range(), 40.0);
    }

    #[test]
    fn empty_range_list_falls_back() {
        let config = VoiceRangeConfig {
            ranges: Vec::new(),
            default_index: 3,
        }
        .validated();

        assert_eq!(config.ranges, vec![1.0]);
        assert_eq!(config.default_index, 0);
        assert_eq!(config.default_range(), 1.0);
    }

    #[test]
    fn out_of_bounds_index_is_reset() {
        let config = VoiceRangeConfig {
            ranges: vec![2.0, 4.0],
            default_index: 7,
        }
        .validated();

        assert_eq!(config.default_index, 0);
        assert_eq!(config.default_range(), 2.0);
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: VoiceConfig = serde_json::from_str(
            r#"{"phone": {"hear_players_nearby": "phone_speaker"}, "radio": {"channel_count": 4}}"#,
        )
        .unwrap();

        assert_eq!(config.phone.hear_players_nearby, HearNearbyMode::PhoneSpeaker);
        assert_eq!(config.phone.max_phone_speaker_range, 5.0);
        assert_eq!(config.radio.channel_count, 4);
        assert_eq!(config.muffling.intensities.different_room, 10);
    }

    #[test]
    fn redm_has_no_vehicle_muffling() {
        let config = MufflingConfig {
            platform: Platform::Redm,
            ..Default::default()
        };
        assert!(!config.vehicle_muffling_active());
    }
}
