use std::collections::{BTreeMap, BTreeSet, HashMap};

use yaca::radio::parse_frequency;
use yaca::{EngineClientId, FrequencyRange, PlayerId};

#[derive(Debug, Clone, Default)]
pub struct RadioSettings {
    pub enabled: bool,
    pub long_range: bool,
    /// Tuned channels only; unset slots are absent.
    pub frequencies: BTreeMap<u8, String>,
    pub talking: BTreeSet<u8>,
    /// Tower error level from the latest distance report.
    pub signal: Option<f32>,
    pub permitted: Vec<FrequencyRange>,
}

impl RadioSettings {
    pub fn frequency(&self, channel: u8) -> Option<&str> {
        self.frequencies.get(&channel).map(String::as_str)
    }

    pub fn channel_for(&self, frequency: &str) -> Option<u8> {
        self.frequencies
            .iter()
            .find(|(_, tuned)| tuned.as_str() == frequency)
            .map(|(channel, _)| *channel)
    }

    pub fn is_permitted(&self, frequency: f64) -> bool {
        self.permitted.iter().any(|range| range.contains(frequency))
    }

    pub fn is_permitted_str(&self, frequency: &str) -> bool {
        parse_frequency(frequency).is_ok_and(|value| self.is_permitted(value))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PhoneSettings {
    pub muted_on_phone: bool,
    pub speaker_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct VoicePlayer {
    pub id: PlayerId,
    pub name: String,
    pub engine_client_id: Option<EngineClientId>,
    pub alive: bool,
    pub force_muted: bool,
    pub max_voice_range: Option<f32>,
    pub megaphone_permission: bool,
    pub radio: RadioSettings,
    pub phone: PhoneSettings,
}

impl VoicePlayer {
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            engine_client_id: None,
            alive: true,
            force_muted: false,
            max_voice_range: None,
            megaphone_permission: false,
            radio: RadioSettings::default(),
            phone: PhoneSettings::default(),
        }
    }

    /// Joined the voice engine and reported its client id.
    pub fn is_ready(&self) -> bool {
        self.engine_client_id.is_some()
    }

    pub fn is_muted(&self) -> bool {
        !self.alive || self.force_muted
    }
}

#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, VoicePlayer>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, player: VoicePlayer) {
        self.players.insert(player.id, player);
    }

    pub fn remove(&mut self, id: PlayerId) -> Option<VoicePlayer> {
        self.players.remove(&id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&VoicePlayer> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut VoicePlayer> {
        self.players.get_mut(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn engine_id(&self, id: PlayerId) -> Option<EngineClientId> {
        self.players.get(&id).and_then(|p| p.engine_client_id)
    }

    pub fn name_taken(&self, name: &str) -> bool {
        self.players.values().any(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoicePlayer> {
        self.players.values()
    }

    /// Sorted so fan-out order is stable.
    pub fn ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<_> = self.players.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn ready_ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<_> = self
            .players
            .values()
            .filter(|p| p.is_ready())
            .map(|p| p.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_ids_skip_players_without_engine() {
        let mut registry = PlayerRegistry::new();
        let mut ready = VoicePlayer::new(3, "c".into());
        ready.engine_client_id = Some(30);
        registry.insert(ready);
        registry.insert(VoicePlayer::new(1, "a".into()));

        assert_eq!(registry.ids(), vec![1, 3]);
        assert_eq!(registry.ready_ids(), vec![3]);
        assert_eq!(registry.engine_id(3), Some(30));
        assert!(registry.name_taken("a"));
    }

    #[test]
    fn permitted_ranges_accept_comma_decimals() {
        let mut radio = RadioSettings::default();
        radio.permitted.push("100-200".parse().unwrap());

        assert!(radio.is_permitted_str("150,25"));
        assert!(!radio.is_permitted_str("250"));
        assert!(!radio.is_permitted_str("garbage"));
    }
}
