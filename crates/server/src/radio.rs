use std::collections::{BTreeMap, HashMap};

use yaca::radio::{
    effective_error_level, is_unset, parse_frequency, radio_reach, tower_signal_strength,
};
use yaca::{EngineClientId, FrequencyRange, PlayerId, ServerEvent, UNSET_FREQUENCY};

use crate::error::ServerError;
use crate::player::VoicePlayer;
use crate::server::VoiceServer;

const SECURED_NOTICE: &str = "radio_frequency_secured";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyMember {
    /// The member's own slot for this frequency.
    pub channel: u8,
    pub muted: bool,
}

/// Who listens on which frequency, which frequencies are restricted and who
/// is currently hearing whom.
#[derive(Debug, Default)]
pub struct FrequencyRegistry {
    members: HashMap<String, BTreeMap<PlayerId, FrequencyMember>>,
    secured: Vec<FrequencyRange>,
    transmissions: HashMap<(PlayerId, u8), Vec<(PlayerId, u8)>>,
}

impl FrequencyRegistry {
    pub fn new(secured: Vec<FrequencyRange>) -> Self {
        Self {
            secured,
            ..Self::default()
        }
    }

    pub fn join(&mut self, frequency: &str, player: PlayerId, channel: u8) {
        self.members.entry(frequency.to_string()).or_default().insert(
            player,
            FrequencyMember {
                channel,
                muted: false,
            },
        );
    }

    pub fn leave(&mut self, frequency: &str, player: PlayerId) -> Option<FrequencyMember> {
        let members = self.members.get_mut(frequency)?;
        let removed = members.remove(&player);
        if members.is_empty() {
            self.members.remove(frequency);
        }
        removed
    }

    /// Members in id order.
    pub fn members(&self, frequency: &str) -> Vec<(PlayerId, FrequencyMember)> {
        self.members
            .get(frequency)
            .map(|members| members.iter().map(|(id, m)| (*id, *m)).collect())
            .unwrap_or_default()
    }

    pub fn member(&self, frequency: &str, player: PlayerId) -> Option<FrequencyMember> {
        self.members.get(frequency)?.get(&player).copied()
    }

    pub fn member_mut(&mut self, frequency: &str, player: PlayerId) -> Option<&mut FrequencyMember> {
        self.members.get_mut(frequency)?.get_mut(&player)
    }

    pub fn is_secured(&self, frequency: &str) -> bool {
        parse_frequency(frequency).is_ok_and(|value| self.is_secured_value(value))
    }

    pub fn is_secured_value(&self, frequency: f64) -> bool {
        self.secured.iter().any(|range| range.contains(frequency))
    }

    /// Returns false when the range already had the requested status.
    pub fn set_secured(&mut self, range: FrequencyRange, secured: bool) -> bool {
        let position = self.secured.iter().position(|r| r.same_as(&range));
        match (position, secured) {
            (None, true) => {
                self.secured.push(range);
                true
            }
            (Some(index), false) => {
                self.secured.remove(index);
                true
            }
            _ => false,
        }
    }

    pub fn secured_ranges(&self) -> &[FrequencyRange] {
        &self.secured
    }

    /// Frequencies with at least one member, sorted.
    pub fn active_frequencies(&self) -> Vec<&str> {
        let mut frequencies: Vec<_> = self.members.keys().map(String::as_str).collect();
        frequencies.sort_unstable();
        frequencies
    }

    pub fn record_transmission(&mut self, sender: PlayerId, channel: u8, targets: Vec<(PlayerId, u8)>) {
        self.transmissions.insert((sender, channel), targets);
    }

    pub fn end_transmission(&mut self, sender: PlayerId, channel: u8) -> Vec<(PlayerId, u8)> {
        self.transmissions
            .remove(&(sender, channel))
            .unwrap_or_default()
    }
}

struct Target {
    player: PlayerId,
    channel: u8,
    engine_client_id: EngineClientId,
    error_level: f32,
}

impl VoiceServer {
    pub(crate) fn enable_radio(&mut self, id: PlayerId, enabled: bool) -> Result<(), ServerError> {
        let player = self.player_mut(id)?;
        if player.radio.enabled == enabled {
            return Err(ServerError::Unchanged);
        }
        player.radio.enabled = enabled;
        if !enabled {
            self.stop_all_transmissions(id);
        }
        log::debug!("Player {} radio enabled: {}", id, enabled);
        Ok(())
    }

    pub(crate) fn change_radio_frequency(
        &mut self,
        id: PlayerId,
        channel: u8,
        frequency: &str,
    ) -> Result<(), ServerError> {
        if !self.config.radio.is_valid_channel(channel) {
            return Err(ServerError::InvalidChannel(channel));
        }
        let player = self.player_ref(id)?;
        if !player.radio.enabled {
            return Err(ServerError::RadioDisabled);
        }

        let frequency = frequency.trim();
        if is_unset(frequency) {
            if player.radio.frequency(channel).is_none() {
                return Err(ServerError::Unchanged);
            }
            self.leave_channel(id, channel);
            self.send_to(
                id,
                ServerEvent::RadioFrequencySet {
                    channel,
                    frequency: UNSET_FREQUENCY.to_string(),
                },
            );
            return Ok(());
        }

        if player.radio.frequency(channel) == Some(frequency) {
            return Err(ServerError::Unchanged);
        }
        let value = parse_frequency(frequency)?;
        if player.radio.channel_for(frequency).is_some() {
            return Err(ServerError::AlreadyTuned(frequency.to_string()));
        }
        if self.frequencies.is_secured_value(value) && !player.radio.is_permitted(value) {
            log::info!("Player {} denied secured frequency {}", id, frequency);
            self.send_to(
                id,
                ServerEvent::Notify {
                    key: SECURED_NOTICE.to_string(),
                },
            );
            return Err(ServerError::AccessDenied(frequency.to_string()));
        }

        if player.radio.frequency(channel).is_some() {
            self.leave_channel(id, channel);
        }
        self.player_mut(id)?
            .radio
            .frequencies
            .insert(channel, frequency.to_string());
        self.frequencies.join(frequency, id, channel);

        self.send_to(
            id,
            ServerEvent::RadioFrequencySet {
                channel,
                frequency: frequency.to_string(),
            },
        );
        Ok(())
    }

    pub(crate) fn mute_radio_channel(
        &mut self,
        id: PlayerId,
        channel: u8,
        muted: bool,
    ) -> Result<(), ServerError> {
        let frequency = self
            .player_ref(id)?
            .radio
            .frequency(channel)
            .map(str::to_string)
            .ok_or(ServerError::NotTuned(channel))?;

        let member = self
            .frequencies
            .member_mut(&frequency, id)
            .ok_or(ServerError::NotTuned(channel))?;
        if member.muted == muted {
            return Err(ServerError::Unchanged);
        }
        member.muted = muted;

        if muted && self.player_mut(id)?.radio.talking.remove(&channel) {
            self.stop_transmission(id, channel);
        }
        self.send_to(id, ServerEvent::RadioMuteSet { channel, muted });
        Ok(())
    }

    pub(crate) fn radio_talking(
        &mut self,
        id: PlayerId,
        channel: u8,
        talking: bool,
        tower_distance: Option<f32>,
    ) -> Result<(), ServerError> {
        let use_towers = self.config.radio.use_towers;
        let max_distance = self.config.radio.max_tower_distance;
        let player = self.player_mut(id)?;

        if talking {
            if !player.radio.enabled {
                return Err(ServerError::RadioDisabled);
            }
            if player.radio.frequency(channel).is_none() {
                return Err(ServerError::NotTuned(channel));
            }
            if !player.radio.talking.insert(channel) {
                return Err(ServerError::Unchanged);
            }
            if use_towers && let Some(distance) = tower_distance {
                player.radio.signal = Some(tower_signal_strength(distance, max_distance));
            }
            self.start_transmission(id, channel);
        } else {
            if !player.radio.talking.remove(&channel) {
                return Err(ServerError::NotTalking(channel));
            }
            self.stop_transmission(id, channel);
        }
        Ok(())
    }

    /// A sender moved relative to the towers; receivers get the new error level.
    pub(crate) fn radio_tower_distance(
        &mut self,
        id: PlayerId,
        channel: u8,
        distance: f32,
    ) -> Result<(), ServerError> {
        let max_distance = self.config.radio.max_tower_distance;
        let use_towers = self.config.radio.use_towers;
        let player = self.player_mut(id)?;
        if !player.radio.talking.contains(&channel) {
            return Err(ServerError::NotTalking(channel));
        }
        if !use_towers {
            return Err(ServerError::Unchanged);
        }

        let signal = tower_signal_strength(distance, max_distance);
        if player.radio.signal == Some(signal) {
            return Err(ServerError::Unchanged);
        }
        player.radio.signal = Some(signal);
        self.start_transmission(id, channel);
        Ok(())
    }

    /// Restricts or frees a frequency range. Securing evicts every member
    /// without a permit and returns them.
    pub fn set_frequency_secured(
        &mut self,
        range: &str,
        secured: bool,
    ) -> Result<Vec<PlayerId>, ServerError> {
        let range: FrequencyRange = range.parse()?;
        if !self.frequencies.set_secured(range, secured) {
            return Err(ServerError::Unchanged);
        }
        log::info!("Frequency range {:?} secured: {}", range, secured);
        if !secured {
            return Ok(Vec::new());
        }

        let evicted = self.evict_unpermitted(|_| true);
        Ok(evicted)
    }

    pub fn add_permitted_frequency(&mut self, id: PlayerId, range: &str) -> Result<(), ServerError> {
        let range: FrequencyRange = range.parse()?;
        let player = self.player_mut(id)?;
        if player.radio.permitted.iter().any(|r| r.same_as(&range)) {
            return Err(ServerError::Unchanged);
        }
        player.radio.permitted.push(range);
        Ok(())
    }

    /// Withdraws a permit and evicts the player from secured frequencies it
    /// no longer covers.
    pub fn remove_permitted_frequency(
        &mut self,
        id: PlayerId,
        range: &str,
    ) -> Result<Vec<u8>, ServerError> {
        let range: FrequencyRange = range.parse()?;
        let player = self.player_mut(id)?;
        let Some(index) = player.radio.permitted.iter().position(|r| r.same_as(&range)) else {
            return Err(ServerError::Unchanged);
        };
        player.radio.permitted.remove(index);

        let before: Vec<u8> = self.player_ref(id)?.radio.frequencies.keys().copied().collect();
        self.evict_unpermitted(|player| player == id);
        let after = &self.player_ref(id)?.radio.frequencies;
        Ok(before.into_iter().filter(|ch| !after.contains_key(ch)).collect())
    }

    pub fn set_long_range(&mut self, id: PlayerId, long_range: bool) -> Result<(), ServerError> {
        let player = self.player_mut(id)?;
        if player.radio.long_range == long_range {
            return Err(ServerError::Unchanged);
        }
        player.radio.long_range = long_range;
        Ok(())
    }

    pub(crate) fn stop_all_transmissions(&mut self, id: PlayerId) {
        let Some(player) = self.players.get_mut(id) else {
            return;
        };
        let channels: Vec<u8> = std::mem::take(&mut player.radio.talking).into_iter().collect();
        for channel in channels {
            self.stop_transmission(id, channel);
        }
    }

    /// Leaves every tuned frequency of a departed player.
    pub(crate) fn release_radio(&mut self, player: &VoicePlayer) {
        for channel in &player.radio.talking {
            self.end_transmission_with(player.id, player.engine_client_id, *channel);
        }
        for frequency in player.radio.frequencies.values() {
            self.frequencies.leave(frequency, player.id);
            if let Some(engine_client_id) = player.engine_client_id {
                self.announce_left(frequency, engine_client_id);
            }
        }
    }

    /// Removes one slot's tuning and tells the remaining members.
    pub(crate) fn leave_channel(&mut self, id: PlayerId, channel: u8) {
        let Some(player) = self.players.get_mut(id) else {
            return;
        };
        let Some(frequency) = player.radio.frequencies.remove(&channel) else {
            return;
        };
        let engine_client_id = player.engine_client_id;
        if player.radio.talking.remove(&channel) {
            self.stop_transmission(id, channel);
        }

        self.frequencies.leave(&frequency, id);
        if let Some(engine_client_id) = engine_client_id {
            self.announce_left(&frequency, engine_client_id);
        }
    }

    fn announce_left(&mut self, frequency: &str, engine_client_id: EngineClientId) {
        for (member, entry) in self.frequencies.members(frequency) {
            self.send_to(
                member,
                ServerEvent::RadioMembersLeft {
                    channel: entry.channel,
                    engine_client_ids: vec![engine_client_id],
                },
            );
        }
    }

    /// Sends (or resends) the talking start to every reachable member.
    fn start_transmission(&mut self, id: PlayerId, channel: u8) {
        let Some(sender) = self.players.get(id) else {
            return;
        };
        let Some(frequency) = sender.radio.frequency(channel).map(str::to_string) else {
            return;
        };
        let Some(sender_engine) = sender.engine_client_id else {
            return;
        };

        let self_muted = self
            .frequencies
            .member(&frequency, id)
            .is_some_and(|member| member.muted);
        let global = self.state.global_error_level();
        let targets: Vec<Target> = if self_muted {
            Vec::new()
        } else {
            self.frequencies
                .members(&frequency)
                .into_iter()
                .filter(|(member, entry)| *member != id && !entry.muted)
                .filter_map(|(member, entry)| {
                    let receiver = self.players.get(member)?;
                    if !receiver.radio.enabled {
                        return None;
                    }
                    radio_reach(sender.radio.long_range, receiver.radio.long_range)?;
                    Some(Target {
                        player: member,
                        channel: entry.channel,
                        engine_client_id: receiver.engine_client_id?,
                        error_level: effective_error_level(
                            sender.radio.signal,
                            receiver.radio.signal,
                            global,
                        ),
                    })
                })
                .collect()
        };

        for target in &targets {
            self.send_to(
                target.player,
                ServerEvent::RadioTalking {
                    sender: id,
                    engine_client_id: sender_engine,
                    channel: target.channel,
                    talking: true,
                    error_level: target.error_level,
                },
            );
        }
        if self.config.use_whisper() {
            self.send_to(
                id,
                ServerEvent::RadioWhisperTargets {
                    channel,
                    talking: true,
                    engine_client_ids: targets.iter().map(|t| t.engine_client_id).collect(),
                },
            );
        }

        let recorded = targets.iter().map(|t| (t.player, t.channel)).collect();
        self.frequencies.record_transmission(id, channel, recorded);
    }

    fn stop_transmission(&mut self, id: PlayerId, channel: u8) {
        self.notify_transmission_end(id, channel);
        if self.config.use_whisper() {
            self.send_to(
                id,
                ServerEvent::RadioWhisperTargets {
                    channel,
                    talking: false,
                    engine_client_ids: Vec::new(),
                },
            );
        }
    }

    fn notify_transmission_end(&mut self, id: PlayerId, channel: u8) {
        let engine_client_id = self.players.engine_id(id);
        self.end_transmission_with(id, engine_client_id, channel);
    }

    fn end_transmission_with(
        &mut self,
        id: PlayerId,
        engine_client_id: Option<EngineClientId>,
        channel: u8,
    ) {
        let targets = self.frequencies.end_transmission(id, channel);
        let Some(engine_client_id) = engine_client_id else {
            return;
        };
        for (target, target_channel) in targets {
            self.send_to(
                target,
                ServerEvent::RadioTalking {
                    sender: id,
                    engine_client_id,
                    channel: target_channel,
                    talking: false,
                    error_level: 0.0,
                },
            );
        }
    }

    /// Kicks matching players off secured frequencies they hold no permit for.
    fn evict_unpermitted(&mut self, include: impl Fn(PlayerId) -> bool) -> Vec<PlayerId> {
        let mut evictions: Vec<(PlayerId, u8)> = self
            .players
            .iter()
            .filter(|player| include(player.id))
            .flat_map(|player| {
                player
                    .radio
                    .frequencies
                    .iter()
                    .filter(|(_, frequency)| {
                        self.frequencies.is_secured(frequency)
                            && !player.radio.is_permitted_str(frequency)
                    })
                    .map(|(channel, _)| (player.id, *channel))
                    .collect::<Vec<_>>()
            })
            .collect();
        evictions.sort_unstable();

        let mut evicted = Vec::new();
        for (id, channel) in evictions {
            self.leave_channel(id, channel);
            self.send_to(
                id,
                ServerEvent::RadioFrequencySet {
                    channel,
                    frequency: UNSET_FREQUENCY.to_string(),
                },
            );
            self.send_to(
                id,
                ServerEvent::Notify {
                    key: SECURED_NOTICE.to_string(),
                },
            );
            log::info!("Evicted player {} from secured channel {}", id, channel);
            if !evicted.contains(&id) {
                evicted.push(id);
            }
        }
        evicted
    }
}
