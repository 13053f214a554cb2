use std::collections::VecDeque;

use yaca::{
    ClientEvent, EngineClientId, FrequencyRange, PlayerId, ReplicatedState, RosterEntry,
    ServerEvent, StateOwner, StateValue, VoiceConfig,
};

use crate::error::ServerError;
use crate::events::{Outbound, Recipient};
use crate::names::{NameSource, RandomNames, generate_name};
use crate::phone::{CallGraph, NearbyRelays, SpeakerEmissions};
use crate::player::{PlayerRegistry, VoicePlayer};
use crate::radio::FrequencyRegistry;

const RANGE_EPSILON: f32 = 1e-3;

/// Authoritative voice state. Clients only ever request changes; everything
/// that takes effect goes out through the outbound queue.
pub struct VoiceServer {
    pub(crate) config: VoiceConfig,
    pub(crate) players: PlayerRegistry,
    pub(crate) state: ReplicatedState,
    pub(crate) frequencies: FrequencyRegistry,
    pub(crate) calls: CallGraph,
    pub(crate) speakers: SpeakerEmissions,
    pub(crate) nearby: NearbyRelays,
    names: Box<dyn NameSource>,
    outbound: VecDeque<Outbound>,
}

impl VoiceServer {
    pub fn new(config: VoiceConfig) -> Self {
        Self::with_names(config, RandomNames)
    }

    pub fn with_names(config: VoiceConfig, names: impl NameSource + 'static) -> Self {
        let config = config.validated();
        let secured = config
            .radio
            .secured_frequencies
            .iter()
            .filter_map(|range| match range.parse::<FrequencyRange>() {
                Ok(range) => Some(range),
                Err(e) => {
                    log::error!("Skipping secured frequency: {}", e);
                    None
                }
            })
            .collect();

        Self {
            frequencies: FrequencyRegistry::new(secured),
            players: PlayerRegistry::new(),
            state: ReplicatedState::new(),
            calls: CallGraph::default(),
            speakers: SpeakerEmissions::default(),
            nearby: NearbyRelays::default(),
            names: Box::new(names),
            outbound: VecDeque::new(),
            config,
        }
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    pub fn player(&self, id: PlayerId) -> Option<&VoicePlayer> {
        self.players.get(id)
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn state(&self) -> &ReplicatedState {
        &self.state
    }

    pub fn frequencies(&self) -> &FrequencyRegistry {
        &self.frequencies
    }

    pub fn calls(&self) -> &CallGraph {
        &self.calls
    }

    pub fn speakers(&self) -> &SpeakerEmissions {
        &self.speakers
    }

    pub fn nearby(&self) -> &NearbyRelays {
        &self.nearby
    }

    pub fn drain_outbound(&mut self) -> impl Iterator<Item = Outbound> + '_ {
        self.outbound.drain(..)
    }

    /// Registers a player and hands out a voice name. A player who cannot get
    /// a free name is kicked.
    pub fn player_joined(&mut self, id: PlayerId) -> Result<(), ServerError> {
        if self.players.contains(id) {
            return Err(ServerError::AlreadyJoined(id));
        }

        let players = &self.players;
        let name = match generate_name(self.names.as_mut(), &self.config.names, |name| {
            players.name_taken(name)
        }) {
            Ok(name) => name,
            Err(e) => {
                log::warn!("Kicking player {}: {}", id, e);
                self.send_to(
                    id,
                    ServerEvent::Kick {
                        reason: e.to_string(),
                    },
                );
                return Err(e);
            }
        };

        log::info!("Player {} joined voice as {:?}", id, name);
        self.players.insert(VoicePlayer::new(id, name.clone()));
        self.send_to(id, ServerEvent::Init { ingame_name: name });
        Ok(())
    }

    /// Drops every trace of a player: frequency membership, call edges,
    /// speaker emissions and nearby relays.
    pub fn player_left(&mut self, id: PlayerId) -> Result<(), ServerError> {
        let player = self
            .players
            .remove(id)
            .ok_or(ServerError::UnknownPlayer(id))?;

        self.release_radio(&player);
        self.release_phone(id, player.engine_client_id);
        self.state.remove_player(id);

        log::info!("Player {} ({}) left voice", id, player.name);
        self.send(Recipient::All, ServerEvent::RosterRemove { id });
        self.flush_state();
        Ok(())
    }

    pub fn handle_client_packet(&mut self, id: PlayerId, data: &[u8]) -> Result<(), ServerError> {
        let event = ClientEvent::decode(data)?;
        self.handle_client_event(id, event)
    }

    /// Validates and applies one client request. Rejected requests leave the
    /// state untouched.
    pub fn handle_client_event(
        &mut self,
        id: PlayerId,
        event: ClientEvent,
    ) -> Result<(), ServerError> {
        if !self.players.contains(id) {
            return Err(ServerError::UnknownPlayer(id));
        }

        let result = match event {
            ClientEvent::EngineReady { engine_client_id } => self.engine_ready(id, engine_client_id),
            ClientEvent::ChangeVoiceRange { range } => self.change_voice_range(id, range),
            ClientEvent::TalkState { talking } => {
                self.state
                    .set(StateOwner::Player(id), StateValue::Talking(talking));
                Ok(())
            }
            ClientEvent::EnableRadio { enabled } => self.enable_radio(id, enabled),
            ClientEvent::ChangeRadioFrequency { channel, frequency } => {
                self.change_radio_frequency(id, channel, &frequency)
            }
            ClientEvent::MuteRadioChannel { channel, muted } => {
                self.mute_radio_channel(id, channel, muted)
            }
            ClientEvent::RadioTalking {
                channel,
                talking,
                tower_distance,
            } => self.radio_talking(id, channel, talking, tower_distance),
            ClientEvent::RadioTowerDistance { channel, distance } => {
                self.radio_tower_distance(id, channel, distance)
            }
            ClientEvent::UseMegaphone { enabled } => self.use_megaphone(id, enabled),
            ClientEvent::LeftVehicle => self.left_vehicle(id),
            ClientEvent::PhoneSpeakerEmit { enable, disable } => {
                self.phone_speaker_emit(id, &enable, &disable)
            }
            ClientEvent::PhoneHearNearby { add, remove } => {
                self.phone_hear_nearby(id, &add, &remove)
            }
        };

        if let Err(e) = &result {
            log::debug!("Rejected request from player {}: {}", id, e);
        }
        self.flush_state();
        result
    }

    pub fn set_player_alive(&mut self, id: PlayerId, alive: bool) -> Result<(), ServerError> {
        let player = self.player_mut(id)?;
        if player.alive == alive {
            return Err(ServerError::Unchanged);
        }
        player.alive = alive;
        self.refresh_mute(id);
        self.flush_state();
        Ok(())
    }

    pub fn set_force_muted(&mut self, id: PlayerId, muted: bool) -> Result<(), ServerError> {
        let player = self.player_mut(id)?;
        if player.force_muted == muted {
            return Err(ServerError::Unchanged);
        }
        player.force_muted = muted;
        self.refresh_mute(id);
        self.flush_state();
        Ok(())
    }

    /// Caps a player's voice range. A current range above the cap drops to the
    /// largest configured range that fits.
    pub fn set_max_voice_range(
        &mut self,
        id: PlayerId,
        max: Option<f32>,
    ) -> Result<(), ServerError> {
        self.player_mut(id)?.max_voice_range = max;

        let Some(max) = max else {
            return Ok(());
        };
        let current = self.current_voice_range(id);
        if current <= max + RANGE_EPSILON {
            return Ok(());
        }

        let ranges = &self.config.voice_range.ranges;
        let capped = ranges
            .iter()
            .copied()
            .filter(|range| *range <= max + RANGE_EPSILON)
            .fold(None, |best: Option<f32>, range| {
                Some(best.map_or(range, |b| b.max(range)))
            })
            .unwrap_or_else(|| ranges.iter().copied().fold(f32::INFINITY, f32::min));

        self.state
            .set(StateOwner::Player(id), StateValue::VoiceRange(capped));
        self.flush_state();
        Ok(())
    }

    pub fn set_global_error_level(&mut self, level: f32) {
        self.state
            .set(StateOwner::Global, StateValue::GlobalErrorLevel(level));
        self.flush_state();
    }

    /// Pairs every listed player as transceivers of one intercom.
    pub fn change_intercom_state(
        &mut self,
        players: &[PlayerId],
        active: bool,
    ) -> Result<(), ServerError> {
        let engine_client_ids = players
            .iter()
            .map(|id| self.ready_engine_id(*id))
            .collect::<Result<Vec<_>, _>>()?;
        if engine_client_ids.len() < 2 {
            return Err(ServerError::Unchanged);
        }

        self.send(
            Recipient::Players(players.to_vec()),
            ServerEvent::Intercom {
                active,
                engine_client_ids,
            },
        );
        Ok(())
    }

    pub(crate) fn send(&mut self, recipient: Recipient, event: ServerEvent) {
        self.outbound.push_back(Outbound { recipient, event });
    }

    pub(crate) fn send_to(&mut self, id: PlayerId, event: ServerEvent) {
        self.send(Recipient::Player(id), event);
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Result<&mut VoicePlayer, ServerError> {
        self.players
            .get_mut(id)
            .ok_or(ServerError::UnknownPlayer(id))
    }

    pub(crate) fn player_ref(&self, id: PlayerId) -> Result<&VoicePlayer, ServerError> {
        self.players.get(id).ok_or(ServerError::UnknownPlayer(id))
    }

    pub(crate) fn ready_engine_id(&self, id: PlayerId) -> Result<EngineClientId, ServerError> {
        self.player_ref(id)?
            .engine_client_id
            .ok_or(ServerError::NotReady(id))
    }

    /// Broadcasts every replicated change made since the last flush.
    pub(crate) fn flush_state(&mut self) {
        if !self.state.has_pending_changes() {
            return;
        }
        let changes: Vec<_> = self.state.drain_changes().collect();
        for change in changes {
            self.send(
                Recipient::All,
                ServerEvent::StateChanged {
                    owner: change.owner,
                    value: change.value,
                },
            );
        }
    }

    fn engine_ready(
        &mut self,
        id: PlayerId,
        engine_client_id: EngineClientId,
    ) -> Result<(), ServerError> {
        let player = self.player_mut(id)?;
        let reconnect = player.engine_client_id.replace(engine_client_id).is_some();
        log::info!(
            "Player {} is voice client {} (reconnect: {})",
            id,
            engine_client_id,
            reconnect
        );

        let ready = self.players.ready_ids();
        let roster: Vec<_> = ready.iter().filter_map(|p| self.roster_entry(*p)).collect();
        self.send_to(id, ServerEvent::RosterAdd { players: roster });

        let others: Vec<_> = ready.into_iter().filter(|p| *p != id).collect();
        if let Some(entry) = self.roster_entry(id)
            && !others.is_empty()
        {
            self.send(
                Recipient::Players(others),
                ServerEvent::RosterAdd {
                    players: vec![entry],
                },
            );
        }
        Ok(())
    }

    fn roster_entry(&self, id: PlayerId) -> Option<RosterEntry> {
        let player = self.players.get(id)?;
        Some(RosterEntry {
            id,
            engine_client_id: player.engine_client_id?,
            muted_on_phone: player.phone.muted_on_phone,
            state: self.state.snapshot(id),
        })
    }

    fn current_voice_range(&self, id: PlayerId) -> f32 {
        self.state
            .voice_range(id)
            .unwrap_or_else(|| self.config.voice_range.default_range())
    }

    fn change_voice_range(&mut self, id: PlayerId, range: f32) -> Result<(), ServerError> {
        let max = self.player_ref(id)?.max_voice_range;
        let listed = self
            .config
            .voice_range
            .ranges
            .iter()
            .any(|allowed| (allowed - range).abs() < RANGE_EPSILON);
        let within_cap = max.is_none_or(|max| range <= max + RANGE_EPSILON);

        if !listed || !within_cap {
            log::warn!("Player {} asked for voice range {}", id, range);
            let current = self.current_voice_range(id);
            self.send_to(
                id,
                ServerEvent::StateChanged {
                    owner: StateOwner::Player(id),
                    value: StateValue::VoiceRange(current),
                },
            );
            return Err(ServerError::InvalidVoiceRange(range));
        }

        self.state
            .set(StateOwner::Player(id), StateValue::VoiceRange(range));
        Ok(())
    }

    /// Replicates the effective mute flag and shuts down whatever a muted
    /// player must not keep transmitting.
    fn refresh_mute(&mut self, id: PlayerId) {
        let Some(player) = self.players.get(id) else {
            return;
        };
        let muted = player.is_muted();
        self.state
            .set(StateOwner::Player(id), StateValue::ForceMuted(muted));

        if muted {
            self.stop_all_transmissions(id);
            if self.state.megaphone(id).is_some() {
                self.state
                    .set(StateOwner::Player(id), StateValue::Megaphone(None));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> VoiceServer {
        let mut counter = 0;
        VoiceServer::with_names(VoiceConfig::default(), move |_: usize| {
            counter += 1;
            format!("n{}", counter)
        })
    }

    fn ready(server: &mut VoiceServer, id: PlayerId) {
        server.player_joined(id).unwrap();
        server
            .handle_client_event(
                id,
                ClientEvent::EngineReady {
                    engine_client_id: id * 100,
                },
            )
            .unwrap();
        server.drain_outbound().for_each(drop);
    }

    #[test]
    fn join_sends_init_with_generated_name() {
        let mut server = server();
        server.player_joined(1).unwrap();

        let outbound: Vec<_> = server.drain_outbound().collect();
        assert_eq!(
            outbound,
            vec![Outbound {
                recipient: Recipient::Player(1),
                event: ServerEvent::Init {
                    ingame_name: "[YACA] n1".to_string()
                }
            }]
        );
        assert!(matches!(
            server.player_joined(1),
            Err(ServerError::AlreadyJoined(1))
        ));
    }

    #[test]
    fn events_from_unknown_players_are_rejected() {
        let mut server = server();
        let result = server.handle_client_event(9, ClientEvent::TalkState { talking: true });
        assert!(matches!(result, Err(ServerError::UnknownPlayer(9))));
        assert_eq!(server.drain_outbound().count(), 0);
    }

    #[test]
    fn talk_state_is_replicated() {
        let mut server = server();
        ready(&mut server, 1);

        server
            .handle_client_event(1, ClientEvent::TalkState { talking: true })
            .unwrap();
        let outbound: Vec<_> = server.drain_outbound().collect();
        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound[0].recipient, Recipient::All);
        assert_eq!(
            outbound[0].event,
            ServerEvent::StateChanged {
                owner: StateOwner::Player(1),
                value: StateValue::Talking(true)
            }
        );

        // Same value again: nothing to replicate.
        server
            .handle_client_event(1, ClientEvent::TalkState { talking: true })
            .unwrap();
        assert_eq!(server.drain_outbound().count(), 0);
    }

    #[test]
    fn max_voice_range_caps_current_range() {
        let mut server = server();
        ready(&mut server, 1);
        server
            .handle_client_event(1, ClientEvent::ChangeVoiceRange { range: 30.0 })
            .unwrap();

        server.set_max_voice_range(1, Some(18.0)).unwrap();
        assert_eq!(server.state().voice_range(1), Some(15.0));

        let result = server.handle_client_event(1, ClientEvent::ChangeVoiceRange { range: 20.0 });
        assert!(matches!(result, Err(ServerError::InvalidVoiceRange(_))));
        assert_eq!(server.state().voice_range(1), Some(15.0));
    }

    #[test]
    fn global_error_level_is_broadcast() {
        let mut server = server();
        server.set_global_error_level(0.3);

        let outbound: Vec<_> = server.drain_outbound().collect();
        assert_eq!(
            outbound[0].event,
            ServerEvent::StateChanged {
                owner: StateOwner::Global,
                value: StateValue::GlobalErrorLevel(0.3)
            }
        );
    }
}
