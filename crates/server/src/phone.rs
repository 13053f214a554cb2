use std::collections::{BTreeMap, BTreeSet, HashMap};

use yaca::{EngineClientId, PlayerId, ServerEvent, StateOwner, StateValue};

use crate::error::ServerError;
use crate::events::Recipient;
use crate::server::VoiceServer;

/// Symmetric call edges. A player may be in several calls at once.
#[derive(Debug, Default)]
pub struct CallGraph {
    edges: HashMap<PlayerId, BTreeSet<PlayerId>>,
}

impl CallGraph {
    pub fn connect(&mut self, a: PlayerId, b: PlayerId) -> bool {
        let added = self.edges.entry(a).or_default().insert(b);
        self.edges.entry(b).or_default().insert(a);
        added
    }

    pub fn disconnect(&mut self, a: PlayerId, b: PlayerId) -> bool {
        let removed = self.remove_edge(a, b);
        self.remove_edge(b, a);
        removed
    }

    pub fn in_call(&self, a: PlayerId, b: PlayerId) -> bool {
        self.edges.get(&a).is_some_and(|partners| partners.contains(&b))
    }

    pub fn partners(&self, player: PlayerId) -> Vec<PlayerId> {
        self.edges
            .get(&player)
            .map(|partners| partners.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn has_calls(&self, player: PlayerId) -> bool {
        self.edges.contains_key(&player)
    }

    /// Drops every edge of a player and returns the former partners.
    pub fn remove_player(&mut self, player: PlayerId) -> Vec<PlayerId> {
        let partners: Vec<_> = self
            .edges
            .remove(&player)
            .map(|partners| partners.into_iter().collect())
            .unwrap_or_default();
        for partner in &partners {
            self.remove_edge(*partner, player);
        }
        partners
    }

    fn remove_edge(&mut self, from: PlayerId, to: PlayerId) -> bool {
        let Some(partners) = self.edges.get_mut(&from) else {
            return false;
        };
        let removed = partners.remove(&to);
        if partners.is_empty() {
            self.edges.remove(&from);
        }
        removed
    }
}

/// Which call members were told to transmit straight to which listeners
/// around a phone speaker.
#[derive(Debug, Default)]
pub struct SpeakerEmissions {
    emitted: HashMap<PlayerId, BTreeMap<PlayerId, BTreeSet<PlayerId>>>,
}

impl SpeakerEmissions {
    /// Returns the members that were not already told about this listener.
    pub fn record(&mut self, speaker: PlayerId, listener: PlayerId, members: &[PlayerId]) -> Vec<PlayerId> {
        let told = self
            .emitted
            .entry(speaker)
            .or_default()
            .entry(listener)
            .or_default();
        members.iter().copied().filter(|m| told.insert(*m)).collect()
    }

    /// Forgets one listener; returns the members that had been told.
    pub fn revoke(&mut self, speaker: PlayerId, listener: PlayerId) -> Vec<PlayerId> {
        let Some(listeners) = self.emitted.get_mut(&speaker) else {
            return Vec::new();
        };
        let told = listeners.remove(&listener).unwrap_or_default();
        if listeners.is_empty() {
            self.emitted.remove(&speaker);
        }
        told.into_iter().collect()
    }

    /// Forgets every listener of a speaker, as (listener, told members).
    pub fn revoke_speaker(&mut self, speaker: PlayerId) -> Vec<(PlayerId, Vec<PlayerId>)> {
        self.emitted
            .remove(&speaker)
            .map(|listeners| {
                listeners
                    .into_iter()
                    .map(|(listener, told)| (listener, told.into_iter().collect()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Stops telling one member about a speaker's listeners; returns those listeners.
    pub fn revoke_member(&mut self, speaker: PlayerId, member: PlayerId) -> Vec<PlayerId> {
        let Some(listeners) = self.emitted.get_mut(&speaker) else {
            return Vec::new();
        };
        let revoked = listeners
            .iter_mut()
            .filter_map(|(listener, told)| told.remove(&member).then_some(*listener))
            .collect();
        listeners.retain(|_, told| !told.is_empty());
        if listeners.is_empty() {
            self.emitted.remove(&speaker);
        }
        revoked
    }

    pub fn listeners(&self, speaker: PlayerId) -> Vec<PlayerId> {
        self.emitted
            .get(&speaker)
            .map(|listeners| listeners.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Removes a player acting as listener everywhere, as (speaker, told members).
    pub fn forget_listener(&mut self, listener: PlayerId) -> Vec<(PlayerId, Vec<PlayerId>)> {
        let mut speakers: Vec<_> = self.emitted.keys().copied().collect();
        speakers.sort_unstable();
        speakers
            .into_iter()
            .filter_map(|speaker| {
                let told = self.revoke(speaker, listener);
                (!told.is_empty()).then_some((speaker, told))
            })
            .collect()
    }
}

/// Players near a caller whose voices are relayed into the caller's calls.
#[derive(Debug, Default)]
pub struct NearbyRelays {
    relayed: HashMap<PlayerId, BTreeSet<PlayerId>>,
}

impl NearbyRelays {
    pub fn add(&mut self, caller: PlayerId, nearby: PlayerId) -> bool {
        self.relayed.entry(caller).or_default().insert(nearby)
    }

    pub fn remove(&mut self, caller: PlayerId, nearby: PlayerId) -> bool {
        let Some(relayed) = self.relayed.get_mut(&caller) else {
            return false;
        };
        let removed = relayed.remove(&nearby);
        if relayed.is_empty() {
            self.relayed.remove(&caller);
        }
        removed
    }

    pub fn take(&mut self, caller: PlayerId) -> Vec<PlayerId> {
        self.relayed
            .remove(&caller)
            .map(|relayed| relayed.into_iter().collect())
            .unwrap_or_default()
    }

    pub fn relayed(&self, caller: PlayerId) -> Vec<PlayerId> {
        self.relayed
            .get(&caller)
            .map(|relayed| relayed.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drops a player from every caller's relay set; returns the callers.
    pub fn forget(&mut self, nearby: PlayerId) -> Vec<PlayerId> {
        let mut callers: Vec<_> = self
            .relayed
            .iter()
            .filter(|(_, relayed)| relayed.contains(&nearby))
            .map(|(caller, _)| *caller)
            .collect();
        callers.sort_unstable();
        for caller in &callers {
            self.remove(*caller, nearby);
        }
        callers
    }
}

impl VoiceServer {
    /// Starts or ends a regular call between two players.
    pub fn call_player(&mut self, a: PlayerId, b: PlayerId, active: bool) -> Result<(), ServerError> {
        self.set_call(a, b, active, false)
    }

    /// Same as [`VoiceServer::call_player`] with the old-phone sound effect.
    pub fn call_player_old_effect(
        &mut self,
        a: PlayerId,
        b: PlayerId,
        active: bool,
    ) -> Result<(), ServerError> {
        self.set_call(a, b, active, true)
    }

    pub fn mute_on_phone(&mut self, id: PlayerId, muted: bool) -> Result<(), ServerError> {
        if self.player_ref(id)?.phone.muted_on_phone == muted {
            return Err(ServerError::Unchanged);
        }
        self.set_muted_on_phone(id, muted);
        Ok(())
    }

    pub fn enable_phone_speaker(&mut self, id: PlayerId, enabled: bool) -> Result<(), ServerError> {
        let player = self.player_mut(id)?;
        if player.phone.speaker_enabled == enabled {
            return Err(ServerError::Unchanged);
        }
        player.phone.speaker_enabled = enabled;
        log::debug!("Player {} phone speaker: {}", id, enabled);
        self.refresh_speaker(id);
        self.flush_state();
        Ok(())
    }

    /// Listeners around a speaker phone changed; call members transmit to
    /// them directly.
    pub(crate) fn phone_speaker_emit(
        &mut self,
        id: PlayerId,
        enable: &[PlayerId],
        disable: &[PlayerId],
    ) -> Result<(), ServerError> {
        let player = self.player_ref(id)?;
        if !self.config.use_whisper() || !player.phone.speaker_enabled || !self.calls.has_calls(id) {
            return Err(ServerError::SpeakerOff);
        }
        let members = self.calls.partners(id);

        let mut grouped: BTreeMap<PlayerId, Vec<EngineClientId>> = BTreeMap::new();
        for listener in enable {
            if *listener == id || members.contains(listener) {
                continue;
            }
            let Some(engine_client_id) = self.players.engine_id(*listener) else {
                continue;
            };
            for member in self.speakers.record(id, *listener, &members) {
                grouped.entry(member).or_default().push(engine_client_id);
            }
        }
        for (member, engine_client_ids) in grouped {
            self.send_to(
                member,
                ServerEvent::PhoneSpeakerListeners {
                    active: true,
                    engine_client_ids,
                },
            );
        }

        let mut grouped: BTreeMap<PlayerId, Vec<EngineClientId>> = BTreeMap::new();
        for listener in disable {
            let told = self.speakers.revoke(id, *listener);
            let Some(engine_client_id) = self.players.engine_id(*listener) else {
                continue;
            };
            for member in told {
                grouped.entry(member).or_default().push(engine_client_id);
            }
        }
        for (member, engine_client_ids) in grouped {
            self.send_to(
                member,
                ServerEvent::PhoneSpeakerListeners {
                    active: false,
                    engine_client_ids,
                },
            );
        }
        Ok(())
    }

    /// Nearby players around a caller changed; their voices are relayed to
    /// every call partner.
    pub(crate) fn phone_hear_nearby(
        &mut self,
        id: PlayerId,
        add: &[PlayerId],
        remove: &[PlayerId],
    ) -> Result<(), ServerError> {
        self.player_ref(id)?;
        let partners = self.calls.partners(id);

        let mut added = Vec::new();
        if !add.is_empty() {
            if partners.is_empty() {
                return Err(ServerError::NoCall(id));
            }
            for nearby in add {
                let Some(player) = self.players.get(*nearby) else {
                    continue;
                };
                if *nearby == id || player.is_muted() {
                    continue;
                }
                let Some(engine_client_id) = player.engine_client_id else {
                    continue;
                };
                if self.nearby.add(id, *nearby) {
                    added.push(engine_client_id);
                }
            }
        }

        let removed: Vec<_> = remove
            .iter()
            .filter(|nearby| self.nearby.remove(id, **nearby))
            .filter_map(|nearby| self.players.engine_id(*nearby))
            .collect();

        if added.is_empty() && removed.is_empty() {
            return Err(ServerError::Unchanged);
        }
        if !partners.is_empty() {
            for (active, engine_client_ids) in [(true, added), (false, removed)] {
                if engine_client_ids.is_empty() {
                    continue;
                }
                self.send(
                    Recipient::Players(partners.clone()),
                    ServerEvent::PhoneNearby {
                        active,
                        engine_client_ids,
                    },
                );
            }
        }
        Ok(())
    }

    /// Tears down every phone relation of a departed player.
    pub(crate) fn release_phone(&mut self, id: PlayerId, engine_client_id: Option<EngineClientId>) {
        let partners = self.calls.remove_player(id);
        for partner in &partners {
            self.clear_phone_mute(*partner);
        }

        // Voices the departed relayed into its calls.
        let relayed: Vec<_> = self
            .nearby
            .take(id)
            .into_iter()
            .filter_map(|nearby| self.players.engine_id(nearby))
            .collect();
        if !relayed.is_empty() && !partners.is_empty() {
            self.send(
                Recipient::Players(partners.clone()),
                ServerEvent::PhoneNearby {
                    active: false,
                    engine_client_ids: relayed,
                },
            );
        }

        // The departed itself relayed into other calls.
        let callers = self.nearby.forget(id);
        self.revoke_all_listeners(id);
        let listened = self.speakers.forget_listener(id);
        if let Some(engine_client_id) = engine_client_id {
            for caller in callers {
                let caller_partners = self.calls.partners(caller);
                if caller_partners.is_empty() {
                    continue;
                }
                self.send(
                    Recipient::Players(caller_partners),
                    ServerEvent::PhoneNearby {
                        active: false,
                        engine_client_ids: vec![engine_client_id],
                    },
                );
            }
            for member in listened.into_iter().flat_map(|(_, told)| told) {
                self.send_to(
                    member,
                    ServerEvent::PhoneSpeakerListeners {
                        active: false,
                        engine_client_ids: vec![engine_client_id],
                    },
                );
            }
        }

        for partner in partners {
            self.refresh_speaker(partner);
        }
    }

    fn set_call(
        &mut self,
        a: PlayerId,
        b: PlayerId,
        active: bool,
        historical: bool,
    ) -> Result<(), ServerError> {
        if a == b {
            return Err(ServerError::SelfCall);
        }
        let engine_a = self.ready_engine_id(a)?;
        let engine_b = self.ready_engine_id(b)?;

        if active {
            if !self.calls.connect(a, b) {
                return Err(ServerError::Unchanged);
            }
            log::info!("Call started between {} and {}", a, b);
        } else {
            if !self.calls.in_call(a, b) {
                return Err(ServerError::NotInCall(a, b));
            }
            // Ending a call always unmutes both sides.
            self.clear_phone_mute(a);
            self.clear_phone_mute(b);
            self.calls.disconnect(a, b);
            log::info!("Call ended between {} and {}", a, b);
        }

        for (to, partner, engine_client_id) in [(a, b, engine_b), (b, a, engine_a)] {
            self.send_to(
                to,
                ServerEvent::PhoneCall {
                    partner,
                    engine_client_id,
                    active,
                    historical,
                },
            );
        }

        if !active {
            self.drop_relays_between(a, b);
            self.drop_relays_between(b, a);
        }
        self.refresh_speaker(a);
        self.refresh_speaker(b);
        self.flush_state();
        Ok(())
    }

    /// The caller's relayed neighbours are no longer audible to a former partner.
    fn drop_relays_between(&mut self, caller: PlayerId, former: PlayerId) {
        let relayed = if self.calls.has_calls(caller) {
            self.nearby.relayed(caller)
        } else {
            self.nearby.take(caller)
        };
        let engine_client_ids: Vec<_> = relayed
            .into_iter()
            .filter_map(|nearby| self.players.engine_id(nearby))
            .collect();
        if engine_client_ids.is_empty() {
            return;
        }
        self.send_to(
            former,
            ServerEvent::PhoneNearby {
                active: false,
                engine_client_ids,
            },
        );
    }

    fn clear_phone_mute(&mut self, id: PlayerId) {
        let muted = self
            .players
            .get(id)
            .is_some_and(|p| p.phone.muted_on_phone);
        if muted {
            self.set_muted_on_phone(id, false);
        }
    }

    fn set_muted_on_phone(&mut self, id: PlayerId, muted: bool) {
        let Some(player) = self.players.get_mut(id) else {
            return;
        };
        player.phone.muted_on_phone = muted;
        self.send(Recipient::All, ServerEvent::PhoneMuted { player: id, muted });
    }

    /// Brings the replicated speaker member list in line with the call graph.
    fn refresh_speaker(&mut self, speaker: PlayerId) {
        let Some(player) = self.players.get(speaker) else {
            return;
        };
        let members = if player.phone.speaker_enabled {
            self.calls.partners(speaker)
        } else {
            Vec::new()
        };
        let previous = self.state.phone_speaker(speaker).to_vec();
        if previous == members {
            return;
        }
        self.state.set(
            StateOwner::Player(speaker),
            StateValue::PhoneSpeaker(members.clone()),
        );

        if !members.is_empty() {
            let mut everyone = vec![speaker];
            everyone.extend(&members);
            self.send(
                Recipient::Players(members.clone()),
                ServerEvent::PhoneSpeakerChanged {
                    speaker,
                    enabled: true,
                    members: everyone,
                },
            );
        }

        let dropped: Vec<_> = previous
            .iter()
            .copied()
            .filter(|member| !members.contains(member))
            .collect();
        for member in &dropped {
            if !self.players.contains(*member) {
                self.speakers.revoke_member(speaker, *member);
                continue;
            }
            self.send_to(
                *member,
                ServerEvent::PhoneSpeakerChanged {
                    speaker,
                    enabled: false,
                    members: Vec::new(),
                },
            );
            let listeners: Vec<_> = self
                .speakers
                .revoke_member(speaker, *member)
                .into_iter()
                .filter_map(|listener| self.players.engine_id(listener))
                .collect();
            if !listeners.is_empty() {
                self.send_to(
                    *member,
                    ServerEvent::PhoneSpeakerListeners {
                        active: false,
                        engine_client_ids: listeners,
                    },
                );
            }
        }

        if members.is_empty() {
            self.revoke_all_listeners(speaker);
            return;
        }

        // Listeners already around the speaker reach newly added members too.
        let listeners = self.speakers.listeners(speaker);
        if listeners.is_empty() {
            return;
        }
        let joined: Vec<_> = members
            .iter()
            .copied()
            .filter(|member| !previous.contains(member))
            .collect();
        for member in joined {
            let engine_client_ids: Vec<_> = listeners
                .iter()
                .filter(|listener| !self.speakers.record(speaker, **listener, &[member]).is_empty())
                .filter_map(|listener| self.players.engine_id(*listener))
                .collect();
            if !engine_client_ids.is_empty() {
                self.send_to(
                    member,
                    ServerEvent::PhoneSpeakerListeners {
                        active: true,
                        engine_client_ids,
                    },
                );
            }
        }
    }

    fn revoke_all_listeners(&mut self, speaker: PlayerId) {
        let mut grouped: BTreeMap<PlayerId, Vec<EngineClientId>> = BTreeMap::new();
        for (listener, told) in self.speakers.revoke_speaker(speaker) {
            let Some(engine_client_id) = self.players.engine_id(listener) else {
                continue;
            };
            for member in told {
                grouped.entry(member).or_default().push(engine_client_id);
            }
        }
        for (member, engine_client_ids) in grouped {
            self.send_to(
                member,
                ServerEvent::PhoneSpeakerListeners {
                    active: false,
                    engine_client_ids,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_edges_are_symmetric() {
        let mut calls = CallGraph::default();
        assert!(calls.connect(1, 2));
        assert!(!calls.connect(2, 1));
        assert!(calls.connect(1, 3));

        assert!(calls.in_call(2, 1));
        assert_eq!(calls.partners(1), vec![2, 3]);

        assert!(calls.disconnect(2, 1));
        assert!(!calls.in_call(1, 2));
        assert!(!calls.has_calls(2));

        assert_eq!(calls.remove_player(3), vec![1]);
        assert!(!calls.has_calls(1));
    }

    #[test]
    fn emissions_report_only_new_members() {
        let mut emissions = SpeakerEmissions::default();
        assert_eq!(emissions.record(1, 5, &[2, 3]), vec![2, 3]);
        assert_eq!(emissions.record(1, 5, &[2, 4]), vec![4]);
        assert_eq!(emissions.listeners(1), vec![5]);

        assert_eq!(emissions.revoke_member(1, 2), vec![5]);
        assert_eq!(emissions.revoke(1, 5), vec![3, 4]);
        assert!(emissions.listeners(1).is_empty());
    }

    #[test]
    fn forgetting_a_listener_reports_each_speaker() {
        let mut emissions = SpeakerEmissions::default();
        emissions.record(1, 9, &[2]);
        emissions.record(3, 9, &[4]);
        emissions.record(3, 8, &[4]);

        assert_eq!(
            emissions.forget_listener(9),
            vec![(1, vec![2]), (3, vec![4])]
        );
        assert_eq!(emissions.listeners(3), vec![8]);
    }

    #[test]
    fn relays_forget_across_callers() {
        let mut relays = NearbyRelays::default();
        assert!(relays.add(1, 7));
        assert!(!relays.add(1, 7));
        relays.add(2, 7);
        relays.add(2, 8);

        assert_eq!(relays.forget(7), vec![1, 2]);
        assert!(relays.relayed(1).is_empty());
        assert_eq!(relays.take(2), vec![8]);
    }
}
