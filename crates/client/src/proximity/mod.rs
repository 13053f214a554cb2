mod muffle;

use std::collections::{BTreeMap, BTreeSet, HashMap};

pub use muffle::{Occupancy, muffle_intensity};

use yaca::geometry::{direction_from_heading, direction_from_rotation};
use yaca::{
    ClientEvent, CommDevice, CommDeviceMode, CommDeviceType, EngineClientId, HearNearbyMode,
    PlayerEntry, PlayerFrame, PlayerId, VehicleInfo,
};

use crate::context::ClientContext;
use crate::phone::PhoneView;

/// Per-tick resolution of who the local player hears and how. The snapshot
/// is rebuilt from scratch every tick; only the overlay memberships carry
/// over so they can be diffed.
#[derive(Debug, Default)]
pub struct ProximityEngine {
    spectating: Option<PlayerId>,
    speaker_applied: HashMap<PlayerId, EngineClientId>,
    speaker_listeners: BTreeSet<PlayerId>,
    nearby: BTreeSet<PlayerId>,
}

struct Overlay {
    member: PlayerId,
    entry: PlayerEntry,
}

impl ProximityEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_spectating(&mut self, target: Option<PlayerId>) {
        self.spectating = target;
    }

    pub fn spectating(&self) -> Option<PlayerId> {
        self.spectating
    }

    /// Members currently injected at a nearby phone speaker.
    pub fn speaker_applied(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.speaker_applied.keys().copied()
    }

    pub fn speaker_listeners(&self) -> &BTreeSet<PlayerId> {
        &self.speaker_listeners
    }

    pub fn nearby(&self) -> &BTreeSet<PlayerId> {
        &self.nearby
    }

    /// Forgets everything carried between ticks. The engine side is gone
    /// when this is called, so nothing is torn down explicitly.
    pub fn reset(&mut self) {
        self.speaker_applied.clear();
        self.speaker_listeners.clear();
        self.nearby.clear();
    }

    pub fn resolve(&mut self, ctx: &mut ClientContext, phone: &PhoneView) -> Option<PlayerFrame> {
        let local_id = ctx.local_id;
        // Not joined yet.
        let local_muted = ctx.roster.get(local_id)?.force_muted;

        let (observer_id, observer) = match self
            .spectating
            .and_then(|target| ctx.world.ped(target).map(|ped| (target, ped)))
        {
            Some(spectated) => spectated,
            None => (local_id, ctx.world.ped(local_id)?),
        };
        let observer_vehicle = observer
            .seat
            .and_then(|seat| ctx.world.vehicle(seat.vehicle));
        let observer_occupancy = Occupancy {
            room_key: observer.room_key,
            vehicle: observer_vehicle.as_ref(),
        };

        let config = &ctx.config;
        let use_whisper = config.use_whisper();
        let default_range = config.voice_range.default_range();
        let max_speaker_range = config.phone.max_phone_speaker_range;
        let relay_nearby = !phone.muted_on_phone
            && match config.phone.hear_players_nearby {
                HearNearbyMode::Off => false,
                HearNearbyMode::PhoneSpeaker => phone.in_call && phone.speaker_enabled,
                HearNearbyMode::Always => phone.in_call,
            };
        let emit_speaker = use_whisper && phone.in_call && phone.speaker_enabled;

        let mut snapshot: BTreeMap<PlayerId, PlayerEntry> = BTreeMap::new();
        let mut overlays: Vec<Overlay> = Vec::new();
        let mut nearby = BTreeSet::new();
        let mut speaker_listeners = BTreeSet::new();

        for id in ctx.world.players_in_scope() {
            if id == local_id {
                continue;
            }
            let Some(participant) = ctx.roster.get(id) else {
                continue;
            };
            let Some(ped) = ctx.world.ped(id) else {
                continue;
            };
            let vehicle: Option<VehicleInfo> = match ped.seat {
                Some(seat) => match ctx.world.vehicle(seat.vehicle) {
                    Some(vehicle) => Some(vehicle),
                    None => {
                        log::debug!("Skipping player {}, vehicle {} is gone", id, seat.vehicle);
                        continue;
                    }
                },
                None => None,
            };

            let distance = observer.position.distance(ped.position);
            let direction = direction_from_heading(ped.heading);
            let range = participant.voice_range.unwrap_or(default_range);
            let muffle = muffle_intensity(
                &config.muffling,
                &observer_occupancy,
                &Occupancy {
                    room_key: ped.room_key,
                    vehicle: vehicle.as_ref(),
                },
                ctx.state.megaphone(id).is_some(),
                || ctx.world.has_clear_line_of_sight(observer_id, id),
            );

            snapshot.insert(
                id,
                PlayerEntry {
                    client_id: participant.engine_client_id,
                    position: ped.position.into(),
                    direction: direction.into(),
                    range,
                    is_underwater: ped.is_underwater,
                    muffle_intensity: muffle,
                    is_muted: participant.force_muted,
                },
            );

            if relay_nearby && !participant.force_muted && distance <= range {
                nearby.insert(id);
            }

            if distance > max_speaker_range {
                continue;
            }

            if emit_speaker {
                speaker_listeners.insert(id);
            }

            if !use_whisper {
                for &member in &participant.phone_call_members {
                    if member == id || member == local_id {
                        continue;
                    }
                    let Some(engine_client_id) = ctx.roster.engine_id(member) else {
                        continue;
                    };
                    overlays.push(Overlay {
                        member,
                        entry: PlayerEntry {
                            client_id: engine_client_id,
                            position: ped.position.into(),
                            direction: direction.into(),
                            range: max_speaker_range,
                            is_underwater: ped.is_underwater,
                            muffle_intensity: muffle,
                            is_muted: false,
                        },
                    });
                }
            }
        }

        let own_engine_id = ctx.engine_client_id;
        let mut applied = HashMap::new();
        for Overlay { member, entry } in overlays {
            applied.insert(member, entry.client_id);
            snapshot.insert(member, entry);
        }

        for (member, engine_client_id) in &applied {
            if !self.speaker_applied.contains_key(member) {
                ctx.outbox
                    .send_engine(speaker_device(true, own_engine_id, *engine_client_id));
            }
        }

        if speaker_listeners != self.speaker_listeners {
            let (enable, disable) = diff(&self.speaker_listeners, &speaker_listeners);
            ctx.outbox
                .send_server(ClientEvent::PhoneSpeakerEmit { enable, disable });
            self.speaker_listeners = speaker_listeners;
        }

        if nearby != self.nearby {
            let (add, remove) = diff(&self.nearby, &nearby);
            ctx.outbox
                .send_server(ClientEvent::PhoneHearNearby { add, remove });
            self.nearby = nearby;
        }

        let frame = PlayerFrame {
            player_direction: direction_from_rotation(ctx.world.camera_rotation()).into(),
            player_position: observer.position.into(),
            player_range: ctx.local_voice_range(),
            player_is_underwater: observer.is_underwater,
            player_is_muted: local_muted,
            players_list: snapshot.into_values().collect(),
        };
        ctx.outbox.send_engine(frame.clone());

        let mut stale: Vec<_> = self
            .speaker_applied
            .iter()
            .filter(|(member, _)| !applied.contains_key(member))
            .map(|(_, engine_client_id)| *engine_client_id)
            .collect();
        stale.sort_unstable();
        for engine_client_id in stale {
            ctx.outbox
                .send_engine(speaker_device(false, own_engine_id, engine_client_id));
        }
        self.speaker_applied = applied;

        Some(frame)
    }
}

fn speaker_device(
    on: bool,
    own: Option<EngineClientId>,
    member: EngineClientId,
) -> CommDevice {
    CommDevice::new(CommDeviceType::PhoneSpeaker, on)
        .own(own, CommDeviceMode::Receiver)
        .others([member], CommDeviceMode::Sender)
}

fn diff(previous: &BTreeSet<PlayerId>, current: &BTreeSet<PlayerId>) -> (Vec<PlayerId>, Vec<PlayerId>) {
    (
        current.difference(previous).copied().collect(),
        previous.difference(current).copied().collect(),
    )
}
