use std::collections::{BTreeMap, BTreeSet};

use yaca::{CommDevice, CommDeviceMode, CommDeviceType, EngineClientId, PlayerId};

use crate::context::{ClientContext, ClientNotice};

/// What the proximity pass needs to know about the local player's phone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhoneView {
    pub in_call: bool,
    pub muted_on_phone: bool,
    pub speaker_enabled: bool,
}

#[derive(Debug, Clone, Copy)]
struct ActiveCall {
    engine_client_id: EngineClientId,
    device: CommDeviceType,
}

#[derive(Debug, Default)]
pub struct PhoneModule {
    calls: BTreeMap<PlayerId, ActiveCall>,
    muted_on_phone: bool,
    speaker_targets: BTreeSet<EngineClientId>,
    nearby_relayed: BTreeSet<EngineClientId>,
    partner_speakers: BTreeSet<PlayerId>,
}

impl PhoneModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self, ctx: &ClientContext) -> PhoneView {
        PhoneView {
            in_call: !self.calls.is_empty(),
            muted_on_phone: self.muted_on_phone,
            speaker_enabled: !ctx.state.phone_speaker(ctx.local_id).is_empty(),
        }
    }

    pub fn in_call_with(&self, partner: PlayerId) -> bool {
        self.calls.contains_key(&partner)
    }

    pub fn partners(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.calls.keys().copied()
    }

    pub fn muted_on_phone(&self) -> bool {
        self.muted_on_phone
    }

    pub fn speaker_targets(&self) -> &BTreeSet<EngineClientId> {
        &self.speaker_targets
    }

    pub fn nearby_relayed(&self) -> &BTreeSet<EngineClientId> {
        &self.nearby_relayed
    }

    pub fn handle_call(
        &mut self,
        ctx: &mut ClientContext,
        partner: PlayerId,
        engine_client_id: EngineClientId,
        active: bool,
        historical: bool,
    ) {
        if active {
            let device = if historical {
                CommDeviceType::PhoneHistorical
            } else {
                CommDeviceType::Phone
            };
            let call = ActiveCall {
                engine_client_id,
                device,
            };
            self.calls.insert(partner, call);

            let partner_muted = ctx
                .roster
                .get(partner)
                .is_some_and(|participant| participant.muted_on_phone);
            let frame = call_device(ctx, call, !partner_muted);
            ctx.outbox.send_engine(frame);
            return;
        }

        let Some(call) = self.calls.remove(&partner) else {
            return;
        };
        let frame = call_device(ctx, call, false);
        ctx.outbox.send_engine(frame);

        if let Some(participant) = ctx.roster.get_mut(partner) {
            participant.muted_on_phone = false;
        }
        self.partner_speakers.remove(&partner);

        if self.calls.is_empty() {
            self.muted_on_phone = false;
            self.tear_down_relays(ctx);
        }
    }

    pub fn handle_muted(&mut self, ctx: &mut ClientContext, player: PlayerId, muted: bool) {
        if player == ctx.local_id {
            self.muted_on_phone = muted;
            return;
        }

        if let Some(participant) = ctx.roster.get_mut(player) {
            participant.muted_on_phone = muted;
        }
        if let Some(call) = self.calls.get(&player).copied() {
            let frame = call_device(ctx, call, !muted);
            ctx.outbox.send_engine(frame);
        }
    }

    pub fn handle_speaker_changed(
        &mut self,
        ctx: &mut ClientContext,
        speaker: PlayerId,
        enabled: bool,
        members: &[PlayerId],
    ) {
        if speaker == ctx.local_id {
            return;
        }
        if !members.contains(&ctx.local_id) && enabled {
            log::debug!("Speaker update from {} does not include us", speaker);
        }

        let changed = if enabled {
            self.partner_speakers.insert(speaker)
        } else {
            self.partner_speakers.remove(&speaker)
        };
        if changed {
            ctx.outbox
                .notice(ClientNotice::PhoneSpeakerPartnerChanged { speaker, enabled });
        }
    }

    /// Listeners standing next to a partner's speaker who should hear us
    /// directly.
    pub fn handle_speaker_listeners(
        &mut self,
        ctx: &mut ClientContext,
        active: bool,
        engine_client_ids: &[EngineClientId],
    ) {
        let changed: Vec<_> = engine_client_ids
            .iter()
            .copied()
            .filter(|id| {
                if active {
                    self.speaker_targets.insert(*id)
                } else {
                    self.speaker_targets.remove(id)
                }
            })
            .collect();
        if changed.is_empty() {
            return;
        }

        ctx.outbox.send_engine(
            CommDevice::new(CommDeviceType::PhoneSpeaker, active)
                .own(ctx.engine_client_id, CommDeviceMode::Sender)
                .others(changed, CommDeviceMode::Receiver),
        );
    }

    /// Players standing next to a call partner, relayed into the call.
    pub fn handle_nearby(
        &mut self,
        ctx: &mut ClientContext,
        active: bool,
        engine_client_ids: &[EngineClientId],
    ) {
        let changed: Vec<_> = engine_client_ids
            .iter()
            .copied()
            .filter(|id| {
                if active {
                    self.nearby_relayed.insert(*id)
                } else {
                    self.nearby_relayed.remove(id)
                }
            })
            .collect();
        if changed.is_empty() {
            return;
        }

        ctx.outbox.send_engine(
            CommDevice::new(CommDeviceType::Phone, active)
                .own(ctx.engine_client_id, CommDeviceMode::Receiver)
                .others(changed, CommDeviceMode::Sender),
        );
    }

    pub fn participant_left(&mut self, ctx: &mut ClientContext, player: PlayerId) {
        if let Some(engine_client_id) = self.calls.get(&player).map(|call| call.engine_client_id) {
            self.handle_call(ctx, player, engine_client_id, false, false);
        }
        self.partner_speakers.remove(&player);
    }

    /// The engine forgot every relay route with its session. Calls survive.
    pub fn engine_lost(&mut self) {
        self.speaker_targets.clear();
        self.nearby_relayed.clear();
    }

    /// Reopens call devices on a fresh engine session.
    pub fn reapply_calls(&self, ctx: &mut ClientContext) {
        for (partner, call) in &self.calls {
            let partner_muted = ctx
                .roster
                .get(*partner)
                .is_some_and(|participant| participant.muted_on_phone);
            let frame = call_device(ctx, *call, !partner_muted);
            ctx.outbox.send_engine(frame);
        }
    }

    fn tear_down_relays(&mut self, ctx: &mut ClientContext) {
        let targets = std::mem::take(&mut self.speaker_targets);
        if !targets.is_empty() {
            ctx.outbox.send_engine(
                CommDevice::new(CommDeviceType::PhoneSpeaker, false)
                    .own(ctx.engine_client_id, CommDeviceMode::Sender)
                    .others(targets, CommDeviceMode::Receiver),
            );
        }

        let relayed = std::mem::take(&mut self.nearby_relayed);
        if !relayed.is_empty() {
            ctx.outbox.send_engine(
                CommDevice::new(CommDeviceType::Phone, false)
                    .own(ctx.engine_client_id, CommDeviceMode::Receiver)
                    .others(relayed, CommDeviceMode::Sender),
            );
        }
    }
}

fn call_device(ctx: &ClientContext, call: ActiveCall, on: bool) -> CommDevice {
    CommDevice::new(call.device, on)
        .own(ctx.engine_client_id, CommDeviceMode::Receiver)
        .others([call.engine_client_id], CommDeviceMode::Sender)
}
