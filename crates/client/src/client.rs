use std::time::Duration;

use yaca::{
    ClientEvent, EngineResponse, InitFrame, PlayerFrame, PlayerId, RangeStep, ServerEvent,
    StateChange, StateField, StateOwner, StateValue, VoiceConfig, VoiceRangeCursor,
};

use crate::animation::{AnimationCommand, AnimationTicket};
use crate::context::{ClientContext, ClientNotice, Localization, NotificationLevel, Outbox};
use crate::dispatcher::{DispatchAction, PluginState, ResponseDispatcher};
use crate::intercom::IntercomModule;
use crate::megaphone::MegaphoneModule;
use crate::phone::PhoneModule;
use crate::proximity::ProximityEngine;
use crate::radio::RadioModule;
use crate::roster::Participant;
use crate::streaming::{AssetStreamer, StreamingError, stream_asset};
use crate::timer::Interval;
use crate::world::WorldQuery;

/// The client side of the voice plugin. Everything runs on the caller's
/// thread: feed it engine messages, server events and frame deltas, then
/// drain the outbox.
pub struct VoiceClient {
    ctx: ClientContext,
    dispatcher: ResponseDispatcher,
    proximity: ProximityEngine,
    radio: RadioModule,
    phone: PhoneModule,
    megaphone: MegaphoneModule,
    intercom: IntercomModule,
    voice_range: VoiceRangeCursor,
    resolution_tick: Option<Interval>,
    ingame_name: Option<String>,
}

impl VoiceClient {
    pub fn new(config: VoiceConfig, local_id: PlayerId, world: impl WorldQuery + 'static) -> Self {
        let ctx = ClientContext::new(config, local_id, Box::new(world));
        Self {
            voice_range: VoiceRangeCursor::new(&ctx.config.voice_range),
            radio: RadioModule::new(ctx.config.radio.default_channel),
            dispatcher: ResponseDispatcher::new(),
            proximity: ProximityEngine::new(),
            phone: PhoneModule::new(),
            megaphone: MegaphoneModule::new(),
            intercom: IntercomModule::new(),
            resolution_tick: None,
            ingame_name: None,
            ctx,
        }
    }

    pub fn with_locale(mut self, locale: impl Localization + 'static) -> Self {
        self.ctx.locale = Box::new(locale);
        self
    }

    pub fn context(&self) -> &ClientContext {
        &self.ctx
    }

    pub fn outbox(&mut self) -> &mut Outbox {
        &mut self.ctx.outbox
    }

    pub fn radio(&self) -> &RadioModule {
        &self.radio
    }

    pub fn phone(&self) -> &PhoneModule {
        &self.phone
    }

    pub fn proximity(&self) -> &ProximityEngine {
        &self.proximity
    }

    pub fn intercom(&self) -> &IntercomModule {
        &self.intercom
    }

    pub fn plugin_state(&self) -> PluginState {
        self.dispatcher.state()
    }

    pub fn is_talking(&self) -> bool {
        self.dispatcher.is_talking()
    }

    pub fn is_ticking(&self) -> bool {
        self.resolution_tick.is_some()
    }

    pub fn current_voice_range(&self) -> f32 {
        self.voice_range.current()
    }

    pub fn megaphone_active(&self) -> bool {
        self.megaphone.is_active(&self.ctx)
    }

    pub fn on_field_change<F>(&mut self, field: StateField, callback: F)
    where
        F: FnMut(StateOwner, &StateValue) + 'static,
    {
        self.ctx.state.on_field_change(field, callback);
    }

    pub fn on_engine_connected(&mut self) {
        self.ctx.outbox.set_engine_open(true);
        self.send_init();
    }

    pub fn on_engine_disconnected(&mut self) {
        self.ctx.outbox.set_engine_open(false);
        self.resolution_tick = None;
        self.radio.disconnect(&mut self.ctx);
        self.proximity.reset();
        self.intercom.reset();
        self.megaphone.reset();
        self.phone.engine_lost();
        self.ctx.engine_client_id = None;

        for action in self.dispatcher.disconnected() {
            self.apply_action(action);
        }
    }

    pub fn handle_engine_message(&mut self, raw: &str) {
        match self.dispatcher.dispatch_raw(raw) {
            Ok(actions) => {
                for action in actions {
                    self.apply_action(action);
                }
            }
            Err(e) => log::error!("Dropping engine message: {}", e),
        }
    }

    pub fn handle_engine_response(&mut self, response: &EngineResponse) {
        match self.dispatcher.dispatch(response) {
            Ok(actions) => {
                for action in actions {
                    self.apply_action(action);
                }
            }
            Err(e) => log::error!("Dropping engine response {:?}: {}", response.code, e),
        }
    }

    pub fn handle_server_event(&mut self, event: ServerEvent) {
        let ctx = &mut self.ctx;
        match event {
            ServerEvent::Init { ingame_name } => {
                self.ingame_name = Some(ingame_name);
                self.send_init();
            }
            ServerEvent::RosterAdd { players } => {
                for entry in players {
                    let mut participant = Participant::new(entry.id, entry.engine_client_id);
                    participant.muted_on_phone = entry.muted_on_phone;
                    ctx.roster.insert(participant);
                    for value in entry.state {
                        ctx.state.set(StateOwner::Player(entry.id), value);
                    }
                }
            }
            ServerEvent::RosterRemove { id } => {
                self.phone.participant_left(ctx, id);
                self.radio.participant_left(ctx, id);
                ctx.roster.remove(id);
                ctx.state.remove_player(id);
            }
            ServerEvent::StateChanged { owner, value } => {
                // Rejected requests echo the unchanged value back.
                if owner == StateOwner::Player(ctx.local_id) {
                    match &value {
                        StateValue::VoiceRange(range) => self.voice_range.sync_to(*range),
                        StateValue::Megaphone(_) => self.megaphone.settle(),
                        _ => {}
                    }
                }
                ctx.state.set(owner, value);
            }
            ServerEvent::RadioFrequencySet { channel, frequency } => {
                self.radio.apply_frequency(ctx, channel, &frequency);
            }
            ServerEvent::RadioMuteSet { channel, muted } => {
                self.radio.apply_muted(ctx, channel, muted);
            }
            ServerEvent::RadioMembersLeft {
                channel,
                engine_client_ids,
            } => {
                self.radio.members_left(ctx, channel, &engine_client_ids);
            }
            ServerEvent::RadioTalking {
                sender,
                engine_client_id,
                channel,
                talking,
                error_level,
            } => {
                self.radio.handle_remote_talking(
                    ctx,
                    sender,
                    engine_client_id,
                    channel,
                    talking,
                    error_level,
                );
            }
            ServerEvent::RadioWhisperTargets {
                channel,
                talking,
                engine_client_ids,
            } => {
                self.radio
                    .handle_whisper_targets(ctx, channel, talking, engine_client_ids);
            }
            ServerEvent::PhoneCall {
                partner,
                engine_client_id,
                active,
                historical,
            } => {
                self.phone
                    .handle_call(ctx, partner, engine_client_id, active, historical);
            }
            ServerEvent::PhoneMuted { player, muted } => {
                self.phone.handle_muted(ctx, player, muted);
            }
            ServerEvent::PhoneSpeakerChanged {
                speaker,
                enabled,
                members,
            } => {
                self.phone
                    .handle_speaker_changed(ctx, speaker, enabled, &members);
            }
            ServerEvent::PhoneSpeakerListeners {
                active,
                engine_client_ids,
            } => {
                self.phone
                    .handle_speaker_listeners(ctx, active, &engine_client_ids);
            }
            ServerEvent::PhoneNearby {
                active,
                engine_client_ids,
            } => {
                self.phone.handle_nearby(ctx, active, &engine_client_ids);
            }
            ServerEvent::Intercom {
                active,
                engine_client_ids,
            } => {
                self.intercom
                    .handle_intercom(ctx, active, &engine_client_ids);
            }
            ServerEvent::Notify { key } => {
                ctx.notify_key(NotificationLevel::Info, &key);
            }
            ServerEvent::Kick { reason } => {
                log::warn!("Kicked by the voice server: {}", reason);
                ctx.outbox.notice(ClientNotice::Kicked(reason));
            }
        }

        self.apply_state_changes();
    }

    /// Advances timers by one frame. Runs the resolution tick when due.
    pub fn update(&mut self, delta: Duration) {
        self.apply_state_changes();
        self.radio.update(&mut self.ctx, delta);

        let due = self.resolution_tick.as_mut().is_some_and(|tick| {
            tick.accumulate(delta);
            tick.consume_all()
        });
        if due {
            self.run_tick();
        }
    }

    /// Runs one resolution pass right away, if the engine session is up.
    pub fn resolve_now(&mut self) -> Option<PlayerFrame> {
        if self.resolution_tick.is_none() {
            return None;
        }
        self.apply_state_changes();
        self.run_tick()
    }

    pub fn change_voice_range(&mut self, step: RangeStep) -> f32 {
        let range = self.voice_range.step(step);
        self.ctx
            .outbox
            .send_server(ClientEvent::ChangeVoiceRange { range });
        range
    }

    pub fn increase_voice_range(&mut self) -> f32 {
        self.change_voice_range(RangeStep::Increase)
    }

    pub fn decrease_voice_range(&mut self) -> f32 {
        self.change_voice_range(RangeStep::Decrease)
    }

    pub fn enable_radio(&mut self, enabled: bool) -> bool {
        self.radio.enable_radio(&mut self.ctx, enabled)
    }

    pub fn change_radio_frequency(&mut self, channel: u8, frequency: &str) -> bool {
        self.radio.change_frequency(&mut self.ctx, channel, frequency)
    }

    /// Retunes the active channel.
    pub fn change_active_radio_frequency(&mut self, frequency: &str) -> bool {
        let channel = self.radio.active_channel();
        self.change_radio_frequency(channel, frequency)
    }

    pub fn mute_radio_channel(&mut self, channel: u8) -> bool {
        self.radio.mute_channel(&mut self.ctx, channel)
    }

    pub fn radio_talking_start(&mut self, talking: bool, channel: u8) -> bool {
        self.radio.radio_talking_start(&mut self.ctx, talking, channel)
    }

    pub fn set_active_radio_channel(&mut self, channel: u8) -> bool {
        self.radio.set_active_channel(&mut self.ctx, channel)
    }

    pub fn set_radio_volume(&mut self, channel: u8, volume: f32) -> bool {
        self.radio.set_volume(&mut self.ctx, channel, volume)
    }

    pub fn change_radio_volume(&mut self, channel: u8, delta: f32) -> bool {
        self.radio.change_volume(&mut self.ctx, channel, delta)
    }

    pub fn cycle_radio_stereo(&mut self, channel: u8) -> bool {
        self.radio.cycle_stereo(&mut self.ctx, channel).is_some()
    }

    pub fn use_megaphone(&mut self, enabled: bool) -> bool {
        self.megaphone.use_megaphone(&mut self.ctx, enabled)
    }

    pub fn set_megaphone_permission(&mut self, allowed: bool) {
        self.megaphone.set_manual_permission(allowed);
    }

    pub fn set_spectating(&mut self, target: Option<PlayerId>) {
        self.proximity.set_spectating(target);
    }

    /// Completion of an animation stream requested through the outbox.
    pub fn animation_streamed(
        &mut self,
        ticket: AnimationTicket,
        result: Result<(), StreamingError>,
    ) {
        self.radio.animation_streamed(&mut self.ctx, ticket, result);
    }

    /// Host side of an `AnimationCommand::Stream`: loads the dictionary
    /// through `streamer`, bounded by the configured streaming timeout, and
    /// reports the outcome back.
    pub async fn stream_animation(
        &mut self,
        streamer: &dyn AssetStreamer,
        ticket: AnimationTicket,
    ) {
        let timeout = self.ctx.config.timing.streaming_timeout();
        let result = stream_asset(streamer, ticket.dictionary, timeout).await;
        self.animation_streamed(ticket, result);
    }

    fn send_init(&mut self) {
        let Some(name) = &self.ingame_name else {
            return;
        };
        if !self.ctx.outbox.is_engine_open() {
            return;
        }
        let frame = InitFrame::from_config(&self.ctx.config, name.clone());
        self.ctx.outbox.send_engine(frame);
    }

    fn run_tick(&mut self) -> Option<PlayerFrame> {
        self.megaphone.check_vehicle(&mut self.ctx);
        let phone = self.phone.view(&self.ctx);
        self.proximity.resolve(&mut self.ctx, &phone)
    }

    fn apply_action(&mut self, action: DispatchAction) {
        let ctx = &mut self.ctx;
        match action {
            DispatchAction::Joined {
                engine_client_id,
                reconnect,
            } => {
                ctx.engine_client_id = Some(engine_client_id);
                self.resolution_tick = Some(Interval::new(ctx.config.timing.tick_interval()));
                if reconnect {
                    self.radio.reapply_settings(ctx);
                    self.phone.reapply_calls(ctx);
                }
                ctx.outbox
                    .send_server(ClientEvent::EngineReady { engine_client_id });
            }
            DispatchAction::StateChanged(state) => {
                log::info!("Plugin state {:?}", state);
                ctx.outbox.notice(ClientNotice::PluginStateChanged(state));
            }
            DispatchAction::TalkingChanged(talking) => {
                let local_id = ctx.local_id;
                if let Some(participant) = ctx.roster.get_mut(local_id) {
                    participant.talking = talking;
                }
                ctx.outbox.animate(AnimationCommand::LipSync {
                    player: local_id,
                    talking,
                });
                ctx.outbox.send_server(ClientEvent::TalkState { talking });
                ctx.outbox.notice(ClientNotice::TalkingChanged(talking));
            }
            DispatchAction::SoundChanged { flag, value } => {
                ctx.outbox
                    .notice(ClientNotice::SoundStateChanged { flag, value });
            }
            DispatchAction::OtherTalking {
                engine_client_id,
                talking,
            } => {
                if let Some(participant) = ctx.roster.by_engine_id_mut(engine_client_id) {
                    participant.talking = talking;
                }
            }
            DispatchAction::Notify { level, key } => ctx.notify_key(level, key),
            DispatchAction::UnknownCode(code) => {
                let text = format!("{} {}", ctx.locale.translate("plugin_error"), code);
                ctx.outbox.notify(NotificationLevel::Error, text);
            }
        }
    }

    /// Applies replicated state changes to the roster and the subsystems that
    /// react to them.
    fn apply_state_changes(&mut self) {
        if !self.ctx.state.has_pending_changes() {
            return;
        }
        let changes: Vec<StateChange> = self.ctx.state.drain_changes().collect();
        let local_id = self.ctx.local_id;

        for StateChange { owner, value } in changes {
            let id = match owner {
                StateOwner::Player(id) => id,
                StateOwner::Global => {
                    if let StateValue::GlobalErrorLevel(level) = value {
                        self.ctx
                            .outbox
                            .notice(ClientNotice::GlobalErrorLevelChanged(level));
                    }
                    continue;
                }
            };

            match value {
                StateValue::VoiceRange(range) => {
                    if let Some(participant) = self.ctx.roster.get_mut(id) {
                        participant.voice_range = Some(range);
                    }
                    if id == local_id {
                        self.voice_range.sync_to(range);
                        let text =
                            format!("{} {}m", self.ctx.locale.translate("voice_range_changed"), range);
                        self.ctx.outbox.notify(NotificationLevel::Info, text);
                        self.ctx.outbox.notice(ClientNotice::VoiceRangeChanged(range));
                    }
                }
                StateValue::Megaphone(range) => {
                    self.megaphone.apply_state(&mut self.ctx, id, range);
                }
                StateValue::Talking(talking) => {
                    if id == local_id {
                        continue;
                    }
                    if let Some(participant) = self.ctx.roster.get_mut(id) {
                        participant.talking = talking;
                    }
                    self.ctx
                        .outbox
                        .animate(AnimationCommand::LipSync { player: id, talking });
                }
                StateValue::PhoneSpeaker(members) => {
                    if let Some(participant) = self.ctx.roster.get_mut(id) {
                        participant.phone_call_members = members;
                    }
                }
                StateValue::ForceMuted(muted) => {
                    if let Some(participant) = self.ctx.roster.get_mut(id) {
                        participant.force_muted = muted;
                    }
                }
                StateValue::GlobalErrorLevel(_) => {}
            }
        }
    }
}
