use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use yaca::geometry::nearest_distance;
use yaca::radio::is_unset;
use yaca::{
    ClientEvent, CommDevice, CommDeviceLeft, CommDeviceMode, CommDeviceSettings, CommDeviceType,
    EngineClientId, PlayerId, StereoMode, UNSET_FREQUENCY,
};

use crate::animation::{
    AnimationCommand, AnimationGate, AnimationTicket, RADIO_CLIP, RADIO_DICTIONARY,
};
use crate::context::{ClientContext, ClientNotice};
use crate::streaming::StreamingError;
use crate::timer::Interval;

#[derive(Debug, Clone, PartialEq)]
pub struct RadioChannelSettings {
    pub frequency: String,
    pub muted: bool,
    pub volume: f32,
    pub stereo: StereoMode,
}

impl Default for RadioChannelSettings {
    fn default() -> Self {
        Self {
            frequency: UNSET_FREQUENCY.to_string(),
            muted: false,
            volume: 1.0,
            stereo: StereoMode::Stereo,
        }
    }
}

impl RadioChannelSettings {
    pub fn is_tuned(&self) -> bool {
        !is_unset(&self.frequency)
    }
}

#[derive(Debug, Default)]
pub struct RadioModule {
    enabled: bool,
    active_channel: u8,
    channels: BTreeMap<u8, RadioChannelSettings>,
    talking: BTreeSet<u8>,
    tower_timers: HashMap<u8, Interval>,
    receiving: HashMap<u8, BTreeMap<PlayerId, EngineClientId>>,
    whisper_targets: HashMap<u8, Vec<EngineClientId>>,
    animation: AnimationGate,
}

impl RadioModule {
    pub fn new(default_channel: u8) -> Self {
        Self {
            active_channel: default_channel,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn active_channel(&self) -> u8 {
        self.active_channel
    }

    pub fn settings(&self, channel: u8) -> Option<&RadioChannelSettings> {
        self.channels.get(&channel)
    }

    pub fn is_talking(&self, channel: u8) -> bool {
        self.talking.contains(&channel)
    }

    pub fn has_tower_timer(&self, channel: u8) -> bool {
        self.tower_timers.contains_key(&channel)
    }

    pub fn receiving_from(&self, channel: u8) -> impl Iterator<Item = PlayerId> + '_ {
        self.receiving
            .get(&channel)
            .into_iter()
            .flat_map(|members| members.keys().copied())
    }

    pub fn enable_radio(&mut self, ctx: &mut ClientContext, enabled: bool) -> bool {
        if enabled == self.enabled {
            return false;
        }

        if enabled {
            if self.channels.is_empty() {
                self.channels = ctx
                    .config
                    .radio
                    .channels()
                    .map(|channel| (channel, RadioChannelSettings::default()))
                    .collect();
            }
        } else {
            let talking: Vec<_> = self.talking.iter().copied().collect();
            for channel in talking {
                self.radio_talking_start(ctx, false, channel);
            }
            let channels: Vec<_> = self.receiving.keys().copied().collect();
            for channel in channels {
                self.silence_receivers(ctx, channel);
            }
        }

        self.enabled = enabled;
        ctx.outbox.send_server(ClientEvent::EnableRadio { enabled });
        ctx.outbox.notice(ClientNotice::RadioEnabled(enabled));
        true
    }

    /// Asks the server to retune a channel. Nothing changes locally until the
    /// server confirms, and a request the server turned down may be sent again.
    pub fn change_frequency(
        &mut self,
        ctx: &mut ClientContext,
        channel: u8,
        frequency: &str,
    ) -> bool {
        if !self.enabled {
            log::debug!("Ignoring frequency change while the radio is off");
            return false;
        }
        let Some(settings) = self.channels.get(&channel) else {
            log::warn!("Ignoring frequency change on invalid channel {}", channel);
            return false;
        };

        let frequency = normalize_frequency(frequency);
        if settings.frequency == frequency {
            return false;
        }

        ctx.outbox.send_server(ClientEvent::ChangeRadioFrequency {
            channel,
            frequency,
        });
        true
    }

    /// Server-confirmed frequency. The old frequency is fully left first.
    pub fn apply_frequency(&mut self, ctx: &mut ClientContext, channel: u8, frequency: &str) {
        if !ctx.config.radio.is_valid_channel(channel) {
            log::warn!("Server set frequency on invalid channel {}", channel);
            return;
        }
        let frequency = normalize_frequency(frequency);
        if self
            .channels
            .get(&channel)
            .is_some_and(|settings| settings.frequency == frequency)
        {
            return;
        }

        self.leave_channel(ctx, channel);
        self.channels.entry(channel).or_default().frequency = frequency.clone();
        ctx.outbox.notice(ClientNotice::RadioFrequencyChanged { channel, frequency });
    }

    pub fn members_left(
        &mut self,
        ctx: &mut ClientContext,
        channel: u8,
        engine_client_ids: &[EngineClientId],
    ) {
        if engine_client_ids.is_empty() {
            return;
        }
        if let Some(members) = self.receiving.get_mut(&channel) {
            members.retain(|_, engine_client_id| !engine_client_ids.contains(engine_client_id));
        }
        ctx.outbox.send_engine(CommDeviceLeft {
            comm_type: CommDeviceType::Radio,
            client_ids: engine_client_ids.to_vec(),
            channel,
        });
    }

    pub fn mute_channel(&mut self, ctx: &mut ClientContext, channel: u8) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(settings) = self.channels.get(&channel) else {
            log::warn!("Ignoring mute on invalid channel {}", channel);
            return false;
        };
        if !settings.is_tuned() {
            return false;
        }

        ctx.outbox.send_server(ClientEvent::MuteRadioChannel {
            channel,
            muted: !settings.muted,
        });
        true
    }

    pub fn apply_muted(&mut self, ctx: &mut ClientContext, channel: u8, muted: bool) {
        let Some(settings) = self.channels.get_mut(&channel) else {
            return;
        };
        if settings.muted == muted {
            return;
        }
        settings.muted = muted;

        if muted {
            self.radio_talking_start(ctx, false, channel);
            self.silence_receivers(ctx, channel);
        }
        ctx.outbox.notice(ClientNotice::RadioMuteChanged { channel, muted });
    }

    pub fn set_active_channel(&mut self, ctx: &mut ClientContext, channel: u8) -> bool {
        if !ctx.config.radio.is_valid_channel(channel) || channel == self.active_channel {
            return false;
        }
        self.active_channel = channel;
        ctx.outbox.notice(ClientNotice::ActiveRadioChannelChanged(channel));
        true
    }

    pub fn set_volume(&mut self, ctx: &mut ClientContext, channel: u8, volume: f32) -> bool {
        let Some(settings) = self.channels.get_mut(&channel) else {
            return false;
        };
        let volume = volume.clamp(0.0, 1.0);
        if (settings.volume - volume).abs() < f32::EPSILON {
            return false;
        }
        settings.volume = volume;

        ctx.outbox.send_engine(CommDeviceSettings {
            comm_type: CommDeviceType::Radio,
            volume: Some(volume),
            output_mode: None,
            channel: Some(channel),
        });
        true
    }

    pub fn change_volume(&mut self, ctx: &mut ClientContext, channel: u8, delta: f32) -> bool {
        let Some(current) = self.channels.get(&channel).map(|s| s.volume) else {
            return false;
        };
        self.set_volume(ctx, channel, current + delta)
    }

    pub fn cycle_stereo(&mut self, ctx: &mut ClientContext, channel: u8) -> Option<StereoMode> {
        let settings = self.channels.get_mut(&channel)?;
        settings.stereo = settings.stereo.next();

        ctx.outbox.send_engine(CommDeviceSettings {
            comm_type: CommDeviceType::Radio,
            volume: None,
            output_mode: Some(settings.stereo),
            channel: Some(channel),
        });
        Some(settings.stereo)
    }

    /// Pushes every channel's audio settings again, for a fresh engine session.
    pub fn reapply_settings(&self, ctx: &mut ClientContext) {
        for (channel, settings) in &self.channels {
            ctx.outbox.send_engine(CommDeviceSettings {
                comm_type: CommDeviceType::Radio,
                volume: Some(settings.volume),
                output_mode: Some(settings.stereo),
                channel: Some(*channel),
            });
        }
    }

    pub fn radio_talking_start(&mut self, ctx: &mut ClientContext, talking: bool, channel: u8) -> bool {
        if talking {
            self.start_talking(ctx, channel)
        } else {
            self.stop_talking(ctx, channel)
        }
    }

    fn start_talking(&mut self, ctx: &mut ClientContext, channel: u8) -> bool {
        if !self.enabled || self.talking.contains(&channel) {
            return false;
        }
        if !self.channels.get(&channel).is_some_and(RadioChannelSettings::is_tuned) {
            return false;
        }

        self.talking.insert(channel);

        if !ctx.use_whisper() {
            ctx.outbox.send_engine(
                CommDevice::new(CommDeviceType::Radio, true)
                    .own(ctx.engine_client_id, CommDeviceMode::Sender)
                    .channel(channel),
            );
        }

        let ticket = self.animation.begin(RADIO_DICTIONARY, RADIO_CLIP);
        ctx.outbox.animate(AnimationCommand::Stream(ticket));

        let tower_distance = if ctx.config.radio.use_towers {
            self.tower_timers.insert(
                channel,
                Interval::new(ctx.config.radio.tower_report_interval()),
            );
            tower_distance(ctx)
        } else {
            None
        };

        ctx.outbox.send_server(ClientEvent::RadioTalking {
            channel,
            talking: true,
            tower_distance,
        });
        ctx.outbox.notice(ClientNotice::RadioTalkingChanged {
            channel,
            talking: true,
        });
        true
    }

    fn stop_talking(&mut self, ctx: &mut ClientContext, channel: u8) -> bool {
        if !self.talking.remove(&channel) {
            return false;
        }

        self.tower_timers.remove(&channel);
        if self.talking.is_empty() && self.animation.cancel() {
            ctx.outbox.animate(AnimationCommand::Stop {
                dictionary: RADIO_DICTIONARY,
                clip: RADIO_CLIP,
            });
        }

        if ctx.use_whisper() {
            if let Some(targets) = self.whisper_targets.remove(&channel) {
                ctx.outbox.send_engine(
                    CommDevice::new(CommDeviceType::Radio, false)
                        .own(ctx.engine_client_id, CommDeviceMode::Sender)
                        .others(targets, CommDeviceMode::Receiver)
                        .channel(channel),
                );
            }
        } else {
            ctx.outbox.send_engine(
                CommDevice::new(CommDeviceType::Radio, false)
                    .own(ctx.engine_client_id, CommDeviceMode::Sender)
                    .channel(channel),
            );
        }

        ctx.outbox.send_server(ClientEvent::RadioTalking {
            channel,
            talking: false,
            tower_distance: None,
        });
        ctx.outbox.notice(ClientNotice::RadioTalkingChanged {
            channel,
            talking: false,
        });
        true
    }

    /// Advances the tower report timers of every transmitting channel.
    pub fn update(&mut self, ctx: &mut ClientContext, delta: Duration) {
        let mut due = Vec::new();
        for (channel, timer) in self.tower_timers.iter_mut() {
            timer.accumulate(delta);
            if timer.consume_all() {
                due.push(*channel);
            }
        }
        due.sort_unstable();

        for channel in due {
            if let Some(distance) = tower_distance(ctx) {
                ctx.outbox
                    .send_server(ClientEvent::RadioTowerDistance { channel, distance });
            }
        }
    }

    pub fn animation_streamed(
        &mut self,
        ctx: &mut ClientContext,
        ticket: AnimationTicket,
        result: Result<(), StreamingError>,
    ) {
        if let Err(e) = result {
            log::warn!("Skipping radio animation: {}", e);
            return;
        }
        if self.animation.is_current(&ticket) {
            ctx.outbox.animate(AnimationCommand::Play(ticket));
        }
    }

    pub fn handle_remote_talking(
        &mut self,
        ctx: &mut ClientContext,
        sender: PlayerId,
        engine_client_id: EngineClientId,
        channel: u8,
        talking: bool,
        error_level: f32,
    ) {
        if talking {
            let listening = self.enabled
                && self
                    .channels
                    .get(&channel)
                    .is_some_and(|settings| settings.is_tuned() && !settings.muted);
            if !listening {
                log::debug!("Not listening on channel {}, ignoring {}", channel, sender);
                return;
            }

            self.receiving
                .entry(channel)
                .or_default()
                .insert(sender, engine_client_id);
            ctx.outbox.send_engine(
                CommDevice::new(CommDeviceType::Radio, true)
                    .own(ctx.engine_client_id, CommDeviceMode::Receiver)
                    .others([engine_client_id], CommDeviceMode::Sender)
                    .channel(channel)
                    .error_level(Some(error_level)),
            );
        } else {
            let removed = self
                .receiving
                .get_mut(&channel)
                .and_then(|members| members.remove(&sender));
            let Some(engine_client_id) = removed else {
                return;
            };
            ctx.outbox.send_engine(
                CommDevice::new(CommDeviceType::Radio, false)
                    .own(ctx.engine_client_id, CommDeviceMode::Receiver)
                    .others([engine_client_id], CommDeviceMode::Sender)
                    .channel(channel),
            );
        }

        ctx.outbox.notice(ClientNotice::RadioReceiving {
            channel,
            player: sender,
            receiving: talking,
        });
    }

    pub fn handle_whisper_targets(
        &mut self,
        ctx: &mut ClientContext,
        channel: u8,
        talking: bool,
        engine_client_ids: Vec<EngineClientId>,
    ) {
        if talking {
            if !self.talking.contains(&channel) {
                return;
            }
            ctx.outbox.send_engine(
                CommDevice::new(CommDeviceType::Radio, true)
                    .own(ctx.engine_client_id, CommDeviceMode::Sender)
                    .others(engine_client_ids.iter().copied(), CommDeviceMode::Receiver)
                    .channel(channel),
            );
            self.whisper_targets.insert(channel, engine_client_ids);
        } else if let Some(targets) = self.whisper_targets.remove(&channel) {
            ctx.outbox.send_engine(
                CommDevice::new(CommDeviceType::Radio, false)
                    .own(ctx.engine_client_id, CommDeviceMode::Sender)
                    .others(targets, CommDeviceMode::Receiver)
                    .channel(channel),
            );
        }
    }

    pub fn participant_left(&mut self, ctx: &mut ClientContext, player: PlayerId) {
        let mut channels: Vec<_> = self
            .receiving
            .iter()
            .filter(|(_, members)| members.contains_key(&player))
            .map(|(channel, _)| *channel)
            .collect();
        channels.sort_unstable();

        for channel in channels {
            self.handle_remote_talking(ctx, player, 0, channel, false, 0.0);
        }
    }

    /// Stops transmitting and drops every timer. The engine connection is gone,
    /// so receivers are forgotten rather than switched off.
    pub fn disconnect(&mut self, ctx: &mut ClientContext) {
        let talking: Vec<_> = self.talking.iter().copied().collect();
        for channel in talking {
            self.stop_talking(ctx, channel);
        }
        self.tower_timers.clear();
        self.receiving.clear();
        self.whisper_targets.clear();
    }

    fn leave_channel(&mut self, ctx: &mut ClientContext, channel: u8) {
        self.stop_talking(ctx, channel);
        self.silence_receivers(ctx, channel);
        self.whisper_targets.remove(&channel);
        // Mute state belongs to the frequency membership on the server.
        if let Some(settings) = self.channels.get_mut(&channel) {
            settings.muted = false;
        }
    }

    fn silence_receivers(&mut self, ctx: &mut ClientContext, channel: u8) {
        let Some(members) = self.receiving.remove(&channel) else {
            return;
        };
        if members.is_empty() {
            return;
        }
        ctx.outbox.send_engine(
            CommDevice::new(CommDeviceType::Radio, false)
                .own(ctx.engine_client_id, CommDeviceMode::Receiver)
                .others(members.into_values(), CommDeviceMode::Sender)
                .channel(channel),
        );
    }
}

fn normalize_frequency(frequency: &str) -> String {
    let frequency = frequency.trim();
    if frequency.is_empty() {
        UNSET_FREQUENCY.to_string()
    } else {
        frequency.to_string()
    }
}

fn tower_distance(ctx: &ClientContext) -> Option<f32> {
    if !ctx.config.radio.use_towers {
        return None;
    }
    let ped = ctx.world.ped(ctx.local_id)?;
    nearest_distance(ped.position, &ctx.config.radio.towers)
}
