use std::collections::{HashMap, VecDeque};

use yaca::{
    ClientEvent, EngineClientId, EngineFrame, PlayerId, ReplicatedState, SoundState, VoiceConfig,
};

use crate::animation::AnimationCommand;
use crate::dispatcher::PluginState;
use crate::roster::Roster;
use crate::world::WorldQuery;

pub trait Localization {
    fn translate(&self, key: &str) -> String;
}

/// Falls back to the raw key.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyLocale;

impl Localization for KeyLocale {
    fn translate(&self, key: &str) -> String {
        key.to_string()
    }
}

impl Localization for HashMap<String, String> {
    fn translate(&self, key: &str) -> String {
        self.get(key).cloned().unwrap_or_else(|| key.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub text: String,
}

/// Changes the host may want to react to (HUD, sounds).
#[derive(Debug, Clone, PartialEq)]
pub enum ClientNotice {
    PluginStateChanged(PluginState),
    SoundStateChanged { flag: SoundState, value: bool },
    TalkingChanged(bool),
    VoiceRangeChanged(f32),
    RadioEnabled(bool),
    RadioFrequencyChanged { channel: u8, frequency: String },
    RadioMuteChanged { channel: u8, muted: bool },
    RadioTalkingChanged { channel: u8, talking: bool },
    RadioReceiving { channel: u8, player: PlayerId, receiving: bool },
    ActiveRadioChannelChanged(u8),
    PhoneSpeakerPartnerChanged { speaker: PlayerId, enabled: bool },
    GlobalErrorLevelChanged(f32),
    Kicked(String),
}

/// Everything the client wants to send, drained by the host each frame.
#[derive(Debug, Default)]
pub struct Outbox {
    engine_open: bool,
    engine: VecDeque<EngineFrame>,
    server: VecDeque<ClientEvent>,
    notifications: VecDeque<Notification>,
    animations: VecDeque<AnimationCommand>,
    notices: VecDeque<ClientNotice>,
}

impl Outbox {
    pub fn set_engine_open(&mut self, open: bool) {
        self.engine_open = open;
        if !open {
            self.engine.clear();
        }
    }

    pub fn is_engine_open(&self) -> bool {
        self.engine_open
    }

    /// Frames sent while the engine channel is closed are dropped.
    pub fn send_engine(&mut self, frame: impl Into<EngineFrame>) {
        let frame = frame.into();
        if !self.engine_open {
            log::debug!("Engine channel closed, dropping frame {:?}", frame);
            return;
        }
        self.engine.push_back(frame);
    }

    pub fn send_server(&mut self, event: ClientEvent) {
        self.server.push_back(event);
    }

    pub fn notify(&mut self, level: NotificationLevel, text: impl Into<String>) {
        self.notifications.push_back(Notification {
            level,
            text: text.into(),
        });
    }

    pub fn animate(&mut self, command: AnimationCommand) {
        self.animations.push_back(command);
    }

    pub fn notice(&mut self, notice: ClientNotice) {
        self.notices.push_back(notice);
    }

    pub fn drain_engine_frames(&mut self) -> impl Iterator<Item = EngineFrame> + '_ {
        self.engine.drain(..)
    }

    /// Engine frames encoded for the websocket. Frames that fail to encode
    /// are logged and skipped.
    pub fn drain_engine_json(&mut self) -> Vec<String> {
        self.engine
            .drain(..)
            .filter_map(|frame| match frame.to_json() {
                Ok(json) => Some(json),
                Err(e) => {
                    log::error!("Failed to encode engine frame: {}", e);
                    None
                }
            })
            .collect()
    }

    pub fn drain_server_events(&mut self) -> impl Iterator<Item = ClientEvent> + '_ {
        self.server.drain(..)
    }

    pub fn drain_notifications(&mut self) -> impl Iterator<Item = Notification> + '_ {
        self.notifications.drain(..)
    }

    pub fn drain_animations(&mut self) -> impl Iterator<Item = AnimationCommand> + '_ {
        self.animations.drain(..)
    }

    pub fn drain_notices(&mut self) -> impl Iterator<Item = ClientNotice> + '_ {
        self.notices.drain(..)
    }
}

/// Shared state every client subsystem operates on.
pub struct ClientContext {
    pub config: VoiceConfig,
    pub world: Box<dyn WorldQuery>,
    pub locale: Box<dyn Localization>,
    pub state: ReplicatedState,
    pub roster: Roster,
    pub outbox: Outbox,
    pub local_id: PlayerId,
    pub engine_client_id: Option<EngineClientId>,
}

impl ClientContext {
    pub fn new(config: VoiceConfig, local_id: PlayerId, world: Box<dyn WorldQuery>) -> Self {
        Self {
            config: config.validated(),
            world,
            locale: Box::new(KeyLocale),
            state: ReplicatedState::new(),
            roster: Roster::new(),
            outbox: Outbox::default(),
            local_id,
            engine_client_id: None,
        }
    }

    pub fn use_whisper(&self) -> bool {
        self.config.use_whisper()
    }

    pub fn notify_key(&mut self, level: NotificationLevel, key: &str) {
        let text = self.locale.translate(key);
        self.outbox.notify(level, text);
    }

    pub fn local_voice_range(&self) -> f32 {
        self.state
            .voice_range(self.local_id)
            .unwrap_or_else(|| self.config.voice_range.default_range())
    }

    pub fn local_force_muted(&self) -> bool {
        self.roster
            .get(self.local_id)
            .is_some_and(|participant| participant.force_muted)
    }
}
