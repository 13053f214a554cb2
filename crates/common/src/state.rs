use std::collections::{HashMap, VecDeque};

use rkyv::{Archive, Deserialize, Serialize};

use crate::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum StateOwner {
    Player(PlayerId),
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    VoiceRange,
    Megaphone,
    Talking,
    PhoneSpeaker,
    ForceMuted,
    GlobalErrorLevel,
}

/// A single replicated field together with its value.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum StateValue {
    VoiceRange(f32),
    /// Megaphone range while broadcasting, `None` when off.
    Megaphone(Option<f32>),
    Talking(bool),
    /// Call partners relayed through this player's phone speaker. Empty when off.
    PhoneSpeaker(Vec<PlayerId>),
    ForceMuted(bool),
    GlobalErrorLevel(f32),
}

impl StateValue {
    pub fn field(&self) -> StateField {
        match self {
            Self::VoiceRange(_) => StateField::VoiceRange,
            Self::Megaphone(_) => StateField::Megaphone,
            Self::Talking(_) => StateField::Talking,
            Self::PhoneSpeaker(_) => StateField::PhoneSpeaker,
            Self::ForceMuted(_) => StateField::ForceMuted,
            Self::GlobalErrorLevel(_) => StateField::GlobalErrorLevel,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateBag {
    pub voice_range: Option<f32>,
    pub megaphone: Option<f32>,
    pub talking: bool,
    pub phone_speaker: Vec<PlayerId>,
    pub force_muted: bool,
}

impl StateBag {
    fn apply(&mut self, value: &StateValue) -> bool {
        match value {
            StateValue::VoiceRange(range) => replace(&mut self.voice_range, Some(*range)),
            StateValue::Megaphone(range) => replace(&mut self.megaphone, *range),
            StateValue::Talking(talking) => replace(&mut self.talking, *talking),
            StateValue::PhoneSpeaker(members) => replace(&mut self.phone_speaker, members.clone()),
            StateValue::ForceMuted(muted) => replace(&mut self.force_muted, *muted),
            StateValue::GlobalErrorLevel(_) => false,
        }
    }

    fn value(&self, field: StateField) -> Option<StateValue> {
        match field {
            StateField::VoiceRange => self.voice_range.map(StateValue::VoiceRange),
            StateField::Megaphone => Some(StateValue::Megaphone(self.megaphone)),
            StateField::Talking => Some(StateValue::Talking(self.talking)),
            StateField::PhoneSpeaker => Some(StateValue::PhoneSpeaker(self.phone_speaker.clone())),
            StateField::ForceMuted => Some(StateValue::ForceMuted(self.force_muted)),
            StateField::GlobalErrorLevel => None,
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub owner: StateOwner,
    pub value: StateValue,
}

type Subscriber = Box<dyn FnMut(StateOwner, &StateValue)>;

/// Typed replicated key-value store. Writes that do not change a value are
/// dropped, so subscribers and the change queue only ever see real changes.
#[derive(Default)]
pub struct ReplicatedState {
    players: HashMap<PlayerId, StateBag>,
    global_error_level: f32,
    changes: VecDeque<StateChange>,
    subscribers: HashMap<StateField, Vec<Subscriber>>,
}

impl ReplicatedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, owner: StateOwner, value: StateValue) -> bool {
        let changed = match (owner, &value) {
            (StateOwner::Global, StateValue::GlobalErrorLevel(level)) => {
                replace(&mut self.global_error_level, level.clamp(0.0, 1.0))
            }
            (StateOwner::Player(id), StateValue::GlobalErrorLevel(_)) => {
                log::warn!("Ignoring global field written to player {}", id);
                false
            }
            (StateOwner::Player(id), value) => self.players.entry(id).or_default().apply(value),
            (StateOwner::Global, value) => {
                log::warn!("Ignoring player field {:?} written to global state", value.field());
                false
            }
        };

        if changed {
            if let Some(subscribers) = self.subscribers.get_mut(&value.field()) {
                for subscriber in subscribers.iter_mut() {
                    subscriber(owner, &value);
                }
            }
            self.changes.push_back(StateChange { owner, value });
        }

        changed
    }

    pub fn get(&self, owner: StateOwner, field: StateField) -> Option<StateValue> {
        match owner {
            StateOwner::Global if field == StateField::GlobalErrorLevel => {
                Some(StateValue::GlobalErrorLevel(self.global_error_level))
            }
            StateOwner::Global => None,
            StateOwner::Player(id) => self.players.get(&id).and_then(|bag| bag.value(field)),
        }
    }

    pub fn bag(&self, player: PlayerId) -> Option<&StateBag> {
        self.players.get(&player)
    }

    pub fn global_error_level(&self) -> f32 {
        self.global_error_level
    }

    pub fn megaphone(&self, player: PlayerId) -> Option<f32> {
        self.players.get(&player).and_then(|bag| bag.megaphone)
    }

    pub fn voice_range(&self, player: PlayerId) -> Option<f32> {
        self.players.get(&player).and_then(|bag| bag.voice_range)
    }

    pub fn phone_speaker(&self, player: PlayerId) -> &[PlayerId] {
        self.players
            .get(&player)
            .map(|bag| bag.phone_speaker.as_slice())
            .unwrap_or(&[])
    }

    /// Every field currently set on a player, for syncing late joiners.
    /// Fields still at their default are left out.
    pub fn snapshot(&self, player: PlayerId) -> Vec<StateValue> {
        let Some(bag) = self.players.get(&player) else {
            return Vec::new();
        };
        let defaults = StateBag::default();
        [
            StateField::VoiceRange,
            StateField::Megaphone,
            StateField::Talking,
            StateField::PhoneSpeaker,
            StateField::ForceMuted,
        ]
        .into_iter()
        .filter_map(|field| {
            bag.value(field)
                .filter(|value| Some(value) != defaults.value(field).as_ref())
        })
        .collect()
    }

    pub fn remove_player(&mut self, player: PlayerId) -> Option<StateBag> {
        self.players.remove(&player)
    }

    pub fn on_field_change<F>(&mut self, field: StateField, callback: F)
    where
        F: FnMut(StateOwner, &StateValue) + 'static,
    {
        self.subscribers
            .entry(field)
            .or_default()
            .push(Box::new(callback));
    }

    pub fn drain_changes(&mut self) -> impl Iterator<Item = StateChange> + '_ {
        self.changes.drain(..)
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}
