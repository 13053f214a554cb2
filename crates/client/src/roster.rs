use std::collections::HashMap;

use yaca::{EngineClientId, PlayerId};

#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: PlayerId,
    pub engine_client_id: EngineClientId,
    pub force_muted: bool,
    pub muted_on_phone: bool,
    /// Call partners this participant relays over a phone speaker.
    pub phone_call_members: Vec<PlayerId>,
    pub talking: bool,
    pub voice_range: Option<f32>,
}

impl Participant {
    pub fn new(id: PlayerId, engine_client_id: EngineClientId) -> Self {
        Self {
            id,
            engine_client_id,
            force_muted: false,
            muted_on_phone: false,
            phone_call_members: Vec::new(),
            talking: false,
            voice_range: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Roster {
    participants: HashMap<PlayerId, Participant>,
    by_engine_id: HashMap<EngineClientId, PlayerId>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a participant. A reconnect may hand out a new
    /// engine id, so the stale reverse mapping is dropped.
    pub fn insert(&mut self, participant: Participant) {
        if let Some(previous) = self.participants.get(&participant.id) {
            self.by_engine_id.remove(&previous.engine_client_id);
        }
        self.by_engine_id
            .insert(participant.engine_client_id, participant.id);
        self.participants.insert(participant.id, participant);
    }

    pub fn remove(&mut self, id: PlayerId) -> Option<Participant> {
        let participant = self.participants.remove(&id)?;
        self.by_engine_id.remove(&participant.engine_client_id);
        Some(participant)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Participant> {
        self.participants.get_mut(&id)
    }

    pub fn engine_id(&self, id: PlayerId) -> Option<EngineClientId> {
        self.participants.get(&id).map(|p| p.engine_client_id)
    }

    pub fn by_engine_id(&self, engine_client_id: EngineClientId) -> Option<&Participant> {
        self.by_engine_id
            .get(&engine_client_id)
            .and_then(|id| self.participants.get(id))
    }

    pub fn by_engine_id_mut(&mut self, engine_client_id: EngineClientId) -> Option<&mut Participant> {
        let id = *self.by_engine_id.get(&engine_client_id)?;
        self.participants.get_mut(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.participants.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }
}
