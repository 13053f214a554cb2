mod types;

use rkyv::rancor;
use rkyv::util::AlignedVec;

pub use types::{ArchivedClientEvent, ArchivedServerEvent, ClientEvent, RosterEntry, ServerEvent};

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
}

impl ClientEvent {
    pub fn encode(&self) -> Result<Vec<u8>, EventError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(EventError::Serialize)
    }

    pub fn decode(data: &[u8]) -> Result<Self, EventError> {
        rkyv::from_bytes::<Self, rancor::Error>(&aligned(data)).map_err(EventError::Deserialize)
    }
}

impl ServerEvent {
    pub fn encode(&self) -> Result<Vec<u8>, EventError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(EventError::Serialize)
    }

    pub fn decode(data: &[u8]) -> Result<Self, EventError> {
        rkyv::from_bytes::<Self, rancor::Error>(&aligned(data)).map_err(EventError::Deserialize)
    }
}

// Received buffers carry no alignment guarantee; archived data needs one.
fn aligned(data: &[u8]) -> AlignedVec {
    let mut buffer = AlignedVec::with_capacity(data.len());
    buffer.extend_from_slice(data);
    buffer
}
