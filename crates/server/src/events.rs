use yaca::{PlayerId, ServerEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every connected player.
    All,
    Player(PlayerId),
    Players(Vec<PlayerId>),
}

impl Recipient {
    pub fn includes(&self, player: PlayerId) -> bool {
        match self {
            Recipient::All => true,
            Recipient::Player(id) => *id == player,
            Recipient::Players(ids) => ids.contains(&player),
        }
    }
}

/// An event waiting for the host to deliver it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub recipient: Recipient,
    pub event: ServerEvent,
}

impl Outbound {
    pub fn encode(&self) -> Result<Vec<u8>, yaca::EventError> {
        self.event.encode()
    }
}
