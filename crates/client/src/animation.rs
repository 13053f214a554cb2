use yaca::PlayerId;

pub const RADIO_DICTIONARY: &str = "random@arrests";
pub const RADIO_CLIP: &str = "generic_radio_chatter";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationTicket {
    pub generation: u64,
    pub dictionary: &'static str,
    pub clip: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationCommand {
    /// Stream the dictionary, then report back with the ticket.
    Stream(AnimationTicket),
    Play(AnimationTicket),
    Stop {
        dictionary: &'static str,
        clip: &'static str,
    },
    LipSync {
        player: PlayerId,
        talking: bool,
    },
}

/// Hands out generation tickets for a single looping animation. Completions
/// carrying an older generation arrived after the animation was cancelled.
#[derive(Debug, Default)]
pub struct AnimationGate {
    generation: u64,
    active: bool,
}

impl AnimationGate {
    pub fn begin(&mut self, dictionary: &'static str, clip: &'static str) -> AnimationTicket {
        self.generation += 1;
        self.active = true;
        AnimationTicket {
            generation: self.generation,
            dictionary,
            clip,
        }
    }

    pub fn cancel(&mut self) -> bool {
        self.generation += 1;
        std::mem::replace(&mut self.active, false)
    }

    pub fn is_current(&self, ticket: &AnimationTicket) -> bool {
        self.active && ticket.generation == self.generation
    }
}
