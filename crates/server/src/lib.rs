mod error;
mod events;
mod megaphone;
mod names;
mod phone;
mod player;
mod radio;
mod server;

pub use error::ServerError;
pub use events::{Outbound, Recipient};
pub use names::{NameSource, RandomNames, generate_name};
pub use phone::{CallGraph, NearbyRelays, SpeakerEmissions};
pub use player::{PhoneSettings, PlayerRegistry, RadioSettings, VoicePlayer};
pub use radio::{FrequencyMember, FrequencyRegistry};
pub use server::VoiceServer;
