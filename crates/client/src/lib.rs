pub mod animation;
pub mod client;
pub mod context;
pub mod dispatcher;
pub mod intercom;
pub mod megaphone;
pub mod phone;
pub mod proximity;
pub mod radio;
pub mod roster;
pub mod streaming;
pub mod timer;
pub mod world;

pub use animation::{AnimationCommand, AnimationGate, AnimationTicket};
pub use client::VoiceClient;
pub use context::{
    ClientContext, ClientNotice, KeyLocale, Localization, Notification, NotificationLevel, Outbox,
};
pub use dispatcher::{DispatchAction, PluginState, ResponseDispatcher};
pub use intercom::{IntercomModule, intercom_device};
pub use megaphone::MegaphoneModule;
pub use phone::{PhoneModule, PhoneView};
pub use proximity::{Occupancy, ProximityEngine, muffle_intensity};
pub use radio::{RadioChannelSettings, RadioModule};
pub use roster::{Participant, Roster};
pub use streaming::{AssetRegistry, AssetStreamer, StreamingError, stream_asset, wait_until_loaded};
pub use timer::Interval;
pub use world::{PedState, StaticWorld, WorldQuery};
