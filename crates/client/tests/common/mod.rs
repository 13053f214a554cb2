#![allow(dead_code)]

use glam::Vec3;

use yaca::{
    ClientEvent, CommDevice, EngineClientId, EngineFrame, PlayerFrame, PlayerId, RosterEntry,
    ServerEvent, StateValue, VoiceConfig,
};
use yaca_client::{PedState, StaticWorld, VoiceClient};

pub const LOCAL: PlayerId = 1;
pub const LOCAL_ENGINE: EngineClientId = 100;

pub const JOIN: &str = r#"{"code":"OK","requestType":"JOIN","message":"100"}"#;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn entry(id: PlayerId, engine_client_id: EngineClientId) -> RosterEntry {
    RosterEntry {
        id,
        engine_client_id,
        muted_on_phone: false,
        state: vec![StateValue::VoiceRange(8.0)],
    }
}

/// A client that went through init, engine join and roster sync, with the
/// local ped standing at the origin.
pub fn joined_client(config: VoiceConfig, world: &StaticWorld) -> VoiceClient {
    init_logging();
    world.set_ped(LOCAL, PedState::at(Vec3::ZERO));

    let mut client = VoiceClient::new(config, LOCAL, world.clone());
    client.handle_server_event(ServerEvent::Init {
        ingame_name: "[YACA] abcdefghij".to_string(),
    });
    client.on_engine_connected();
    client.handle_engine_message(JOIN);
    client.handle_server_event(ServerEvent::RosterAdd {
        players: vec![entry(LOCAL, LOCAL_ENGINE)],
    });
    drain(&mut client);
    client
}

pub fn add_remote(client: &mut VoiceClient, world: &StaticWorld, id: PlayerId, position: Vec3) {
    world.set_ped(id, PedState::at(position));
    client.handle_server_event(ServerEvent::RosterAdd {
        players: vec![entry(id, engine_id(id))],
    });
}

pub fn engine_id(id: PlayerId) -> EngineClientId {
    id * 100
}

pub fn drain(client: &mut VoiceClient) {
    let outbox = client.outbox();
    outbox.drain_engine_frames().for_each(drop);
    outbox.drain_server_events().for_each(drop);
    outbox.drain_notifications().for_each(drop);
    outbox.drain_animations().for_each(drop);
    outbox.drain_notices().for_each(drop);
}

pub fn engine_frames(client: &mut VoiceClient) -> Vec<EngineFrame> {
    client.outbox().drain_engine_frames().collect()
}

pub fn devices(client: &mut VoiceClient) -> Vec<CommDevice> {
    engine_frames(client)
        .into_iter()
        .filter_map(|frame| frame.comm_device().cloned())
        .collect()
}

pub fn player_frames(client: &mut VoiceClient) -> Vec<PlayerFrame> {
    engine_frames(client)
        .into_iter()
        .filter_map(|frame| frame.player_frame().cloned())
        .collect()
}

pub fn server_events(client: &mut VoiceClient) -> Vec<ClientEvent> {
    client.outbox().drain_server_events().collect()
}
