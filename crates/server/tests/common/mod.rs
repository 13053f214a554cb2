#![allow(dead_code)]

use yaca::{ClientEvent, EngineClientId, PlayerId, ServerEvent, VoiceConfig};
use yaca_server::{Outbound, VoiceServer};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn engine_id(id: PlayerId) -> EngineClientId {
    id * 100
}

/// Names count up so every join gets a distinct one.
pub fn server(config: VoiceConfig) -> VoiceServer {
    init_logging();
    let mut counter = 0;
    VoiceServer::with_names(config, move |_: usize| {
        counter += 1;
        format!("p{:02}", counter)
    })
}

/// A server with every listed player joined and connected to the engine.
pub fn ready_server(config: VoiceConfig, players: &[PlayerId]) -> VoiceServer {
    let mut server = server(config);
    for id in players {
        ready(&mut server, *id);
    }
    server.drain_outbound().for_each(drop);
    server
}

pub fn ready(server: &mut VoiceServer, id: PlayerId) {
    server.player_joined(id).unwrap();
    server
        .handle_client_event(
            id,
            ClientEvent::EngineReady {
                engine_client_id: engine_id(id),
            },
        )
        .unwrap();
}

pub fn outbound(server: &mut VoiceServer) -> Vec<Outbound> {
    server.drain_outbound().collect()
}

/// Events a given player would receive, in order.
pub fn events_for(outbound: &[Outbound], player: PlayerId) -> Vec<ServerEvent> {
    outbound
        .iter()
        .filter(|out| out.recipient.includes(player))
        .map(|out| out.event.clone())
        .collect()
}

pub fn tune(server: &mut VoiceServer, id: PlayerId, channel: u8, frequency: &str) {
    server
        .handle_client_event(id, ClientEvent::EnableRadio { enabled: true })
        .ok();
    server
        .handle_client_event(
            id,
            ClientEvent::ChangeRadioFrequency {
                channel,
                frequency: frequency.to_string(),
            },
        )
        .unwrap();
}

pub fn talk(server: &mut VoiceServer, id: PlayerId, channel: u8, talking: bool) {
    server
        .handle_client_event(
            id,
            ClientEvent::RadioTalking {
                channel,
                talking,
                tower_distance: None,
            },
        )
        .unwrap();
}
