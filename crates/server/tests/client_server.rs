mod common;

use glam::Vec3;

use yaca::{CommDevice, CommDeviceMode, CommDeviceType, PlayerId, ServerEvent, VoiceConfig};
use yaca_client::{PedState, StaticWorld, VoiceClient};
use yaca_server::VoiceServer;

use common::*;

/// Two clients wired to one server through encoded packets.
struct Session {
    server: VoiceServer,
    world: StaticWorld,
    clients: Vec<(PlayerId, VoiceClient)>,
}

impl Session {
    fn new(config: VoiceConfig) -> Self {
        Self {
            server: server(config),
            world: StaticWorld::new(),
            clients: Vec::new(),
        }
    }

    fn connect(&mut self, id: PlayerId, position: Vec3) {
        self.world.set_ped(id, PedState::at(position));
        let mut client = VoiceClient::new(self.server.config().clone(), id, self.world.clone());
        client.on_engine_connected();
        self.clients.push((id, client));

        self.server.player_joined(id).unwrap();
        self.pump();

        let join = format!(
            r#"{{"code":"OK","requestType":"JOIN","message":"{}"}}"#,
            engine_id(id)
        );
        self.client(id).handle_engine_message(&join);
        self.pump();
    }

    fn client(&mut self, id: PlayerId) -> &mut VoiceClient {
        self.clients
            .iter_mut()
            .find(|(client_id, _)| *client_id == id)
            .map(|(_, client)| client)
            .unwrap()
    }

    /// Delivers traffic both ways until everyone is idle.
    fn pump(&mut self) {
        loop {
            let mut moved = false;
            for (id, client) in self.clients.iter_mut() {
                let events: Vec<_> = client.outbox().drain_server_events().collect();
                for event in events {
                    moved = true;
                    let packet = event.encode().unwrap();
                    let _ = self.server.handle_client_packet(*id, &packet);
                }
            }

            let outbound: Vec<_> = self.server.drain_outbound().collect();
            for out in outbound {
                moved = true;
                let packet = out.encode().unwrap();
                for (id, client) in self.clients.iter_mut() {
                    if out.recipient.includes(*id) {
                        client.handle_server_event(ServerEvent::decode(&packet).unwrap());
                    }
                }
            }

            if !moved {
                break;
            }
        }
    }

    fn devices(&mut self, id: PlayerId) -> Vec<CommDevice> {
        self.client(id)
            .outbox()
            .drain_engine_frames()
            .filter_map(|frame| frame.comm_device().cloned())
            .collect()
    }
}

#[test]
fn test_clients_see_each_other_after_join() {
    let mut session = Session::new(VoiceConfig::default());
    session.connect(1, Vec3::ZERO);
    session.connect(2, Vec3::new(3.0, 0.0, 0.0));

    for id in [1, 2] {
        let roster = &session.client(id).context().roster;
        assert!(roster.get(1).is_some());
        assert!(roster.get(2).is_some());
    }
}

#[test]
fn test_radio_transmission_reaches_other_client() {
    let mut session = Session::new(VoiceConfig::default());
    session.connect(1, Vec3::ZERO);
    session.connect(2, Vec3::new(500.0, 0.0, 0.0));

    for (id, channel) in [(1, 1), (2, 3)] {
        let client = session.client(id);
        assert!(client.enable_radio(true));
        assert!(client.change_radio_frequency(channel, "100,5"));
    }
    session.pump();
    assert_eq!(
        session.client(2).radio().settings(3).unwrap().frequency,
        "100,5"
    );
    session.devices(2);

    assert!(session.client(1).radio_talking_start(true, 1));
    session.pump();

    let received = session.devices(2);
    let device = received
        .iter()
        .find(|device| device.comm_type == CommDeviceType::Radio && device.on)
        .unwrap();
    assert_eq!(device.channel, Some(3));
    assert!(device
        .members
        .iter()
        .any(|m| m.client_id == engine_id(1) && m.mode == CommDeviceMode::Sender));
}

#[test]
fn test_rejected_voice_range_resyncs_client() {
    let mut session = Session::new(VoiceConfig::default());
    session.connect(1, Vec3::ZERO);
    session.server.set_max_voice_range(1, Some(8.0)).unwrap();

    assert_eq!(session.client(1).increase_voice_range(), 15.0);
    session.pump();
    assert_eq!(session.client(1).current_voice_range(), 8.0);
}

#[test]
fn test_call_reaches_both_clients() {
    let mut session = Session::new(VoiceConfig::default());
    session.connect(1, Vec3::ZERO);
    session.connect(2, Vec3::new(900.0, 0.0, 0.0));
    session.devices(1);
    session.devices(2);

    session.server.call_player(1, 2, true).unwrap();
    session.pump();

    for (id, partner) in [(1, 2), (2, 1)] {
        let devices = session.devices(id);
        assert!(devices.iter().any(|device| device.comm_type == CommDeviceType::Phone
            && device.on
            && device.members.iter().any(|m| m.client_id == engine_id(partner))));
    }
}

#[test]
fn test_denied_frequency_can_be_retried_after_permission() {
    let mut session = Session::new(VoiceConfig::default());
    session.connect(1, Vec3::ZERO);
    session.server.set_frequency_secured("100", true).unwrap();

    assert!(session.client(1).enable_radio(true));
    assert!(session.client(1).change_radio_frequency(1, "100"));
    session.pump();
    assert_eq!(session.client(1).radio().settings(1).unwrap().frequency, "0");

    session.server.add_permitted_frequency(1, "100").unwrap();
    assert!(session.client(1).change_radio_frequency(1, "100"));
    session.pump();
    assert_eq!(session.client(1).radio().settings(1).unwrap().frequency, "100");
    assert_eq!(session.server.frequencies().members("100").len(), 1);
}
