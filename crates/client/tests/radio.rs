mod common;

use std::time::Duration;

use glam::Vec3;

use yaca::protocol::IngameUpdate;
use yaca::{
    ClientEvent, CommDeviceMode, CommDeviceType, EngineFrame, ServerEvent, StereoMode,
    VoiceConfig,
};
use yaca_client::{AnimationCommand, AssetRegistry, StaticWorld, StreamingError, VoiceClient};

use common::*;

fn radio_client(config: VoiceConfig) -> (VoiceClient, StaticWorld) {
    let world = StaticWorld::new();
    let mut client = joined_client(config, &world);
    assert!(client.enable_radio(true));
    drain(&mut client);
    (client, world)
}

fn tune(client: &mut VoiceClient, channel: u8, frequency: &str) {
    client.change_radio_frequency(channel, frequency);
    client.handle_server_event(ServerEvent::RadioFrequencySet {
        channel,
        frequency: frequency.to_string(),
    });
}

fn animations(client: &mut VoiceClient) -> Vec<AnimationCommand> {
    client.outbox().drain_animations().collect()
}

#[test]
fn test_enable_radio_is_idempotent() {
    let world = StaticWorld::new();
    let mut client = joined_client(VoiceConfig::default(), &world);

    assert!(client.enable_radio(true));
    assert!(!client.enable_radio(true));
    assert_eq!(
        server_events(&mut client),
        vec![ClientEvent::EnableRadio { enabled: true }]
    );

    let radio = client.radio();
    assert!(radio.is_enabled());
    assert_eq!(radio.settings(1).unwrap().frequency, "0");
    assert!(radio.settings(9).is_some());
    assert!(radio.settings(10).is_none());
}

#[test]
fn test_frequency_waits_for_server() {
    let (mut client, _world) = radio_client(VoiceConfig::default());

    assert!(client.change_radio_frequency(1, "100.5"));
    assert_eq!(
        server_events(&mut client),
        vec![ClientEvent::ChangeRadioFrequency {
            channel: 1,
            frequency: "100.5".to_string()
        }]
    );
    assert_eq!(client.radio().settings(1).unwrap().frequency, "0");

    client.handle_server_event(ServerEvent::RadioFrequencySet {
        channel: 1,
        frequency: "100.5".to_string(),
    });
    assert_eq!(client.radio().settings(1).unwrap().frequency, "100.5");
}

#[test]
fn test_unconfirmed_frequency_can_be_requested_again() {
    let (mut client, _world) = radio_client(VoiceConfig::default());

    assert!(client.change_radio_frequency(1, "100"));
    assert!(client.change_radio_frequency(1, "100"));
    let request = ClientEvent::ChangeRadioFrequency {
        channel: 1,
        frequency: "100".to_string(),
    };
    assert_eq!(server_events(&mut client), vec![request.clone(), request]);
    assert_eq!(client.radio().settings(1).unwrap().frequency, "0");
}

#[test]
fn test_same_frequency_is_noop() {
    let (mut client, _world) = radio_client(VoiceConfig::default());
    tune(&mut client, 1, "100.5");
    drain(&mut client);

    assert!(!client.change_radio_frequency(1, "100.5"));
    assert!(!client.change_radio_frequency(1, " 100.5 "));
    assert!(server_events(&mut client).is_empty());
    assert!(engine_frames(&mut client).is_empty());
}

#[test]
fn test_frequency_change_needs_radio() {
    let world = StaticWorld::new();
    let mut client = joined_client(VoiceConfig::default(), &world);

    assert!(!client.change_radio_frequency(1, "100"));
    assert!(server_events(&mut client).is_empty());
}

#[test]
fn test_talking_guards() {
    let world = StaticWorld::new();
    let mut client = joined_client(VoiceConfig::default(), &world);

    assert!(!client.radio_talking_start(true, 1));

    client.enable_radio(true);
    assert!(!client.radio_talking_start(true, 1));

    tune(&mut client, 1, "100");
    drain(&mut client);

    assert!(client.radio_talking_start(true, 1));
    let first_devices = devices(&mut client);
    let first_events = server_events(&mut client);
    assert_eq!(first_devices.len(), 1);
    assert_eq!(first_devices[0].comm_type, CommDeviceType::Radio);
    assert_eq!(first_devices[0].channel, Some(1));
    assert_eq!(first_devices[0].members[0].mode, CommDeviceMode::Sender);
    assert_eq!(
        first_events,
        vec![ClientEvent::RadioTalking {
            channel: 1,
            talking: true,
            tower_distance: None
        }]
    );

    assert!(!client.radio_talking_start(true, 1));
    assert!(engine_frames(&mut client).is_empty());
    assert!(server_events(&mut client).is_empty());

    assert!(client.radio_talking_start(false, 1));
    assert!(!client.radio_talking_start(false, 1));
    assert_eq!(
        server_events(&mut client),
        vec![ClientEvent::RadioTalking {
            channel: 1,
            talking: false,
            tower_distance: None
        }]
    );
}

#[test]
fn test_tower_reports_follow_talking() {
    let mut config = VoiceConfig::default();
    config.radio.use_towers = true;
    config.radio.towers = vec![Vec3::new(100.0, 0.0, 0.0), Vec3::new(0.0, 300.0, 0.0)];
    let (mut client, _world) = radio_client(config);
    tune(&mut client, 2, "42");
    drain(&mut client);

    client.radio_talking_start(true, 2);
    assert_eq!(
        server_events(&mut client),
        vec![ClientEvent::RadioTalking {
            channel: 2,
            talking: true,
            tower_distance: Some(100.0)
        }]
    );
    assert!(client.radio().has_tower_timer(2));

    client.radio_talking_start(true, 2);
    client.update(Duration::from_millis(1000));
    let reports: Vec<_> = server_events(&mut client)
        .into_iter()
        .filter(|e| matches!(e, ClientEvent::RadioTowerDistance { .. }))
        .collect();
    assert_eq!(
        reports,
        vec![ClientEvent::RadioTowerDistance {
            channel: 2,
            distance: 100.0
        }]
    );

    client.radio_talking_start(false, 2);
    assert!(!client.radio().has_tower_timer(2));
    drain(&mut client);
    client.update(Duration::from_millis(3000));
    assert!(
        server_events(&mut client)
            .iter()
            .all(|e| !matches!(e, ClientEvent::RadioTowerDistance { .. }))
    );
}

#[test]
fn test_retune_leaves_old_frequency_first() {
    let (mut client, world) = radio_client(VoiceConfig::default());
    add_remote(&mut client, &world, 2, Vec3::new(500.0, 0.0, 0.0));
    tune(&mut client, 1, "100");
    client.radio_talking_start(true, 1);
    client.handle_server_event(ServerEvent::RadioTalking {
        sender: 2,
        engine_client_id: engine_id(2),
        channel: 1,
        talking: true,
        error_level: 0.0,
    });
    drain(&mut client);

    tune(&mut client, 1, "200");
    assert!(!client.radio().is_talking(1));
    assert_eq!(client.radio().receiving_from(1).count(), 0);

    let devices = devices(&mut client);
    assert!(devices.iter().all(|d| !d.on));
    assert_eq!(devices.len(), 2);
    assert_eq!(client.radio().settings(1).unwrap().frequency, "200");
}

#[test]
fn test_remote_talking_uses_error_level() {
    let (mut client, world) = radio_client(VoiceConfig::default());
    add_remote(&mut client, &world, 2, Vec3::new(500.0, 0.0, 0.0));
    tune(&mut client, 3, "55.5");
    drain(&mut client);

    client.handle_server_event(ServerEvent::RadioTalking {
        sender: 2,
        engine_client_id: engine_id(2),
        channel: 3,
        talking: true,
        error_level: 0.4,
    });
    let on = devices(&mut client);
    assert_eq!(on.len(), 1);
    assert!(on[0].on);
    assert_eq!(on[0].error_level, Some(0.4));
    assert_eq!(on[0].members[0].client_id, LOCAL_ENGINE);
    assert_eq!(on[0].members[0].mode, CommDeviceMode::Receiver);
    assert_eq!(on[0].members[1].client_id, engine_id(2));
    assert_eq!(on[0].members[1].mode, CommDeviceMode::Sender);

    client.handle_server_event(ServerEvent::RadioTalking {
        sender: 2,
        engine_client_id: engine_id(2),
        channel: 3,
        talking: false,
        error_level: 0.0,
    });
    let off = devices(&mut client);
    assert_eq!(off.len(), 1);
    assert!(!off[0].on);

    // Already silent.
    client.handle_server_event(ServerEvent::RadioTalking {
        sender: 2,
        engine_client_id: engine_id(2),
        channel: 3,
        talking: false,
        error_level: 0.0,
    });
    assert!(devices(&mut client).is_empty());
}

#[test]
fn test_muted_channel_ignores_senders() {
    let (mut client, world) = radio_client(VoiceConfig::default());
    add_remote(&mut client, &world, 2, Vec3::new(500.0, 0.0, 0.0));
    tune(&mut client, 1, "100");

    assert!(client.mute_radio_channel(1));
    assert_eq!(
        server_events(&mut client)
            .into_iter()
            .filter(|e| matches!(e, ClientEvent::MuteRadioChannel { .. }))
            .collect::<Vec<_>>(),
        vec![ClientEvent::MuteRadioChannel {
            channel: 1,
            muted: true
        }]
    );
    client.handle_server_event(ServerEvent::RadioMuteSet {
        channel: 1,
        muted: true,
    });
    drain(&mut client);

    client.handle_server_event(ServerEvent::RadioTalking {
        sender: 2,
        engine_client_id: engine_id(2),
        channel: 1,
        talking: true,
        error_level: 0.0,
    });
    assert!(devices(&mut client).is_empty());
}

#[test]
fn test_disable_radio_silences_everything() {
    let (mut client, world) = radio_client(VoiceConfig::default());
    add_remote(&mut client, &world, 2, Vec3::new(500.0, 0.0, 0.0));
    tune(&mut client, 1, "100");
    tune(&mut client, 2, "200");
    client.radio_talking_start(true, 2);
    client.handle_server_event(ServerEvent::RadioTalking {
        sender: 2,
        engine_client_id: engine_id(2),
        channel: 1,
        talking: true,
        error_level: 0.0,
    });
    drain(&mut client);

    assert!(client.enable_radio(false));
    let devices = devices(&mut client);
    assert_eq!(devices.len(), 2);
    assert!(devices.iter().all(|d| !d.on));
    assert!(!client.radio().is_talking(2));
    assert_eq!(client.radio().receiving_from(1).count(), 0);

    let events = server_events(&mut client);
    assert_eq!(events.last(), Some(&ClientEvent::EnableRadio { enabled: false }));
}

#[test]
fn test_members_left_notice() {
    let (mut client, _world) = radio_client(VoiceConfig::default());
    tune(&mut client, 1, "100");
    drain(&mut client);

    client.handle_server_event(ServerEvent::RadioMembersLeft {
        channel: 1,
        engine_client_ids: vec![engine_id(4)],
    });
    let frames = engine_frames(&mut client);
    match &frames[..] {
        [EngineFrame::Ingame(IngameUpdate::CommDeviceLeft(left))] => {
            assert_eq!(left.channel, 1);
            assert_eq!(left.client_ids, vec![engine_id(4)]);
        }
        other => panic!("unexpected frames {:?}", other),
    }
}

#[test]
fn test_whisper_targets_follow_own_talking() {
    let mut config = VoiceConfig::default();
    config.teamspeak.use_whisper = true;
    let (mut client, _world) = radio_client(config);
    tune(&mut client, 1, "100");
    drain(&mut client);

    client.radio_talking_start(true, 1);
    assert!(devices(&mut client).is_empty());

    client.handle_server_event(ServerEvent::RadioWhisperTargets {
        channel: 1,
        talking: true,
        engine_client_ids: vec![200, 300],
    });
    let on = devices(&mut client);
    assert_eq!(on.len(), 1);
    assert_eq!(on[0].members.len(), 3);
    assert_eq!(on[0].members[1].mode, CommDeviceMode::Receiver);

    client.radio_talking_start(false, 1);
    let off = devices(&mut client);
    assert_eq!(off.len(), 1);
    assert!(!off[0].on);
    assert_eq!(off[0].members.len(), 3);
}

#[test]
fn test_animation_completion_after_stop_is_ignored() {
    let (mut client, _world) = radio_client(VoiceConfig::default());
    tune(&mut client, 1, "100");
    drain(&mut client);

    client.radio_talking_start(true, 1);
    let ticket = match animations(&mut client).as_slice() {
        [AnimationCommand::Stream(ticket)] => *ticket,
        other => panic!("unexpected animations {:?}", other),
    };

    client.animation_streamed(ticket, Ok(()));
    assert_eq!(animations(&mut client), vec![AnimationCommand::Play(ticket)]);

    client.radio_talking_start(false, 1);
    assert!(matches!(
        animations(&mut client).as_slice(),
        [AnimationCommand::Stop { .. }]
    ));

    client.animation_streamed(ticket, Ok(()));
    assert!(animations(&mut client).is_empty());
}

#[test]
fn test_animation_timeout_is_skipped() {
    let (mut client, _world) = radio_client(VoiceConfig::default());
    tune(&mut client, 1, "100");
    client.radio_talking_start(true, 1);
    let ticket = match animations(&mut client).as_slice() {
        [AnimationCommand::Stream(ticket)] => *ticket,
        other => panic!("unexpected animations {:?}", other),
    };

    client.animation_streamed(
        ticket,
        Err(StreamingError::Timeout {
            asset: ticket.dictionary.to_string(),
            after: Duration::from_secs(5),
        }),
    );
    assert!(animations(&mut client).is_empty());
    assert!(client.radio().is_talking(1));
}

#[tokio::test(start_paused = true)]
async fn test_streamed_dictionary_starts_animation() {
    let (mut client, _world) = radio_client(VoiceConfig::default());
    tune(&mut client, 1, "100");
    client.radio_talking_start(true, 1);
    let ticket = match animations(&mut client).as_slice() {
        [AnimationCommand::Stream(ticket)] => *ticket,
        other => panic!("unexpected animations {:?}", other),
    };

    let registry = AssetRegistry::new();
    registry.mark_loaded(ticket.dictionary);
    client.stream_animation(&registry, ticket).await;
    assert_eq!(animations(&mut client), vec![AnimationCommand::Play(ticket)]);
}

#[tokio::test(start_paused = true)]
async fn test_missing_dictionary_times_out_quietly() {
    let (mut client, _world) = radio_client(VoiceConfig::default());
    tune(&mut client, 1, "100");
    client.radio_talking_start(true, 1);
    let ticket = match animations(&mut client).as_slice() {
        [AnimationCommand::Stream(ticket)] => *ticket,
        other => panic!("unexpected animations {:?}", other),
    };

    let registry = AssetRegistry::new();
    client.stream_animation(&registry, ticket).await;
    assert!(animations(&mut client).is_empty());
    assert!(client.radio().is_talking(1));
}

#[test]
fn test_volume_and_stereo_settings() {
    let (mut client, _world) = radio_client(VoiceConfig::default());

    // Already at full volume.
    assert!(!client.change_radio_volume(1, 0.5));
    assert!(client.change_radio_volume(1, -0.75));
    assert_eq!(client.radio().settings(1).unwrap().volume, 0.25);

    assert!(client.cycle_radio_stereo(1));
    assert_eq!(client.radio().settings(1).unwrap().stereo, StereoMode::MonoLeft);

    let frames = engine_frames(&mut client);
    assert_eq!(frames.len(), 2);
    match &frames[1] {
        EngineFrame::Ingame(IngameUpdate::CommDeviceSettings(settings)) => {
            assert_eq!(settings.output_mode, Some(StereoMode::MonoLeft));
            assert_eq!(settings.channel, Some(1));
            assert_eq!(settings.volume, None);
        }
        other => panic!("unexpected frame {:?}", other),
    }
}

#[test]
fn test_reconnect_reapplies_settings() {
    let (mut client, _world) = radio_client(VoiceConfig::default());
    client.set_radio_volume(4, 0.3);

    client.on_engine_disconnected();
    assert!(!client.is_ticking());
    client.on_engine_connected();
    drain(&mut client);

    client.handle_engine_message(JOIN);
    assert!(client.is_ticking());
    let settings: Vec<_> = engine_frames(&mut client)
        .into_iter()
        .filter_map(|frame| match frame {
            EngineFrame::Ingame(IngameUpdate::CommDeviceSettings(settings)) => Some(settings),
            _ => None,
        })
        .collect();
    assert_eq!(settings.len(), 9);
    assert_eq!(settings[3].volume, Some(0.3));
    assert!(server_events(&mut client).contains(&ClientEvent::EngineReady {
        engine_client_id: LOCAL_ENGINE
    }));
}
