use std::mem::replace;

use yaca::protocol::ChannelKind;
use yaca::{EngineClientId, EngineResponse, ProtocolError, ResponseCode, SoundState};

use crate::context::NotificationLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PluginState {
    #[default]
    NotConnected,
    Connected,
    InIngameChannel,
    InExcludedChannel,
    WrongTsServer,
    OutdatedVersion,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchAction {
    Joined {
        engine_client_id: EngineClientId,
        reconnect: bool,
    },
    StateChanged(PluginState),
    TalkingChanged(bool),
    SoundChanged {
        flag: SoundState,
        value: bool,
    },
    OtherTalking {
        engine_client_id: EngineClientId,
        talking: bool,
    },
    Notify {
        level: NotificationLevel,
        key: &'static str,
    },
    UnknownCode(String),
}

/// Plugin state machine driven by engine responses. It only decides; the
/// client applies the returned actions.
#[derive(Debug, Default)]
pub struct ResponseDispatcher {
    state: PluginState,
    sound: SoundState,
    talking: bool,
    joined_before: bool,
}

impl ResponseDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    pub fn sound_state(&self) -> SoundState {
        self.sound
    }

    pub fn is_talking(&self) -> bool {
        self.talking
    }

    pub fn dispatch_raw(&mut self, raw: &str) -> Result<Vec<DispatchAction>, ProtocolError> {
        let response = EngineResponse::parse(raw)?;
        self.dispatch(&response)
    }

    pub fn dispatch(
        &mut self,
        response: &EngineResponse,
    ) -> Result<Vec<DispatchAction>, ProtocolError> {
        let mut actions = Vec::new();

        match response.code() {
            ResponseCode::Ok => {
                if response.is_join() {
                    let engine_client_id = response.engine_client_id()?;
                    let reconnect = replace(&mut self.joined_before, true);
                    actions.push(DispatchAction::Joined {
                        engine_client_id,
                        reconnect,
                    });
                    self.transition(PluginState::Connected, &mut actions);
                }
            }
            ResponseCode::TalkState => {
                let talking = !self.sound.microphone_off() && response.is_talking_flag();
                self.set_talking(talking, &mut actions);
            }
            ResponseCode::SoundState => {
                let sound = response.sound_state()?;
                let previous = replace(&mut self.sound, sound);
                for (flag, value) in sound.changes_since(previous) {
                    actions.push(DispatchAction::SoundChanged { flag, value });
                }
                if sound.microphone_off() {
                    self.set_talking(false, &mut actions);
                }
            }
            ResponseCode::OtherTalkState => {
                let other = response.other_talk_state()?;
                actions.push(DispatchAction::OtherTalking {
                    engine_client_id: other.client_id,
                    talking: other.is_talking,
                });
            }
            ResponseCode::MovedChannel => match response.moved_channel() {
                Some(ChannelKind::Ingame) => {
                    self.transition(PluginState::InIngameChannel, &mut actions)
                }
                Some(ChannelKind::Excluded) => {
                    self.transition(PluginState::InExcludedChannel, &mut actions)
                }
                None => log::warn!("Moved to unknown channel {:?}", response.message()),
            },
            ResponseCode::WrongTsServer => {
                notify(&mut actions, "wrong_ts_server");
                self.transition(PluginState::WrongTsServer, &mut actions);
            }
            ResponseCode::OutdatedVersion => {
                notify(&mut actions, "outdated_plugin");
                self.transition(PluginState::OutdatedVersion, &mut actions);
            }
            ResponseCode::MaxPlayerCountReached => notify(&mut actions, "max_players_reached"),
            ResponseCode::LicenseServerTimedOut => {
                notify(&mut actions, "license_server_timed_out")
            }
            ResponseCode::MoveError => notify(&mut actions, "move_error"),
            ResponseCode::WaitGameInit | ResponseCode::Heartbeat | ResponseCode::MuteState => {}
            ResponseCode::Unknown(code) => {
                log::warn!("Unknown engine response code {:?}", code);
                actions.push(DispatchAction::UnknownCode(code));
            }
        }

        Ok(actions)
    }

    /// Engine connection lost. The next join counts as a reconnect.
    pub fn disconnected(&mut self) -> Vec<DispatchAction> {
        let mut actions = Vec::new();
        self.set_talking(false, &mut actions);
        self.sound = SoundState::empty();
        self.transition(PluginState::NotConnected, &mut actions);
        actions
    }

    fn set_talking(&mut self, talking: bool, actions: &mut Vec<DispatchAction>) {
        if replace(&mut self.talking, talking) != talking {
            actions.push(DispatchAction::TalkingChanged(talking));
        }
    }

    fn transition(&mut self, state: PluginState, actions: &mut Vec<DispatchAction>) {
        if replace(&mut self.state, state) != state {
            actions.push(DispatchAction::StateChanged(state));
        }
    }
}

fn notify(actions: &mut Vec<DispatchAction>, key: &'static str) {
    actions.push(DispatchAction::Notify {
        level: NotificationLevel::Error,
        key,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch(dispatcher: &mut ResponseDispatcher, raw: &str) -> Vec<DispatchAction> {
        dispatcher.dispatch_raw(raw).unwrap()
    }

    #[test]
    fn join_stores_id_and_connects() {
        let mut dispatcher = ResponseDispatcher::new();

        let actions = dispatch(
            &mut dispatcher,
            r#"{"code":"OK","requestType":"JOIN","message":"42"}"#,
        );
        assert_eq!(
            actions,
            vec![
                DispatchAction::Joined {
                    engine_client_id: 42,
                    reconnect: false
                },
                DispatchAction::StateChanged(PluginState::Connected),
            ]
        );
        assert_eq!(dispatcher.state(), PluginState::Connected);
    }

    #[test]
    fn second_join_is_a_reconnect() {
        let mut dispatcher = ResponseDispatcher::new();
        let join = r#"{"code":"OK","requestType":"JOIN","message":"42"}"#;

        dispatch(&mut dispatcher, join);
        dispatcher.disconnected();
        let actions = dispatch(&mut dispatcher, join);

        assert!(actions.contains(&DispatchAction::Joined {
            engine_client_id: 42,
            reconnect: true
        }));
    }

    #[test]
    fn ok_without_join_is_ignored() {
        let mut dispatcher = ResponseDispatcher::new();
        let actions = dispatch(
            &mut dispatcher,
            r#"{"code":"OK","requestType":"INGAME","message":""}"#,
        );
        assert!(actions.is_empty());
        assert_eq!(dispatcher.state(), PluginState::NotConnected);
    }

    #[test]
    fn talk_state_respects_microphone() {
        let mut dispatcher = ResponseDispatcher::new();

        let actions = dispatch(&mut dispatcher, r#"{"code":"TALK_STATE","message":"1"}"#);
        assert_eq!(actions, vec![DispatchAction::TalkingChanged(true)]);

        let actions = dispatch(&mut dispatcher, r#"{"code":"TALK_STATE","message":"1"}"#);
        assert!(actions.is_empty());

        dispatch(
            &mut dispatcher,
            r#"{"code":"SOUND_STATE","message":"{\"microphoneMuted\":true}"}"#,
        );
        assert!(!dispatcher.is_talking());

        let actions = dispatch(&mut dispatcher, r#"{"code":"TALK_STATE","message":"1"}"#);
        assert!(actions.is_empty());
    }

    #[test]
    fn sound_state_emits_one_event_per_changed_flag() {
        let mut dispatcher = ResponseDispatcher::new();

        let actions = dispatch(
            &mut dispatcher,
            r#"{"code":"SOUND_STATE","message":"{\"soundMuted\":true,\"soundDisabled\":true}"}"#,
        );
        assert_eq!(
            actions,
            vec![
                DispatchAction::SoundChanged {
                    flag: SoundState::SOUND_MUTED,
                    value: true
                },
                DispatchAction::SoundChanged {
                    flag: SoundState::SOUND_DISABLED,
                    value: true
                },
            ]
        );

        let actions = dispatch(
            &mut dispatcher,
            r#"{"code":"SOUND_STATE","message":"{\"soundMuted\":true}"}"#,
        );
        assert_eq!(
            actions,
            vec![DispatchAction::SoundChanged {
                flag: SoundState::SOUND_DISABLED,
                value: false
            }]
        );
    }

    #[test]
    fn moved_channel() {
        let mut dispatcher = ResponseDispatcher::new();

        let actions = dispatch(
            &mut dispatcher,
            r#"{"code":"MOVED_CHANNEL","message":"EXCLUDED_CHANNEL"}"#,
        );
        assert_eq!(
            actions,
            vec![DispatchAction::StateChanged(PluginState::InExcludedChannel)]
        );

        let actions = dispatch(
            &mut dispatcher,
            r#"{"code":"MOVED_CHANNEL","message":"LOBBY"}"#,
        );
        assert!(actions.is_empty());
        assert_eq!(dispatcher.state(), PluginState::InExcludedChannel);
    }

    #[test]
    fn error_codes_notify() {
        let mut dispatcher = ResponseDispatcher::new();

        let actions = dispatch(&mut dispatcher, r#"{"code":"WRONG_TS_SERVER","message":""}"#);
        assert_eq!(
            actions,
            vec![
                DispatchAction::Notify {
                    level: NotificationLevel::Error,
                    key: "wrong_ts_server"
                },
                DispatchAction::StateChanged(PluginState::WrongTsServer),
            ]
        );

        let actions = dispatch(&mut dispatcher, r#"{"code":"MOVE_ERROR","message":""}"#);
        assert_eq!(actions.len(), 1);
        assert_eq!(dispatcher.state(), PluginState::WrongTsServer);
    }

    #[test]
    fn legacy_codes_do_nothing() {
        let mut dispatcher = ResponseDispatcher::new();
        for code in ["WAIT_GAME_INIT", "HEARTBEAT", "MUTE_STATE"] {
            let raw = format!(r#"{{"code":"{}","message":""}}"#, code);
            assert!(dispatch(&mut dispatcher, &raw).is_empty());
        }
    }

    #[test]
    fn unknown_code_is_surfaced() {
        let mut dispatcher = ResponseDispatcher::new();
        let actions = dispatch(&mut dispatcher, r#"{"code":"SOMETHING_NEW","message":""}"#);
        assert_eq!(
            actions,
            vec![DispatchAction::UnknownCode("SOMETHING_NEW".to_string())]
        );
    }

    #[test]
    fn malformed_payload_leaves_state_untouched() {
        let mut dispatcher = ResponseDispatcher::new();

        assert!(dispatcher.dispatch_raw("not json").is_err());
        assert!(
            dispatcher
                .dispatch_raw(r#"{"code":"SOUND_STATE","message":"{oops"}"#)
                .is_err()
        );
        assert!(
            dispatcher
                .dispatch_raw(r#"{"code":"OK","requestType":"JOIN","message":"abc"}"#)
                .is_err()
        );
        assert_eq!(dispatcher.state(), PluginState::NotConnected);
        assert_eq!(dispatcher.sound_state(), SoundState::empty());
    }

    #[test]
    fn other_talk_state() {
        let mut dispatcher = ResponseDispatcher::new();
        let actions = dispatch(
            &mut dispatcher,
            r#"{"code":"OTHER_TALK_STATE","message":"{\"clientId\":7,\"isTalking\":true}"}"#,
        );
        assert_eq!(
            actions,
            vec![DispatchAction::OtherTalking {
                engine_client_id: 7,
                talking: true
            }]
        );
    }
}
