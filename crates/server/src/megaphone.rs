use yaca::{PlayerId, ServerEvent, StateOwner, StateValue};

use crate::error::ServerError;
use crate::server::VoiceServer;

impl VoiceServer {
    pub(crate) fn use_megaphone(&mut self, id: PlayerId, enabled: bool) -> Result<(), ServerError> {
        let player = self.player_ref(id)?;
        let current = self.state.megaphone(id);
        if current.is_some() == enabled {
            self.echo_megaphone(id, current);
            return Err(ServerError::Unchanged);
        }

        let denied = enabled
            && (player.is_muted()
                || (!self.config.megaphone.automatic_vehicle_detection
                    && !player.megaphone_permission));
        if denied {
            log::debug!("Megaphone denied for player {}", id);
            self.echo_megaphone(id, current);
            return Err(ServerError::MegaphoneDenied);
        }

        let range = self.config.megaphone.range;
        self.state.set(
            StateOwner::Player(id),
            StateValue::Megaphone(enabled.then_some(range)),
        );
        Ok(())
    }

    /// Leaving the vehicle always ends a megaphone broadcast.
    pub(crate) fn left_vehicle(&mut self, id: PlayerId) -> Result<(), ServerError> {
        self.player_ref(id)?;
        if self.state.megaphone(id).is_none() {
            return Err(ServerError::Unchanged);
        }
        self.state
            .set(StateOwner::Player(id), StateValue::Megaphone(None));
        Ok(())
    }

    /// Grants or revokes megaphone use outside of vehicle detection.
    pub fn set_megaphone_permission(&mut self, id: PlayerId, allowed: bool) -> Result<(), ServerError> {
        let player = self.player_mut(id)?;
        if player.megaphone_permission == allowed {
            return Err(ServerError::Unchanged);
        }
        player.megaphone_permission = allowed;

        if !allowed && self.state.megaphone(id).is_some() {
            self.state
                .set(StateOwner::Player(id), StateValue::Megaphone(None));
            self.flush_state();
        }
        Ok(())
    }

    fn echo_megaphone(&mut self, id: PlayerId, current: Option<f32>) {
        self.send_to(
            id,
            ServerEvent::StateChanged {
                owner: StateOwner::Player(id),
                value: StateValue::Megaphone(current),
            },
        );
    }
}
