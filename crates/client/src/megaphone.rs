use yaca::{ClientEvent, CommDevice, CommDeviceMode, CommDeviceType, PlayerId};

use crate::context::ClientContext;

#[derive(Debug, Default)]
pub struct MegaphoneModule {
    /// Host-granted permission, only consulted without vehicle detection.
    manual_permission: bool,
    pending: Option<bool>,
    left_vehicle_reported: bool,
}

impl MegaphoneModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_manual_permission(&mut self, allowed: bool) {
        self.manual_permission = allowed;
    }

    pub fn is_active(&self, ctx: &ClientContext) -> bool {
        ctx.state.megaphone(ctx.local_id).is_some()
    }

    pub fn can_use(&self, ctx: &ClientContext) -> bool {
        let config = &ctx.config.megaphone;
        if !config.automatic_vehicle_detection {
            return self.manual_permission;
        }

        let Some(seat) = ctx.world.ped(ctx.local_id).and_then(|ped| ped.seat) else {
            return false;
        };
        if !seat.is_front_seat() {
            return false;
        }
        ctx.world.vehicle(seat.vehicle).is_some_and(|vehicle| {
            config.allowed_vehicle_classes.contains(&vehicle.class)
                || config.allowed_vehicle_models.contains(&vehicle.model)
        })
    }

    pub fn use_megaphone(&mut self, ctx: &mut ClientContext, enabled: bool) -> bool {
        let current = self.pending.unwrap_or_else(|| self.is_active(ctx));
        if current == enabled {
            return false;
        }
        if enabled && !self.can_use(ctx) {
            log::debug!("Megaphone not available here");
            return false;
        }

        self.pending = Some(enabled);
        ctx.outbox.send_server(ClientEvent::UseMegaphone { enabled });
        true
    }

    /// Reports leaving the vehicle once while the megaphone is still on, so
    /// the server can switch it off.
    pub fn check_vehicle(&mut self, ctx: &mut ClientContext) {
        if !ctx.config.megaphone.automatic_vehicle_detection || !self.is_active(ctx) {
            return;
        }
        if self.left_vehicle_reported || self.can_use(ctx) {
            return;
        }

        self.left_vehicle_reported = true;
        ctx.outbox.send_server(ClientEvent::LeftVehicle);
    }

    /// Replicated megaphone state of a player changed.
    pub fn apply_state(&mut self, ctx: &mut ClientContext, owner: PlayerId, range: Option<f32>) {
        let on = range.is_some();
        let range = range.unwrap_or(ctx.config.megaphone.range);

        let device = if owner == ctx.local_id {
            self.pending = None;
            if !on {
                self.left_vehicle_reported = false;
            }
            CommDevice::new(CommDeviceType::Megaphone, on)
                .own(ctx.engine_client_id, CommDeviceMode::Sender)
        } else {
            let Some(engine_client_id) = ctx.roster.engine_id(owner) else {
                return;
            };
            CommDevice::new(CommDeviceType::Megaphone, on)
                .own(ctx.engine_client_id, CommDeviceMode::Receiver)
                .others([engine_client_id], CommDeviceMode::Sender)
        };

        ctx.outbox.send_engine(device.range(range));
    }

    /// The server answered a toggle request, accepted or not.
    pub fn settle(&mut self) {
        self.pending = None;
    }

    pub fn reset(&mut self) {
        self.pending = None;
        self.left_vehicle_reported = false;
    }
}
