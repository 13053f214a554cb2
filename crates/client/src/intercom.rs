use std::collections::BTreeSet;

use yaca::{CommDevice, CommDeviceMode, CommDeviceType, EngineClientId};

use crate::context::ClientContext;

/// Both ends of an intercom talk and listen at once.
pub fn intercom_device(
    own: Option<EngineClientId>,
    peers: impl IntoIterator<Item = EngineClientId>,
    active: bool,
) -> CommDevice {
    CommDevice::new(CommDeviceType::Intercom, active)
        .own(own, CommDeviceMode::Transceiver)
        .others(peers, CommDeviceMode::Transceiver)
}

#[derive(Debug, Default)]
pub struct IntercomModule {
    peers: BTreeSet<EngineClientId>,
}

impl IntercomModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peers(&self) -> &BTreeSet<EngineClientId> {
        &self.peers
    }

    pub fn handle_intercom(
        &mut self,
        ctx: &mut ClientContext,
        active: bool,
        engine_client_ids: &[EngineClientId],
    ) {
        let peers: Vec<_> = engine_client_ids
            .iter()
            .copied()
            .filter(|id| Some(*id) != ctx.engine_client_id)
            .collect();
        if peers.is_empty() {
            return;
        }

        for peer in &peers {
            if active {
                self.peers.insert(*peer);
            } else {
                self.peers.remove(peer);
            }
        }
        ctx.outbox
            .send_engine(intercom_device(ctx.engine_client_id, peers, active));
    }

    pub fn reset(&mut self) {
        self.peers.clear();
    }
}
