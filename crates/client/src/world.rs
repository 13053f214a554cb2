use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use glam::Vec3;

use yaca::{PlayerId, SeatInfo, VehicleHandle, VehicleInfo};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PedState {
    pub position: Vec3,
    /// Degrees, game convention (0 = north, counter-clockwise).
    pub heading: f32,
    pub is_underwater: bool,
    pub seat: Option<SeatInfo>,
    /// Interior room key, 0 when outside.
    pub room_key: u32,
}

impl PedState {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            heading: 0.0,
            is_underwater: false,
            seat: None,
            room_key: 0,
        }
    }
}

/// Read access to the game world. Implemented by the host runtime.
pub trait WorldQuery {
    /// `None` when the player has no ped streamed in.
    fn ped(&self, player: PlayerId) -> Option<PedState>;

    /// `None` for handles that no longer point at a vehicle.
    fn vehicle(&self, handle: VehicleHandle) -> Option<VehicleInfo>;

    /// Players the game currently simulates around the local player.
    fn players_in_scope(&self) -> Vec<PlayerId>;

    fn has_clear_line_of_sight(&self, from: PlayerId, to: PlayerId) -> bool;

    /// Gameplay camera rotation in degrees (pitch, roll, yaw).
    fn camera_rotation(&self) -> Vec3;
}

#[derive(Debug, Default)]
struct WorldData {
    peds: HashMap<PlayerId, PedState>,
    vehicles: HashMap<VehicleHandle, VehicleInfo>,
    blocked_sight: HashSet<(PlayerId, PlayerId)>,
    camera_rotation: Vec3,
}

/// In-memory world. Clones share the same data, so a host or test can keep a
/// handle and move peds around after the client took ownership of another.
#[derive(Debug, Clone, Default)]
pub struct StaticWorld {
    data: Rc<RefCell<WorldData>>,
}

impl StaticWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ped(&self, player: PlayerId, ped: PedState) {
        self.data.borrow_mut().peds.insert(player, ped);
    }

    pub fn update_ped(&self, player: PlayerId, update: impl FnOnce(&mut PedState)) {
        if let Some(ped) = self.data.borrow_mut().peds.get_mut(&player) {
            update(ped);
        }
    }

    pub fn remove_ped(&self, player: PlayerId) {
        self.data.borrow_mut().peds.remove(&player);
    }

    pub fn set_vehicle(&self, vehicle: VehicleInfo) {
        self.data
            .borrow_mut()
            .vehicles
            .insert(vehicle.handle, vehicle);
    }

    pub fn remove_vehicle(&self, handle: VehicleHandle) {
        self.data.borrow_mut().vehicles.remove(&handle);
    }

    pub fn block_line_of_sight(&self, a: PlayerId, b: PlayerId) {
        let mut data = self.data.borrow_mut();
        data.blocked_sight.insert((a, b));
        data.blocked_sight.insert((b, a));
    }

    pub fn set_camera_rotation(&self, rotation: Vec3) {
        self.data.borrow_mut().camera_rotation = rotation;
    }
}

impl WorldQuery for StaticWorld {
    fn ped(&self, player: PlayerId) -> Option<PedState> {
        self.data.borrow().peds.get(&player).copied()
    }

    fn vehicle(&self, handle: VehicleHandle) -> Option<VehicleInfo> {
        self.data.borrow().vehicles.get(&handle).cloned()
    }

    fn players_in_scope(&self) -> Vec<PlayerId> {
        let mut players: Vec<_> = self.data.borrow().peds.keys().copied().collect();
        players.sort_unstable();
        players
    }

    fn has_clear_line_of_sight(&self, from: PlayerId, to: PlayerId) -> bool {
        !self.data.borrow().blocked_sight.contains(&(from, to))
    }

    fn camera_rotation(&self) -> Vec3 {
        self.data.borrow().camera_rotation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_data() {
        let world = StaticWorld::new();
        let handle = world.clone();

        handle.set_ped(3, PedState::at(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(world.players_in_scope(), vec![3]);

        handle.update_ped(3, |ped| ped.is_underwater = true);
        assert!(world.ped(3).is_some_and(|ped| ped.is_underwater));
    }

    #[test]
    fn blocked_sight_is_symmetric() {
        let world = StaticWorld::new();
        world.block_line_of_sight(1, 2);

        assert!(!world.has_clear_line_of_sight(2, 1));
        assert!(world.has_clear_line_of_sight(1, 3));
    }
}
