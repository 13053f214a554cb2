use yaca::{MufflingConfig, VehicleInfo};

/// Where a participant is, as far as muffling is concerned.
#[derive(Debug, Clone, Copy)]
pub struct Occupancy<'a> {
    pub room_key: u32,
    pub vehicle: Option<&'a VehicleInfo>,
}

impl Occupancy<'_> {
    fn vehicle_is_open(&self, whitelist: &[u32]) -> bool {
        self.vehicle.is_none_or(|vehicle| vehicle.has_opening(whitelist))
    }
}

/// Muffle intensity the observer hears the remote participant with. Always
/// either 0 or one of the configured intensities.
pub fn muffle_intensity(
    config: &MufflingConfig,
    observer: &Occupancy<'_>,
    remote: &Occupancy<'_>,
    remote_uses_megaphone: bool,
    line_of_sight: impl FnOnce() -> bool,
) -> u8 {
    let intensities = &config.intensities;

    if observer.room_key != remote.room_key && !line_of_sight() {
        return intensities.different_room;
    }

    if !config.vehicle_muffling_active() {
        return 0;
    }

    let observer_vehicle = observer.vehicle.map(|v| v.handle);
    let remote_vehicle = remote.vehicle.map(|v| v.handle);
    if observer_vehicle == remote_vehicle {
        return 0;
    }

    let whitelist = &config.vehicle_opening_whitelist;
    let observer_open = observer.vehicle_is_open(whitelist);

    if remote_uses_megaphone {
        return if observer_open {
            0
        } else {
            intensities.megaphone_in_car
        };
    }

    match (observer_open, remote.vehicle_is_open(whitelist)) {
        (false, false) => intensities.both_car_doors_closed,
        (true, true) => 0,
        _ => intensities.one_car_door_closed,
    }
}
