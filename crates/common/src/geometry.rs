use glam::Vec3;

pub type VehicleHandle = u32;

pub const DRIVER_SEAT: i32 = -1;
pub const FRONT_PASSENGER_SEAT: i32 = 0;

/// Forward vector of a camera given its rotation in degrees (pitch, roll, yaw).
pub fn direction_from_rotation(rotation: Vec3) -> Vec3 {
    let yaw = rotation.z.to_radians();
    let pitch = rotation.x.to_radians();
    let horizontal = pitch.cos().abs();

    Vec3::new(-yaw.sin() * horizontal, yaw.cos() * horizontal, pitch.sin())
}

/// Forward vector of an entity from its heading in degrees, on the ground plane.
pub fn direction_from_heading(heading: f32) -> Vec3 {
    direction_from_rotation(Vec3::new(0.0, 0.0, heading))
}

pub fn distance(a: Vec3, b: Vec3) -> f32 {
    a.distance(b)
}

pub fn nearest_distance(origin: Vec3, points: &[Vec3]) -> Option<f32> {
    points
        .iter()
        .map(|p| origin.distance(*p))
        .min_by(|a, b| a.total_cmp(b))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoorState {
    pub angle_ratio: f32,
    pub damaged: bool,
}

impl DoorState {
    pub fn closed() -> Self {
        Self {
            angle_ratio: 0.0,
            damaged: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.angle_ratio > 0.0 || self.damaged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RoofState {
    #[default]
    Raised = 0,
    Lowering = 1,
    Lowered = 2,
    Raising = 3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleInfo {
    pub handle: VehicleHandle,
    pub model: u32,
    pub class: u32,
    pub doors: Vec<DoorState>,
    /// Intact flag for every window the model actually has.
    pub windows: Vec<bool>,
    /// Present only for convertibles.
    pub roof: Option<RoofState>,
}

impl VehicleInfo {
    pub fn closed(handle: VehicleHandle, model: u32, class: u32, door_count: usize) -> Self {
        Self {
            handle,
            model,
            class,
            doors: vec![DoorState::closed(); door_count],
            windows: vec![true; door_count],
            roof: None,
        }
    }

    pub fn has_opening(&self, whitelist: &[u32]) -> bool {
        if whitelist.contains(&self.model) {
            return true;
        }

        // Bikes, quads and the like have nothing to close.
        if self.doors.is_empty() {
            return true;
        }

        if self.doors.iter().any(DoorState::is_open) {
            return true;
        }

        if self.windows.iter().any(|intact| !intact) {
            return true;
        }

        matches!(self.roof, Some(state) if state != RoofState::Raised)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatInfo {
    pub vehicle: VehicleHandle,
    pub seat: i32,
}

impl SeatInfo {
    pub fn is_front_seat(&self) -> bool {
        self.seat == DRIVER_SEAT || self.seat == FRONT_PASSENGER_SEAT
    }
}
