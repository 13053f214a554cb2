/// Error level contributed by a tower link, 0 at the tower and approaching 1 at
/// `max_distance`.
pub fn tower_signal_strength(distance: f32, max_distance: f32) -> f32 {
    if max_distance <= 0.0 {
        return 1.0;
    }
    let ratio = (distance / max_distance).max(0.0);
    ((1.0 + 8.5 * ratio).log10() / 10f32.log10()).clamp(0.0, 1.0)
}

/// The weakest link wins: any degraded side degrades the whole transmission.
pub fn effective_error_level(sender: Option<f32>, receiver: Option<f32>, global: f32) -> f32 {
    [sender, receiver, Some(global)]
        .into_iter()
        .flatten()
        .fold(0.0, f32::max)
        .clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioReach {
    ShortRange,
    LongRange,
}

/// Short range reaches short range, long range reaches long range. Mixed pairs
/// cannot hear each other.
pub fn radio_reach(sender_long_range: bool, receiver_long_range: bool) -> Option<RadioReach> {
    match (sender_long_range, receiver_long_range) {
        (false, false) => Some(RadioReach::ShortRange),
        (true, true) => Some(RadioReach::LongRange),
        _ => None,
    }
}
