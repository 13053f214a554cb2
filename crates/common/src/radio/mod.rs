mod frequency;
mod signal;

pub use frequency::{
    FrequencyError, FrequencyRange, UNSET_FREQUENCY, is_unset, parse_frequency,
};
pub use signal::{RadioReach, effective_error_level, radio_reach, tower_signal_strength};
