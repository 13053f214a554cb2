use rand::distr::{Alphanumeric, SampleString};
use yaca::NameConfig;

use crate::error::ServerError;

/// Produces the random part of a voice name.
pub trait NameSource {
    fn next_suffix(&mut self, length: usize) -> String;
}

impl<F> NameSource for F
where
    F: FnMut(usize) -> String,
{
    fn next_suffix(&mut self, length: usize) -> String {
        self(length)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomNames;

impl NameSource for RandomNames {
    fn next_suffix(&mut self, length: usize) -> String {
        Alphanumeric.sample_string(&mut rand::rng(), length)
    }
}

/// Draws names until one is free or the attempts run out.
pub fn generate_name(
    source: &mut dyn NameSource,
    config: &NameConfig,
    taken: impl Fn(&str) -> bool,
) -> Result<String, ServerError> {
    let attempts = config.max_attempts.max(1);
    for attempt in 1..=attempts {
        let name = format!("{}{}", config.prefix, source.next_suffix(config.length));
        if !taken(&name) {
            return Ok(name);
        }
        log::debug!("Voice name {} taken (attempt {})", name, attempt);
    }
    Err(ServerError::NamesExhausted(attempts))
}
