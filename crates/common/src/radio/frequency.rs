use std::fmt;
use std::str::FromStr;

pub const UNSET_FREQUENCY: &str = "0";

pub fn is_unset(frequency: &str) -> bool {
    let trimmed = frequency.trim();
    trimmed.is_empty() || trimmed == UNSET_FREQUENCY
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrequencyError {
    #[error("invalid frequency {0:?}")]
    InvalidFrequency(String),
    #[error("invalid frequency range {0:?}")]
    InvalidRange(String),
}

/// Parses a frequency for numeric comparison; `100,500` and `100.500` are the same value.
pub fn parse_frequency(frequency: &str) -> Result<f64, FrequencyError> {
    let normalized = frequency.trim().replace(',', ".");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| FrequencyError::InvalidFrequency(frequency.to_string()))
}

/// Inclusive frequency interval. A single frequency is a range with `min == max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyRange {
    pub min: f64,
    pub max: f64,
}

impl FrequencyRange {
    const EPSILON: f64 = 1e-9;

    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn single(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    pub fn contains(&self, frequency: f64) -> bool {
        frequency >= self.min - Self::EPSILON && frequency <= self.max + Self::EPSILON
    }

    pub fn contains_str(&self, frequency: &str) -> bool {
        parse_frequency(frequency).is_ok_and(|value| self.contains(value))
    }

    pub fn same_as(&self, other: &FrequencyRange) -> bool {
        (self.min - other.min).abs() < Self::EPSILON && (self.max - other.max).abs() < Self::EPSILON
    }
}

impl FromStr for FrequencyRange {
    type Err = FrequencyError;

    /// Accepts `"100.5"` or `"100.5-200"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.split_once('-') {
            Some((min, max)) if !min.trim().is_empty() => {
                let min = parse_frequency(min).map_err(|_| FrequencyError::InvalidRange(s.into()))?;
                let max = parse_frequency(max).map_err(|_| FrequencyError::InvalidRange(s.into()))?;
                Ok(Self::new(min, max))
            }
            _ => parse_frequency(trimmed).map(Self::single),
        }
    }
}

impl fmt::Display for FrequencyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if (self.min - self.max).abs() < Self::EPSILON {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}
