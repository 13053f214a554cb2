use crate::config::VoiceRangeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeStep {
    Increase,
    Decrease,
}

/// Cursor into the configured voice range list. Stepping past either end wraps.
#[derive(Debug, Clone)]
pub struct VoiceRangeCursor {
    ranges: Vec<f32>,
    index: usize,
}

impl VoiceRangeCursor {
    pub fn new(config: &VoiceRangeConfig) -> Self {
        let config = config.clone().validated();
        Self {
            index: config.default_index,
            ranges: config.ranges,
        }
    }

    pub fn current(&self) -> f32 {
        self.ranges[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn step(&mut self, step: RangeStep) -> f32 {
        let len = self.ranges.len();
        self.index = match step {
            RangeStep::Increase => (self.index + 1) % len,
            RangeStep::Decrease => (self.index + len - 1) % len,
        };
        self.current()
    }

    /// Moves the cursor to an externally applied range (server override). Values
    /// not in the list leave the cursor on the closest listed entry.
    pub fn sync_to(&mut self, range: f32) {
        if let Some(index) = self
            .ranges
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (*a - range)
                    .abs()
                    .partial_cmp(&(*b - range).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
        {
            self.index = index;
        }
    }
}
