//! Halving emission schedule.
//!
//! Heights are split into segments:
//! - Segment 0: `[start_height, first_bonus_end_height + halving_period_length)` at `base_rate`
//! - Segment i ≥ 1: `[first_bonus_end_height + i·period, first_bonus_end_height + (i+1)·period)`
//!   at `max(1, base_rate >> i)`
//!
//! The rate floors at [`MIN_RATE`] and never reaches zero, so emission does not
//! stop at `end_of_emission_height`. Once the floor is reached every later
//! segment has the same rate, which lets the walk finish in closed form after
//! at most `log2(base_rate) + 1` segments.

use stax_core::config::IssuerConfig;
use stax_core::constants::{MAX_HALVINGS, MIN_RATE};
use stax_core::error::IssuerError;
use stax_core::traits::EmissionSchedule;

/// Production schedule implementing [`EmissionSchedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalvingSchedule {
    start_height: u64,
    first_bonus_end_height: u64,
    halving_period_length: u64,
    base_rate: u64,
}

impl HalvingSchedule {
    /// Create a schedule. `halving_period_length` must be positive;
    /// [`IssuerConfig::validate`] enforces it for config-built schedules.
    pub fn new(
        start_height: u64,
        first_bonus_end_height: u64,
        halving_period_length: u64,
        base_rate: u64,
    ) -> Self {
        Self {
            start_height,
            first_bonus_end_height,
            halving_period_length: halving_period_length.max(1),
            base_rate,
        }
    }

    pub fn from_config(config: &IssuerConfig) -> Self {
        Self::new(
            config.start_height,
            config.first_bonus_end_height,
            config.halving_period_length,
            config.base_rate,
        )
    }

    pub fn start_height(&self) -> u64 {
        self.start_height
    }

    /// Rate of segment `index`.
    fn segment_rate(&self, index: u64) -> u64 {
        if index == 0 {
            return self.base_rate;
        }
        if index > MAX_HALVINGS as u64 {
            return MIN_RATE;
        }
        (self.base_rate >> index).max(MIN_RATE)
    }

    /// Half-open bounds of segment `index`. Ends saturate at `u64::MAX`.
    fn segment_bounds(&self, index: u64) -> (u64, u64) {
        let offset = |i: u64| {
            self.first_bonus_end_height
                .saturating_add(self.halving_period_length.saturating_mul(i))
        };
        let start = if index == 0 { self.start_height } else { offset(index) };
        (start, offset(index.saturating_add(1)))
    }
}

impl EmissionSchedule for HalvingSchedule {
    fn multiplier(&self, from: u64, to: u64, current_height: u64) -> Result<u64, IssuerError> {
        let from = from.max(self.start_height);
        let to = to.min(current_height);
        if from >= to {
            return Ok(0);
        }

        let mut total: u64 = 0;
        let mut index: u64 = 0;
        loop {
            let (seg_start, seg_end) = self.segment_bounds(index);
            if seg_start >= to {
                break;
            }
            let rate = self.segment_rate(index);
            let lo = from.max(seg_start);

            // Floor reached: the rest of [lo, to) all runs at MIN_RATE.
            if index > 0 && rate == MIN_RATE {
                let span = (to - lo)
                    .checked_mul(MIN_RATE)
                    .ok_or(IssuerError::ArithmeticOverflow)?;
                total = total.checked_add(span).ok_or(IssuerError::ArithmeticOverflow)?;
                break;
            }

            let hi = to.min(seg_end);
            if hi > lo {
                let span = (hi - lo)
                    .checked_mul(rate)
                    .ok_or(IssuerError::ArithmeticOverflow)?;
                total = total.checked_add(span).ok_or(IssuerError::ArithmeticOverflow)?;
            }
            if seg_end >= to {
                break;
            }
            index += 1;
        }

        Ok(total)
    }

    fn rate_at(&self, height: u64) -> u64 {
        if height < self.start_height {
            return 0;
        }
        let (_, bonus_end) = self.segment_bounds(0);
        if height < bonus_end {
            return self.base_rate;
        }
        let index = (height - self.first_bonus_end_height) / self.halving_period_length;
        self.segment_rate(index)
    }
}
