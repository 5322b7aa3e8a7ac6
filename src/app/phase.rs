//! Loop phase counter.
//!
//! Wraps at a fixed period and reports a boundary each time it is at zero,
//! so the first iteration after boot is a boundary.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseCounter {
    value: u32,
    period: u32,
}

impl PhaseCounter {
    /// `period` of 0 is treated as 1 (every tick is a boundary).
    pub const fn new(period: u32) -> Self {
        Self {
            value: 0,
            period: if period == 0 { 1 } else { period },
        }
    }

    /// Advance one tick; `true` if this tick is a boundary.
    pub fn tick(&mut self) -> bool {
        let boundary = self.value == 0;
        self.value = (self.value + 1) % self.period;
        boundary
    }
}
