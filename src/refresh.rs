use std::time::Duration;

/// Ticks between periodic refreshes at the default 100 ms tick (20 s).
pub const DEFAULT_REFRESH_TICKS: i32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    pub tick: Duration,
    pub refresh_ticks: i32,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            refresh_ticks: DEFAULT_REFRESH_TICKS,
        }
    }
}

impl SessionTiming {
    /// Countdown units consumed per tick; one unit is 100 ms.
    fn step(&self) -> i32 {
        ((self.tick.as_millis() / 100) as i32).max(1)
    }
}

/// Paces periodic refresh. A negative count means "disabled"; the first poll after
/// being disabled fires immediately.
#[derive(Debug, Clone)]
pub struct RefreshCountdown {
    total: i32,
    remaining: i32,
    step: i32,
}

impl RefreshCountdown {
    pub fn new(timing: SessionTiming) -> Self {
        Self {
            total: timing.refresh_ticks.max(1),
            remaining: -1,
            step: timing.step(),
        }
    }

    pub fn reset(&mut self) {
        self.remaining = self.total;
    }

    pub fn disable(&mut self) {
        self.remaining = -1;
    }

    pub fn is_disabled(&self) -> bool {
        self.remaining < 0
    }

    pub fn remaining(&self) -> i32 {
        self.remaining
    }

    /// Advances one tick. Returns true when a refresh is due; the countdown restarts.
    pub fn poll(&mut self) -> bool {
        if self.remaining < 0 {
            self.remaining = self.total;
            true
        } else {
            self.remaining -= self.step;
            false
        }
    }

    pub fn progress(&self) -> f32 {
        if self.remaining < 0 {
            0.0
        } else {
            1.0 - self.remaining as f32 / self.total as f32
        }
    }
}
