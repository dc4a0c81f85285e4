use std::time::{Duration, Instant};

/// How long the target finger count must be held, uninterrupted, before a
/// stage confirms.
pub const REQUIRED_HOLD: Duration = Duration::from_millis(1_500);

/// Tracks an uninterrupted run of "the observed count matches the target"
/// observations against wall-clock time, so confirmation speed does not
/// depend on the camera frame rate.
///
/// Any single mismatching observation clears the run immediately. There is no
/// grace window for flicker; transient misclassifications simply restart the
/// hold, which keeps the timer trivially predictable.
#[derive(Debug)]
pub struct HoldTimer {
    required: Duration,
    hold_start: Option<Instant>,
    confirmed: bool,
}

impl HoldTimer {
    pub fn new(required: Duration) -> Self {
        Self {
            required,
            hold_start: None,
            confirmed: false,
        }
    }

    /// Feed one observation. Returns `true` exactly once per hold run, at the
    /// first observation where the run has lasted at least the required
    /// duration.
    pub fn update(&mut self, matches: bool, now: Instant) -> bool {
        if !matches {
            self.hold_start = None;
            self.confirmed = false;
            return false;
        }

        let start = *self.hold_start.get_or_insert(now);
        if self.confirmed {
            return false;
        }
        if now.duration_since(start) >= self.required {
            self.confirmed = true;
            return true;
        }
        false
    }

    /// Normalized progress of the current run, 0.0 when idle, capped at 1.0.
    pub fn progress(&self, now: Instant) -> f32 {
        match self.hold_start {
            Some(start) => {
                let elapsed = now.duration_since(start).as_secs_f32();
                (elapsed / self.required.as_secs_f32()).min(1.0)
            }
            None => 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.hold_start = None;
        self.confirmed = false;
    }
}

impl Default for HoldTimer {
    fn default() -> Self {
        Self::new(REQUIRED_HOLD)
    }
}
