/// Number the visible countdown starts from.
pub const COUNTDOWN_FROM: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountdownTick {
    /// Still counting; `remaining` is the digit to show.
    Continue(u32),
    /// The countdown just expired; the shutter fires. Emitted once, after
    /// which the controller is inactive again.
    Fire,
}

/// The 3-2-1 shutter countdown. Ticks are supplied by the session's
/// one-second ticker, never by the frame loop, so the pace is wall-clock
/// even if frames stall. Inactive unless started; cancellation deactivates
/// without firing.
#[derive(Debug, Default)]
pub struct Countdown {
    remaining: Option<u32>,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.remaining.is_some()
    }

    /// Current digit, `None` while inactive.
    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    /// Begin at [`COUNTDOWN_FROM`]. Starting an already-active countdown
    /// restarts it.
    pub fn start(&mut self) {
        self.remaining = Some(COUNTDOWN_FROM);
    }

    /// Advance by one second. Returns `None` when inactive (a stray tick
    /// after cancellation is harmless).
    pub fn tick(&mut self) -> Option<CountdownTick> {
        let remaining = self.remaining?;
        if remaining <= 1 {
            self.remaining = None;
            Some(CountdownTick::Fire)
        } else {
            self.remaining = Some(remaining - 1);
            Some(CountdownTick::Continue(remaining - 1))
        }
    }

    pub fn cancel(&mut self) {
        self.remaining = None;
    }
}
