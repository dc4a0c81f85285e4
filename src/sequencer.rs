use std::time::Instant;

use crate::hold::HoldTimer;

/// The ordered finger-count challenge. Fixed at construction: show one
/// finger, then two, then three, each held for the required duration.
pub const STAGES: [u8; 3] = [1, 2, 3];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencerEvent {
    /// Nothing changed; still waiting on the active stage.
    Pending,
    /// The active stage just confirmed and the machine advanced.
    StageCompleted(u8),
    /// The final stage just confirmed; the machine is terminal.
    AllComplete,
}

/// Pure projection of the sequencer for display, derived with no extra
/// computation: which count is required right now, which stages are done,
/// and how far along the current hold is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SequencerSnapshot {
    pub active_stage: Option<u8>,
    pub completed: [bool; 3],
    pub hold_progress: f32,
}

/// Drives the stage challenge. Stages complete strictly in order; observing
/// a wrong count only clears the active stage's hold and never touches
/// stages already completed. Once terminal, the sequencer ignores further
/// observations.
#[derive(Debug)]
pub struct StageSequencer {
    active: usize,
    completed: [bool; 3],
    hold: HoldTimer,
}

impl StageSequencer {
    pub fn new() -> Self {
        Self {
            active: 0,
            completed: [false; 3],
            hold: HoldTimer::default(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.active >= STAGES.len()
    }

    /// The finger count the active stage requires, `None` once terminal.
    pub fn target(&self) -> Option<u8> {
        STAGES.get(self.active).copied()
    }

    /// Feed one frame's classified finger count. Must not be called while a
    /// countdown is running; the session guarantees that exclusion.
    pub fn observe(&mut self, count: u8, now: Instant) -> SequencerEvent {
        let Some(target) = self.target() else {
            return SequencerEvent::Pending;
        };

        if !self.hold.update(count == target, now) {
            return SequencerEvent::Pending;
        }

        self.completed[self.active] = true;
        self.active += 1;
        self.hold.reset();

        if self.is_complete() {
            SequencerEvent::AllComplete
        } else {
            log::debug!("stage {target} confirmed, next target {:?}", self.target());
            SequencerEvent::StageCompleted(target)
        }
    }

    pub fn snapshot(&self, now: Instant) -> SequencerSnapshot {
        SequencerSnapshot {
            active_stage: self.target(),
            completed: self.completed,
            hold_progress: self.hold.progress(now),
        }
    }
}

impl Default for StageSequencer {
    fn default() -> Self {
        Self::new()
    }
}
