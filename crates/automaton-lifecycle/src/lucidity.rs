//! Terminal lucidity — the bounded restoration window before exit.

use serde::{Deserialize, Serialize};

/// What a consumed turn meant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LucidityTick {
    /// Window active; this many turns remain after the one just consumed.
    Consumed(u32),
    /// The turn just consumed was the last lucid one; degraded profile
    /// resumes from here.
    Exhausted,
    /// One post-lucidity turn has passed; the process may exit and run
    /// bequests.
    ExitSignal,
    /// Nothing left to do; exit was already signaled.
    Done,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LucidityWindow {
    pub turns_remaining: u32,
    pub active: bool,
    pub exit_signaled: bool,
}

impl LucidityWindow {
    pub fn activate(turns: u32) -> Self {
        Self {
            turns_remaining: turns,
            active: turns > 0,
            exit_signaled: false,
        }
    }

    pub fn is_lucid(&self) -> bool {
        self.active && self.turns_remaining > 0
    }

    pub fn consume_turn(&mut self) -> LucidityTick {
        if self.active && self.turns_remaining > 0 {
            self.turns_remaining -= 1;
            if self.turns_remaining == 0 {
                self.active = false;
                LucidityTick::Exhausted
            } else {
                LucidityTick::Consumed(self.turns_remaining)
            }
        } else if !self.exit_signaled {
            self.exit_signaled = true;
            LucidityTick::ExitSignal
        } else {
            LucidityTick::Done
        }
    }
}
