//! Death saves.
//!
//! Each save is a plain d20:
//! - natural 20: the character stabilizes at once
//! - natural 1: two failures
//! - 10 to 19: one success
//! - 2 to 9: one failure
//!
//! Three successes stabilize, three failures expire. Either way both tallies
//! reset for the next episode.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Strikes needed to resolve a death save.
pub const STRIKES: u32 = 3;

/// Where a death-save episode stands after a roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeathSaveStatus {
    /// Neither tally has reached three.
    Accumulating,
    /// Three successes, or a natural 20.
    Stabilized,
    /// Three failures.
    Expired,
}

impl std::fmt::Display for DeathSaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accumulating => write!(f, "accumulating"),
            Self::Stabilized => write!(f, "stabilized"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// The running success and failure tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathSaves {
    /// Successes so far, always below three.
    pub successes: u32,
    /// Failures so far, always below three.
    pub failures: u32,
}

impl DeathSaves {
    /// Apply one d20 result and report the new status.
    pub fn apply(&mut self, roll: u32) -> DeathSaveStatus {
        match roll {
            20 => {
                self.reset();
                return DeathSaveStatus::Stabilized;
            }
            1 => self.failures += 2,
            10..=19 => self.successes += 1,
            _ => self.failures += 1,
        }

        if self.successes >= STRIKES {
            self.reset();
            DeathSaveStatus::Stabilized
        } else if self.failures >= STRIKES {
            self.reset();
            DeathSaveStatus::Expired
        } else {
            DeathSaveStatus::Accumulating
        }
    }

    /// Clear both tallies.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The result of one death save.
#[derive(Debug, Serialize)]
pub struct DeathSaveReport {
    /// The raw d20.
    pub roll: u32,
    /// Status after the roll.
    pub status: DeathSaveStatus,
    /// Successes after the roll (zero once resolved).
    pub successes: u32,
    /// Failures after the roll (zero once resolved).
    pub failures: u32,
    /// Set when the tally could not be persisted.
    #[serde(skip)]
    pub persist_warning: Option<StoreError>,
}

impl std::fmt::Display for DeathSaveReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            DeathSaveStatus::Accumulating => write!(
                f,
                "rolled {}: successes {}/{STRIKES}, failures {}/{STRIKES}",
                self.roll, self.successes, self.failures
            ),
            status => write!(f, "rolled {}: {status}", self.roll),
        }
    }
}
