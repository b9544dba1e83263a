//! Per-user state and its durable store.
//!
//! A [`UserState`] holds the three independent pieces of state a user
//! accumulates: the streak counters, the death-save tally, and status flags
//! left behind by critical rolls. Records are created on first reference
//! and never deleted.

pub mod backend;
pub mod store;

pub use backend::{JsonFileBackend, MemoryBackend, StateBackend, StateMap};
pub use store::{StateStore, Update};

use serde::{Deserialize, Serialize};

use crate::death::DeathSaves;

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Streak counters used by the correction engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PityState {
    /// Designated rolls in a row below the good threshold.
    pub streak_fail_count: u32,
    /// Eligible rolls left before escalation is evaluated again.
    pub cooldown: u32,
    /// Designated rolls in a row at or above the brake's hot threshold.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub streak_good_count: u32,
}

/// Single-use flags and recorded consequences from critical rolls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusFlags {
    /// The next designated roll takes the higher of two d20s.
    pub next_advantage: bool,
    /// The next designated roll takes the lower of two d20s.
    pub next_disadvantage: bool,
    /// Damage recorded by complications. Never applied automatically.
    pub pending_damage: u32,
    /// The next opponent acting against this user has advantage.
    pub next_target_has_advantage: bool,
}

/// Everything the engine remembers about one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserState {
    /// Streak correction counters.
    pub pity: PityState,
    /// Death-save tally.
    pub death: DeathSaves,
    /// Status flags.
    pub status: StatusFlags,
}
