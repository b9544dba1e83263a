//! Critical events on the designated d20.
//!
//! A natural 1 draws one of four complications and a natural 20 one of four
//! boons, each uniformly. Some of them leave status flags behind for later
//! rolls. Damage and healing are recorded or reported but never applied to
//! any health total.

use serde::{Deserialize, Serialize};

use crate::dice::DieRoller;
use crate::state::StatusFlags;

/// Complications and boons each have this many entries.
const CATEGORIES: u32 = 4;

/// Die used for wound damage and narrative healing.
const EFFECT_DIE: u32 = 4;

/// Which extreme the designated die landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalKind {
    /// A natural 1.
    Natural1,
    /// A natural 20.
    Natural20,
}

/// The effect selected for a critical roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum CriticalEffect {
    /// Complication: extra damage is recorded as pending.
    Wound {
        /// Damage added to the pending total.
        damage: u32,
    },
    /// Complication: the next opponent has advantage against this user.
    Exposed,
    /// Complication: the user's next designated roll has disadvantage.
    Shaken,
    /// Complication: narrative only.
    Fumble,
    /// Boon: a heal amount is reported, nothing is applied.
    SecondWind {
        /// Narrative hit points regained.
        heal: u32,
    },
    /// Boon: the user's next designated roll has advantage.
    Momentum,
    /// Boon: narrative only.
    Insight,
    /// Boon: narrative only.
    Flourish,
}

impl std::fmt::Display for CriticalEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wound { damage } => write!(f, "Wound: {damage} damage pending"),
            Self::Exposed => write!(f, "Exposed: the next foe acts with advantage"),
            Self::Shaken => write!(f, "Shaken: disadvantage on the next check"),
            Self::Fumble => write!(f, "Fumble: the action goes embarrassingly wrong"),
            Self::SecondWind { heal } => write!(f, "Second wind: recover {heal} HP"),
            Self::Momentum => write!(f, "Momentum: advantage on the next check"),
            Self::Insight => write!(f, "Insight: a hidden detail is revealed"),
            Self::Flourish => write!(f, "Flourish: the action succeeds with style"),
        }
    }
}

/// A change made to a user's status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mutation", rename_all = "snake_case")]
pub enum StateMutation {
    /// `pendingDamage` grew.
    PendingDamage {
        /// Damage added by this event.
        added: u32,
        /// Pending damage after the event.
        total: u32,
    },
    /// `nextTargetHasAdvantage` was set.
    NextTargetHasAdvantage,
    /// `nextDisadvantage` was set.
    NextDisadvantage,
    /// `nextAdvantage` was set.
    NextAdvantage,
}

/// A resolved critical event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalEvent {
    /// Natural 1 or natural 20.
    pub kind: CriticalKind,
    /// The effect drawn.
    pub effect: CriticalEffect,
    /// Human-readable summary of the effect.
    pub description: String,
    /// Status changes made, empty for narrative-only effects.
    pub mutations: Vec<StateMutation>,
}

/// Resolve a critical event for a designated value.
///
/// Returns `None` unless `natural` is exactly 1 or 20.
pub fn resolve_critical<R: DieRoller + ?Sized>(
    natural: u32,
    status: &mut StatusFlags,
    roller: &mut R,
) -> Option<CriticalEvent> {
    let kind = match natural {
        1 => CriticalKind::Natural1,
        20 => CriticalKind::Natural20,
        _ => return None,
    };

    let category = roller.roll(CATEGORIES);
    let mut mutations = Vec::new();
    let effect = match (kind, category) {
        (CriticalKind::Natural1, 1) => {
            let damage = roller.roll(EFFECT_DIE);
            status.pending_damage = status.pending_damage.saturating_add(damage);
            mutations.push(StateMutation::PendingDamage {
                added: damage,
                total: status.pending_damage,
            });
            CriticalEffect::Wound { damage }
        }
        (CriticalKind::Natural1, 2) => {
            status.next_target_has_advantage = true;
            mutations.push(StateMutation::NextTargetHasAdvantage);
            CriticalEffect::Exposed
        }
        (CriticalKind::Natural1, 3) => {
            status.next_disadvantage = true;
            mutations.push(StateMutation::NextDisadvantage);
            CriticalEffect::Shaken
        }
        (CriticalKind::Natural1, _) => CriticalEffect::Fumble,
        (CriticalKind::Natural20, 1) => CriticalEffect::SecondWind {
            heal: roller.roll(EFFECT_DIE),
        },
        (CriticalKind::Natural20, 2) => {
            status.next_advantage = true;
            mutations.push(StateMutation::NextAdvantage);
            CriticalEffect::Momentum
        }
        (CriticalKind::Natural20, 3) => CriticalEffect::Insight,
        (CriticalKind::Natural20, _) => CriticalEffect::Flourish,
    };

    Some(CriticalEvent {
        kind,
        effect,
        description: effect.to_string(),
        mutations,
    })
}
