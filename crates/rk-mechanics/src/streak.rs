//! Streak correction ("pity" and "brake").
//!
//! Distinguished subjects carry a fail-streak counter. Once the streak is
//! long enough, each further miss has a rising chance of being replaced by a
//! favorable result:
//!
//! | streak | chance |
//! |--------|--------|
//! | < 4    | 0      |
//! | 4      | 0.25   |
//! | 5      | 0.50   |
//! | 6      | 0.75   |
//! | 7+     | 1.00   |
//!
//! Every escalation resets the streak. A guaranteed one also starts a
//! cooldown during which no escalation is evaluated. The optional brake is
//! the mirror image: after a run of hot results the next roll takes the
//! lower of two d20s.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::StreakConfig;
use crate::dice::{D20, DieRoller};
use crate::state::PityState;

/// Something that changed the designated die, reported for observability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Correction {
    /// A pending advantage flag was consumed.
    Advantage {
        /// Both d20s rolled.
        rolls: [u32; 2],
        /// The higher one.
        kept: u32,
    },
    /// A pending disadvantage flag was consumed.
    Disadvantage {
        /// Both d20s rolled.
        rolls: [u32; 2],
        /// The lower one.
        kept: u32,
    },
    /// Advantage and disadvantage were both pending and cancelled out.
    FlagsCancelled {
        /// The single plain roll.
        roll: u32,
    },
    /// Escalation was skipped because a cooldown is running.
    Cooldown {
        /// Eligible rolls left before escalation resumes.
        remaining: u32,
    },
    /// A fail streak escalated into a corrected result.
    Escalated {
        /// The value before correction.
        raw: u32,
        /// The value after correction.
        corrected: u32,
        /// Fail streak length that triggered it.
        streak: u32,
        /// Probability the escalation had of firing.
        chance: f64,
        /// Whether the chance was certain, which starts a cooldown.
        saturated: bool,
    },
    /// A hot streak was braked.
    Braked {
        /// The value before braking.
        raw: u32,
        /// Both d20s rolled.
        rolls: [u32; 2],
        /// The lower one.
        kept: u32,
    },
}

impl std::fmt::Display for Correction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Advantage { rolls, kept } => {
                write!(f, "advantage: {} and {}, kept {kept}", rolls[0], rolls[1])
            }
            Self::Disadvantage { rolls, kept } => {
                write!(f, "disadvantage: {} and {}, kept {kept}", rolls[0], rolls[1])
            }
            Self::FlagsCancelled { roll } => {
                write!(f, "advantage and disadvantage cancelled: rolled {roll}")
            }
            Self::Cooldown { remaining } => write!(f, "cooldown: {remaining} left"),
            Self::Escalated {
                raw,
                corrected,
                streak,
                ..
            } => write!(f, "streak of {streak}: {raw} became {corrected}"),
            Self::Braked { raw, kept, .. } => write!(f, "hot streak braked: {raw} became {kept}"),
        }
    }
}

/// The designated value after streak correction.
#[derive(Debug, Clone, PartialEq)]
pub struct Corrected {
    /// The value to use.
    pub value: u32,
    /// What happened along the way, in order.
    pub corrections: Vec<Correction>,
}

/// Run one designated roll through the streak engine.
///
/// `raw` is the natural d20 and `modifier` the expression's net modifier.
/// The caller is responsible for only passing distinguished subjects.
pub fn correct<R: DieRoller + ?Sized>(
    config: &StreakConfig,
    pity: &mut PityState,
    raw: u32,
    modifier: i64,
    roller: &mut R,
) -> Corrected {
    let mut corrections = Vec::new();

    if pity.cooldown > 0 {
        pity.cooldown -= 1;
        corrections.push(Correction::Cooldown {
            remaining: pity.cooldown,
        });
        return Corrected {
            value: raw,
            corrections,
        };
    }

    let mut value = raw;
    if config
        .brake
        .is_some_and(|brake| pity.streak_good_count >= brake.after_rolls)
    {
        let rolls = [roller.roll(D20), roller.roll(D20)];
        let kept = rolls[0].min(rolls[1]);
        info!(raw, kept, "hot streak braked");
        corrections.push(Correction::Braked { raw, rolls, kept });
        pity.streak_good_count = 0;
        value = kept;
    }

    if value < config.good_threshold {
        pity.streak_fail_count += 1;
    } else {
        pity.streak_fail_count = 0;
    }

    let streak = pity.streak_fail_count;
    let chance = config.escalation_chance(streak);
    if chance > 0.0 && roller.fraction() < chance {
        let corrected = if modifier < 0 {
            value.max(config.negative_modifier_floor)
        } else {
            roll_favored(config, roller)
        };
        let saturated = chance >= 1.0;
        pity.streak_fail_count = 0;
        if saturated {
            pity.cooldown = config.cooldown_rolls;
        }
        info!(raw = value, corrected, streak, chance, saturated, "fail streak escalated");
        corrections.push(Correction::Escalated {
            raw: value,
            corrected,
            streak,
            chance,
            saturated,
        });
        value = corrected;
    }

    if let Some(brake) = config.brake {
        if value >= brake.hot_threshold {
            pity.streak_good_count += 1;
        } else {
            pity.streak_good_count = 0;
        }
    }

    Corrected { value, corrections }
}

/// A uniform value in the configured favorable range, clamped to a d20.
fn roll_favored<R: DieRoller + ?Sized>(config: &StreakConfig, roller: &mut R) -> u32 {
    let low = config.favored_min.clamp(1, D20);
    let high = config.favored_max.clamp(low, D20);
    low - 1 + roller.roll(high - low + 1)
}
