//! Roll outcomes and plain expression rolling.

use serde::{Deserialize, Serialize};

use super::expr::DiceExpression;
use super::roller::DieRoller;

/// The result of rolling a dice expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    /// Every die value in generation order, exploded rerolls included.
    pub dice: Vec<u32>,
    /// Sum of `dice`, before modifiers.
    pub sum: i64,
    /// Sum of the expression's modifiers.
    pub modifier_total: i64,
    /// `sum + modifier_total`.
    pub total: i64,
    /// The d20 value eligible for advantage and correction, present only
    /// for a lone `1d20`.
    pub designated_value: Option<u32>,
}

impl RollOutcome {
    /// Build an outcome from recorded dice.
    pub fn new(dice: Vec<u32>, modifier_total: i64, designated_value: Option<u32>) -> Self {
        let sum = dice.iter().map(|&d| i64::from(d)).sum();
        Self {
            dice,
            sum,
            modifier_total,
            total: sum + modifier_total,
            designated_value,
        }
    }

    /// Returns true if the designated die shows a natural 1 or 20.
    pub fn is_natural_extreme(&self) -> bool {
        matches!(self.designated_value, Some(1 | 20))
    }
}

impl std::fmt::Display for RollOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values: Vec<String> = self.dice.iter().map(|d| d.to_string()).collect();
        write!(f, "[{}]", values.join(", "))?;
        match self.modifier_total {
            0 => {}
            m if m > 0 => write!(f, " + {m}")?,
            m => write!(f, " - {}", m.unsigned_abs())?,
        }
        write!(f, " = {}", self.total)
    }
}

/// Record one die and, for exploding dice, its reroll chain.
///
/// The chain continues while the latest value is the maximum face. There is
/// no iteration cap: a run of maximum rolls is unbounded in theory but has
/// probability `(1/faces)^n`. A one-faced die cannot show anything else, so
/// it never explodes.
pub fn record_die<R: DieRoller + ?Sized>(
    roller: &mut R,
    faces: u32,
    first: u32,
    exploding: bool,
    dice: &mut Vec<u32>,
) {
    dice.push(first);
    if !exploding || faces < 2 {
        return;
    }
    let mut last = first;
    while last == faces {
        last = roller.roll(faces);
        dice.push(last);
    }
}

/// Roll an expression with no state involved.
///
/// A lone `1d20` still reports its value as the designated value.
pub fn roll_expression<R: DieRoller + ?Sized>(expr: &DiceExpression, roller: &mut R) -> RollOutcome {
    let mut dice = Vec::with_capacity(expr.count as usize);
    let mut designated = None;
    for _ in 0..expr.count {
        let first = roller.roll(expr.faces);
        if designated.is_none() && expr.is_single_d20() {
            designated = Some(first);
        }
        record_die(roller, expr.faces, first, expr.exploding, &mut dice);
    }
    RollOutcome::new(dice, expr.modifier_total(), designated)
}
