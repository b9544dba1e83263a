//! Dice expression parsing.
//!
//! Accepts `<count>d<faces>(<+|-><int>)*`, case-insensitive, with an
//! optional leading `e` marking the dice as exploding. Whitespace is allowed
//! after the `e` and around each `+` or `-`, nowhere else:
//!
//! - `1d20`
//! - `2d6+3`
//! - `E 4d8+2-1`

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ExpressionLimits;
use crate::error::ParseError;

static EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,4})d(\d{1,4})((?:\s*[+-]\s*\d+)*)$").expect("dice pattern is valid")
});

static MODIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-])\s*(\d+)").expect("modifier pattern is valid"));

/// A validated dice expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpression {
    /// Number of dice to roll.
    pub count: u32,
    /// Faces per die.
    pub faces: u32,
    /// Signed modifiers, in the order written.
    pub modifiers: Vec<i32>,
    /// Whether a die showing its maximum face is rolled again.
    pub exploding: bool,
}

impl DiceExpression {
    /// Sum of all modifiers.
    pub fn modifier_total(&self) -> i64 {
        self.modifiers.iter().map(|&m| i64::from(m)).sum()
    }

    /// Returns true for exactly one twenty-sided die.
    pub fn is_single_d20(&self) -> bool {
        self.count == 1 && self.faces == 20
    }
}

impl FromStr for DiceExpression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl std::fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.exploding {
            write!(f, "e ")?;
        }
        write!(f, "{}d{}", self.count, self.faces)?;
        for m in &self.modifiers {
            write!(f, "{m:+}")?;
        }
        Ok(())
    }
}

/// Parse an expression using the default limits.
pub fn parse(text: &str) -> Result<DiceExpression, ParseError> {
    parse_with_limits(text, &ExpressionLimits::default())
}

/// Parse an expression, rejecting anything beyond `limits`.
pub fn parse_with_limits(
    text: &str,
    limits: &ExpressionLimits,
) -> Result<DiceExpression, ParseError> {
    let trimmed = text.trim();
    let bad_format = || ParseError::BadFormat(trimmed.to_string());

    let limits = limits.capped();

    let lower = trimmed.to_lowercase();
    let (exploding, body) = match lower.strip_prefix('e') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, lower.as_str()),
    };

    let caps = EXPRESSION.captures(body).ok_or_else(bad_format)?;
    let count: u32 = caps[1].parse().map_err(|_| bad_format())?;
    let faces: u32 = caps[2].parse().map_err(|_| bad_format())?;
    // Out-of-range i32 modifiers fail here.
    let modifiers = MODIFIER
        .captures_iter(&caps[3])
        .map(|m| format!("{}{}", &m[1], &m[2]).parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| bad_format())?;

    if !(1..=limits.max_faces).contains(&faces) {
        return Err(ParseError::FacesOutOfRange {
            faces,
            max: limits.max_faces,
        });
    }
    if !(1..=limits.max_count).contains(&count) {
        return Err(ParseError::CountOutOfRange {
            count,
            max: limits.max_count,
        });
    }
    if modifiers.len() > limits.max_modifiers {
        return Err(ParseError::TooManyModifiers {
            count: modifiers.len(),
            max: limits.max_modifiers,
        });
    }

    Ok(DiceExpression {
        count,
        faces,
        modifiers,
        exploding,
    })
}
