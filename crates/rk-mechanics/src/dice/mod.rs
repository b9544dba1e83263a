//! Dice expressions, rollers, and outcomes.
//!
//! Parsing is pure and validates every bound before a die is rolled.
//! Randomness enters only through [`DieRoller`], which has a `rand`-backed
//! implementation and a scripted one for deterministic replays.

pub mod expr;
pub mod roll;
pub mod roller;

pub use expr::{DiceExpression, parse, parse_with_limits};
pub use roll::{RollOutcome, record_die, roll_expression};
pub use roller::{DieRoller, RngRoller, SequenceRoller};

/// Faces on the designated die.
pub const D20: u32 = 20;
