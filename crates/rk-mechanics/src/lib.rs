//! Dice mechanics for tabletop chat sessions.
//!
//! Parses dice expressions, rolls them, and keeps per-user state that
//! carries across rolls: advantage flags left behind by critical events,
//! the fail-streak counter that escalates bad runs for distinguished users,
//! and death-save tallies. State is written through a pluggable backend,
//! a JSON file by default.

pub mod config;
pub mod critical;
pub mod death;
pub mod dice;
pub mod error;
pub mod resolver;
pub mod shared;
pub mod state;
pub mod streak;

pub use config::{BrakeConfig, EngineConfig, ExpressionLimits, StreakConfig};
pub use critical::{CriticalEffect, CriticalEvent, CriticalKind, StateMutation};
pub use death::{DeathSaveReport, DeathSaveStatus, DeathSaves};
pub use dice::{DiceExpression, DieRoller, RngRoller, RollOutcome, SequenceRoller, parse};
pub use error::{ConfigError, MechResult, ParseError, RollError, StoreError};
pub use resolver::{Engine, Resolution, ResolveOptions};
pub use shared::SharedEngine;
pub use state::{
    JsonFileBackend, MemoryBackend, PityState, StateBackend, StateStore, StatusFlags, UserState,
};
pub use streak::Correction;
