//! Engine configuration.
//!
//! Everything the dispatch layer decides lives here: which subjects receive
//! streak correction, the correction thresholds, and the expression limits.
//! Configurations can be built in code or loaded from TOML.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dice::D20;
use crate::error::ConfigError;

/// Upper bounds applied when parsing a dice expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionLimits {
    /// Largest number of dice in one expression.
    pub max_count: u32,
    /// Largest number of faces on a die.
    pub max_faces: u32,
    /// Largest number of `+n` / `-n` terms.
    pub max_modifiers: usize,
}

impl Default for ExpressionLimits {
    fn default() -> Self {
        Self {
            max_count: 1000,
            max_faces: 1000,
            max_modifiers: 10,
        }
    }
}

impl ExpressionLimits {
    /// Cap the number of dice, never above the default of 1000.
    pub fn with_max_count(mut self, max: u32) -> Self {
        self.max_count = max.min(Self::default().max_count);
        self
    }

    /// Cap the number of modifiers, never above the default of 10.
    pub fn with_max_modifiers(mut self, max: usize) -> Self {
        self.max_modifiers = max.min(Self::default().max_modifiers);
        self
    }

    /// These limits with every bound pulled down to the defaults.
    pub fn capped(self) -> Self {
        let hard = Self::default();
        Self {
            max_count: self.max_count.min(hard.max_count),
            max_faces: self.max_faces.min(hard.max_faces),
            max_modifiers: self.max_modifiers.min(hard.max_modifiers),
        }
    }

    /// Check every bound is between 1 and its default.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let hard = Self::default();
        check(
            (1..=hard.max_count).contains(&self.max_count),
            "limits.max_count",
            "must be between 1 and 1000",
        )?;
        check(
            (1..=hard.max_faces).contains(&self.max_faces),
            "limits.max_faces",
            "must be between 1 and 1000",
        )?;
        check(
            (1..=hard.max_modifiers).contains(&self.max_modifiers),
            "limits.max_modifiers",
            "must be between 1 and 10",
        )
    }
}

/// Settings for the good-streak brake.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrakeConfig {
    /// A designated result at or above this counts toward a hot streak.
    pub hot_threshold: u32,
    /// Hot results in a row before the next roll is braked.
    pub after_rolls: u32,
}

impl Default for BrakeConfig {
    fn default() -> Self {
        Self {
            hot_threshold: 17,
            after_rolls: 3,
        }
    }
}

/// Thresholds for the streak correction engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakConfig {
    /// A raw roll at or above this breaks a fail streak.
    pub good_threshold: u32,
    /// Fail streak length at which escalation starts being evaluated.
    pub escalation_start: u32,
    /// Escalation chance added per failed roll beyond the start.
    pub escalation_step: f64,
    /// Lowest corrected result when the modifier is not negative.
    pub favored_min: u32,
    /// Highest corrected result when the modifier is not negative.
    pub favored_max: u32,
    /// Floor applied instead when the net modifier is negative.
    pub negative_modifier_floor: u32,
    /// Rolls skipped after a guaranteed escalation.
    pub cooldown_rolls: u32,
    /// Optional good-streak brake. Disabled when absent.
    pub brake: Option<BrakeConfig>,
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            good_threshold: 16,
            escalation_start: 4,
            escalation_step: 0.25,
            favored_min: 17,
            favored_max: 20,
            negative_modifier_floor: 11,
            cooldown_rolls: 3,
            brake: None,
        }
    }
}

impl StreakConfig {
    /// Chance that a fail streak of length `streak` triggers escalation.
    pub fn escalation_chance(&self, streak: u32) -> f64 {
        if streak < self.escalation_start {
            return 0.0;
        }
        let over = f64::from(streak - self.escalation_start + 1);
        (over * self.escalation_step).min(1.0)
    }

    /// Enable the good-streak brake.
    pub fn with_brake(mut self, brake: BrakeConfig) -> Self {
        self.brake = Some(brake);
        self
    }

    /// Check the thresholds describe values a d20 can produce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d20 = 1..=D20;
        check(
            d20.contains(&self.favored_min) && self.favored_min <= self.favored_max,
            "streak.favored_min",
            "must be between 1 and favored_max",
        )?;
        check(
            d20.contains(&self.favored_max),
            "streak.favored_max",
            "must be between 1 and 20",
        )?;
        check(
            d20.contains(&self.negative_modifier_floor),
            "streak.negative_modifier_floor",
            "must be between 1 and 20",
        )?;
        check(
            self.escalation_start >= 1,
            "streak.escalation_start",
            "must be at least 1",
        )?;
        check(
            !self.escalation_step.is_nan() && self.escalation_step > 0.0,
            "streak.escalation_step",
            "must be greater than 0",
        )?;
        if let Some(brake) = &self.brake {
            check(
                d20.contains(&brake.hot_threshold),
                "streak.brake.hot_threshold",
                "must be between 1 and 20",
            )?;
            check(
                brake.after_rolls >= 1,
                "streak.brake.after_rolls",
                "must be at least 1",
            )?;
        }
        Ok(())
    }
}

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// User ids that receive streak correction.
    pub distinguished: HashSet<String>,
    /// Streak correction thresholds.
    pub streak: StreakConfig,
    /// Default expression limits.
    pub limits: ExpressionLimits,
}

impl EngineConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Add a user to the distinguished-subject set.
    pub fn with_distinguished(mut self, user_id: impl Into<String>) -> Self {
        self.distinguished.insert(user_id.into());
        self
    }

    /// Replace the streak thresholds.
    pub fn with_streak(mut self, streak: StreakConfig) -> Self {
        self.streak = streak;
        self
    }

    /// Replace the default expression limits.
    pub fn with_limits(mut self, limits: ExpressionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Returns true if the user receives streak correction.
    pub fn is_distinguished(&self, user_id: &str) -> bool {
        self.distinguished.contains(user_id)
    }

    /// Check the streak thresholds and limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.streak.validate()?;
        self.limits.validate()
    }
}

fn check(ok: bool, field: &'static str, reason: &'static str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field, reason })
    }
}
