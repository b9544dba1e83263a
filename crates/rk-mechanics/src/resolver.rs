//! Roll resolution.
//!
//! [`Engine`] owns the configuration, the state store, and the roller. A
//! request runs to completion (parse, roll, correct, resolve criticals,
//! flush) before `&mut self` is released, so no two requests ever
//! interleave on a user's record.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{EngineConfig, ExpressionLimits};
use crate::critical::{CriticalEvent, resolve_critical};
use crate::death::{DeathSaveReport, DeathSaveStatus};
use crate::dice::{
    D20, DiceExpression, DieRoller, RngRoller, RollOutcome, parse_with_limits, record_die,
    roll_expression,
};
use crate::error::{MechResult, RollError, StoreError};
use crate::state::{StateStore, UserState};
use crate::streak::{self, Correction};

/// How the dispatch layer wants an expression treated.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Whether a lone `1d20` may use advantage flags and streak correction.
    pub correction_eligible: bool,
    /// Per-command limits. Falls back to the engine's limits.
    pub limits: Option<ExpressionLimits>,
    /// Roll hidden on behalf of this user instead of the caller.
    pub on_behalf_of: Option<String>,
    /// Whether the caller may roll on behalf of others.
    pub caller_privileged: bool,
}

impl ResolveOptions {
    /// Options for a correction-eligible check.
    pub fn check() -> Self {
        Self {
            correction_eligible: true,
            ..Self::default()
        }
    }

    /// Apply per-command limits.
    pub fn with_limits(mut self, limits: ExpressionLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Roll on behalf of another user.
    pub fn on_behalf_of(mut self, target: impl Into<String>, caller_privileged: bool) -> Self {
        self.on_behalf_of = Some(target.into());
        self.caller_privileged = caller_privileged;
        self
    }
}

/// Everything a resolved roll produced.
#[derive(Debug, Serialize)]
pub struct Resolution {
    /// The user whose state was consulted.
    pub subject: String,
    /// Whether this was a hidden roll on someone else's behalf.
    pub hidden: bool,
    /// The parsed expression.
    pub expression: DiceExpression,
    /// Dice, sum, and total.
    pub outcome: RollOutcome,
    /// Advantage, cooldown, escalation, or brake steps, in order.
    pub corrections: Vec<Correction>,
    /// Side effects of a natural 1 or 20 on the designated die.
    pub critical: Option<CriticalEvent>,
    /// Set when the subject's state changed but could not be persisted.
    #[serde(skip)]
    pub persist_warning: Option<StoreError>,
}

/// The dice engine.
#[derive(Debug)]
pub struct Engine<R = RngRoller> {
    config: EngineConfig,
    store: StateStore,
    roller: R,
}

impl<R: DieRoller> Engine<R> {
    /// Create an engine over a loaded store.
    pub fn new(config: EngineConfig, store: StateStore, roller: R) -> Self {
        Self {
            config,
            store,
            roller,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The state store.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// The roller, e.g. to append scripted values.
    pub fn roller_mut(&mut self) -> &mut R {
        &mut self.roller
    }

    /// A copy of a user's state, defaults if the user is unknown.
    pub fn user_state(&self, user_id: &str) -> UserState {
        self.store.get(user_id).copied().unwrap_or_default()
    }

    /// Write every record to the backend.
    pub fn save_all(&self) -> Result<(), StoreError> {
        self.store.save_all()
    }

    /// Resolve a dice expression for a user.
    pub fn resolve(
        &mut self,
        text: &str,
        user_id: &str,
        opts: &ResolveOptions,
    ) -> MechResult<Resolution> {
        let limits = opts.limits.unwrap_or(self.config.limits);
        let expression = parse_with_limits(text, &limits)?;

        let subject = match &opts.on_behalf_of {
            Some(target) if !opts.caller_privileged => {
                return Err(RollError::NotPrivileged {
                    target: target.clone(),
                });
            }
            Some(target) => target.clone(),
            None => user_id.to_string(),
        };

        let mut resolution = if expression.is_single_d20() {
            self.resolve_designated(subject, expression, opts)
        } else {
            let outcome = roll_expression(&expression, &mut self.roller);
            Resolution {
                subject,
                hidden: false,
                expression,
                outcome,
                corrections: Vec::new(),
                critical: None,
                persist_warning: None,
            }
        };
        resolution.hidden = opts.on_behalf_of.is_some();

        debug!(
            user = user_id,
            subject = %resolution.subject,
            expression = %resolution.expression,
            total = resolution.outcome.total,
            "resolved roll"
        );
        Ok(resolution)
    }

    /// Roll a death save for a user.
    pub fn death_save(&mut self, user_id: &str) -> DeathSaveReport {
        let roller = &mut self.roller;
        let update = self.store.update(user_id, |state| {
            let roll = roller.roll(D20);
            let status = state.death.apply(roll);
            (roll, status, state.death)
        });
        let (roll, status, tally) = update.value;

        if status != DeathSaveStatus::Accumulating {
            info!(user = user_id, roll, %status, "death save resolved");
        }

        DeathSaveReport {
            roll,
            status,
            successes: tally.successes,
            failures: tally.failures,
            persist_warning: update.persist_warning,
        }
    }

    /// A lone `1d20`: the only shape that touches user state.
    fn resolve_designated(
        &mut self,
        subject: String,
        expression: DiceExpression,
        opts: &ResolveOptions,
    ) -> Resolution {
        let config = &self.config;
        let roller = &mut self.roller;
        let distinguished = config.is_distinguished(&subject);
        let modifier = expression.modifier_total();

        let update = self.store.update(&subject, |state| {
            let mut corrections = Vec::new();
            let designated = if opts.correction_eligible {
                designate(config, distinguished, modifier, state, roller, &mut corrections)
            } else {
                roller.roll(D20)
            };

            let mut dice = Vec::with_capacity(1);
            record_die(roller, D20, designated, expression.exploding, &mut dice);
            let outcome = RollOutcome::new(dice, modifier, Some(designated));
            let critical = if outcome.is_natural_extreme() {
                resolve_critical(designated, &mut state.status, roller)
            } else {
                None
            };
            (outcome, corrections, critical)
        });
        let (outcome, corrections, critical) = update.value;

        Resolution {
            subject,
            hidden: false,
            expression,
            outcome,
            corrections,
            critical,
            persist_warning: update.persist_warning,
        }
    }
}

/// Pick the designated value for an eligible `1d20`.
///
/// Pending advantage or disadvantage takes precedence over streak
/// correction and is consumed either way.
fn designate<R: DieRoller + ?Sized>(
    config: &EngineConfig,
    distinguished: bool,
    modifier: i64,
    state: &mut UserState,
    roller: &mut R,
    corrections: &mut Vec<Correction>,
) -> u32 {
    let status = &mut state.status;
    if status.next_advantage || status.next_disadvantage {
        let (value, correction) = match (status.next_advantage, status.next_disadvantage) {
            (true, true) => {
                let roll = roller.roll(D20);
                (roll, Correction::FlagsCancelled { roll })
            }
            (true, false) => {
                let rolls = [roller.roll(D20), roller.roll(D20)];
                let kept = rolls[0].max(rolls[1]);
                (kept, Correction::Advantage { rolls, kept })
            }
            _ => {
                let rolls = [roller.roll(D20), roller.roll(D20)];
                let kept = rolls[0].min(rolls[1]);
                (kept, Correction::Disadvantage { rolls, kept })
            }
        };
        status.next_advantage = false;
        status.next_disadvantage = false;
        corrections.push(correction);
        return value;
    }

    let raw = roller.roll(D20);
    if !distinguished {
        return raw;
    }
    let corrected = streak::correct(&config.streak, &mut state.pity, raw, modifier, roller);
    corrections.extend(corrected.corrections);
    corrected.value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::critical::{CriticalEffect, StateMutation};
    use crate::dice::SequenceRoller;
    use crate::error::ParseError;
    use crate::state::{MemoryBackend, StateBackend, StateMap};

    const HERO: &str = "hero";

    fn engine(rolls: &[u32]) -> Engine<SequenceRoller> {
        let config = EngineConfig::default().with_distinguished(HERO);
        Engine::new(
            config,
            StateStore::in_memory(),
            SequenceRoller::new(rolls.iter().copied()),
        )
    }

    fn set_state(engine: &mut Engine<SequenceRoller>, user: &str, f: impl FnOnce(&mut UserState)) {
        engine.store.update(user, f);
    }

    #[test]
    fn plain_expression_has_no_designated_value() {
        let mut e = engine(&[4, 6]);
        let r = e.resolve("2d6+3", "amy", &ResolveOptions::check()).unwrap();
        assert_eq!(r.outcome.dice, vec![4, 6]);
        assert_eq!(r.outcome.total, 13);
        assert_eq!(r.outcome.designated_value, None);
        assert!(r.critical.is_none());
        assert!(e.store().is_empty());
    }

    #[test]
    fn parse_error_touches_nothing() {
        let mut e = engine(&[]);
        let err = e.resolve("1d0", HERO, &ResolveOptions::check()).unwrap_err();
        assert!(matches!(
            err,
            RollError::Parse(ParseError::FacesOutOfRange { .. })
        ));
        assert!(e.store().is_empty());
    }

    #[test]
    fn per_command_limits() {
        let mut e = engine(&[]);
        let opts = ResolveOptions::default()
            .with_limits(ExpressionLimits::default().with_max_count(100));
        assert!(matches!(
            e.resolve("101d6", "amy", &opts),
            Err(RollError::Parse(ParseError::CountOutOfRange { max: 100, .. }))
        ));
    }

    #[test]
    fn advantage_is_single_use() {
        let mut e = engine(&[7, 15, 9]);
        set_state(&mut e, "amy", |s| s.status.next_advantage = true);

        let r = e.resolve("1d20", "amy", &ResolveOptions::check()).unwrap();
        assert_eq!(r.outcome.designated_value, Some(15));
        assert_eq!(
            r.corrections,
            vec![Correction::Advantage {
                rolls: [7, 15],
                kept: 15
            }]
        );
        assert!(!e.user_state("amy").status.next_advantage);

        let r = e.resolve("1d20", "amy", &ResolveOptions::check()).unwrap();
        assert_eq!(r.outcome.dice, vec![9]);
        assert!(r.corrections.is_empty());
        assert!(e.roller_mut().is_exhausted());
    }

    #[test]
    fn disadvantage_takes_lower() {
        let mut e = engine(&[12, 3]);
        set_state(&mut e, "amy", |s| s.status.next_disadvantage = true);
        let r = e.resolve("1d20+4", "amy", &ResolveOptions::check()).unwrap();
        assert_eq!(r.outcome.designated_value, Some(3));
        assert_eq!(r.outcome.total, 7);
        assert!(!e.user_state("amy").status.next_disadvantage);
    }

    #[test]
    fn both_flags_cancel_to_one_roll() {
        let mut e = engine(&[8]);
        set_state(&mut e, HERO, |s| {
            s.status.next_advantage = true;
            s.status.next_disadvantage = true;
            s.pity.streak_fail_count = 6;
        });
        let r = e.resolve("1d20", HERO, &ResolveOptions::check()).unwrap();
        assert_eq!(r.outcome.designated_value, Some(8));
        assert_eq!(r.corrections, vec![Correction::FlagsCancelled { roll: 8 }]);
        let state = e.user_state(HERO);
        assert!(!state.status.next_advantage && !state.status.next_disadvantage);
        // Streak correction was skipped for this roll.
        assert_eq!(state.pity.streak_fail_count, 6);
    }

    #[test]
    fn flags_ignored_when_not_eligible() {
        let mut e = engine(&[5]);
        set_state(&mut e, "amy", |s| s.status.next_advantage = true);
        let r = e.resolve("1d20", "amy", &ResolveOptions::default()).unwrap();
        assert_eq!(r.outcome.designated_value, Some(5));
        assert!(e.user_state("amy").status.next_advantage);
    }

    #[test]
    fn quiet_roll_leaves_no_record() {
        let mut e = engine(&[12, 9]);
        e.resolve("1d20", "amy", &ResolveOptions::default()).unwrap();
        e.resolve("1d20+3", "amy", &ResolveOptions::check()).unwrap();
        assert!(e.store().is_empty());
    }

    #[test]
    fn ordinary_users_bypass_streak_engine() {
        let mut e = engine(&[2, 3, 4, 5, 6, 7, 8, 9]);
        for _ in 0..8 {
            let r = e.resolve("1d20", "amy", &ResolveOptions::check()).unwrap();
            assert!(r.corrections.is_empty());
        }
        assert_eq!(e.user_state("amy").pity, Default::default());
    }

    #[test]
    fn distinguished_escalation_with_negative_modifier() {
        let mut e = engine(&[5]);
        e.roller_mut().push_fractions([0.0]);
        set_state(&mut e, HERO, |s| s.pity.streak_fail_count = 4);
        let r = e.resolve("1d20-2", HERO, &ResolveOptions::check()).unwrap();
        assert_eq!(r.outcome.designated_value, Some(11));
        assert_eq!(r.outcome.total, 9);
        assert!(matches!(
            r.corrections[0],
            Correction::Escalated {
                raw: 5,
                corrected: 11,
                ..
            }
        ));
        assert_eq!(e.user_state(HERO).pity.streak_fail_count, 0);
    }

    #[test]
    fn saturated_escalation_then_cooldown() {
        // Raw 2, favored offset 3 -> 19, then three cooldown rolls.
        let mut e = engine(&[2, 3, 1, 4, 6, 4]);
        e.roller_mut().push_fractions([0.5]);
        set_state(&mut e, HERO, |s| s.pity.streak_fail_count = 6);

        let r = e.resolve("1d20", HERO, &ResolveOptions::check()).unwrap();
        assert_eq!(r.outcome.designated_value, Some(19));
        assert_eq!(e.user_state(HERO).pity.cooldown, 3);

        // Natural 1 during cooldown: left alone, but still a critical.
        let r = e.resolve("1d20", HERO, &ResolveOptions::check()).unwrap();
        assert_eq!(r.outcome.designated_value, Some(1));
        assert_eq!(r.corrections, vec![Correction::Cooldown { remaining: 2 }]);
        assert_eq!(r.critical.unwrap().effect, CriticalEffect::Fumble);

        let r = e.resolve("1d20", HERO, &ResolveOptions::check()).unwrap();
        assert_eq!(r.outcome.designated_value, Some(6));
        let r = e.resolve("1d20", HERO, &ResolveOptions::check()).unwrap();
        assert_eq!(r.outcome.designated_value, Some(4));
        assert_eq!(e.user_state(HERO).pity.cooldown, 0);
        assert!(e.roller_mut().is_exhausted());
    }

    #[test]
    fn natural_one_sets_flags_for_next_roll() {
        // 1 -> Shaken; next roll rolls twice and keeps the lower.
        let mut e = engine(&[1, 3, 14, 9]);
        let r = e.resolve("1d20", "amy", &ResolveOptions::check()).unwrap();
        let critical = r.critical.unwrap();
        assert_eq!(critical.mutations, vec![StateMutation::NextDisadvantage]);

        let r = e.resolve("1d20", "amy", &ResolveOptions::check()).unwrap();
        assert_eq!(r.outcome.designated_value, Some(9));
    }

    #[test]
    fn natural_twenty_on_plain_roll_still_critical() {
        let mut e = engine(&[20, 2]);
        let r = e.resolve("1d20+1", "amy", &ResolveOptions::default()).unwrap();
        assert_eq!(r.critical.unwrap().effect, CriticalEffect::Momentum);
        assert!(e.user_state("amy").status.next_advantage);
    }

    #[test]
    fn exploding_designated_die() {
        // 20 explodes into 20 and 7; the critical draws Insight.
        let mut e = engine(&[20, 20, 7, 3]);
        let r = e.resolve("e 1d20", "amy", &ResolveOptions::check()).unwrap();
        assert_eq!(r.outcome.dice, vec![20, 20, 7]);
        assert_eq!(r.outcome.designated_value, Some(20));
        assert_eq!(r.outcome.total, 47);
        assert_eq!(r.critical.unwrap().effect, CriticalEffect::Insight);
    }

    #[test]
    fn hidden_roll_requires_privilege() {
        let mut e = engine(&[10]);
        let opts = ResolveOptions::check().on_behalf_of(HERO, false);
        assert!(matches!(
            e.resolve("1d20", "gm", &opts),
            Err(RollError::NotPrivileged { target }) if target == HERO
        ));

        let opts = ResolveOptions::check().on_behalf_of(HERO, true);
        let r = e.resolve("1d20", "gm", &opts).unwrap();
        assert!(r.hidden);
        assert_eq!(r.subject, HERO);
        assert_eq!(e.user_state(HERO).pity.streak_fail_count, 1);
        assert!(e.store().get("gm").is_none());
    }

    #[test]
    fn death_save_sequence() {
        let mut e = engine(&[2, 1]);
        let first = e.death_save("amy");
        assert_eq!(first.status, DeathSaveStatus::Accumulating);
        assert_eq!(first.failures, 1);

        let second = e.death_save("amy");
        assert_eq!(second.roll, 1);
        assert_eq!(second.status, DeathSaveStatus::Expired);
        assert_eq!((second.successes, second.failures), (0, 0));
    }

    #[test]
    fn death_save_natural_twenty() {
        let mut e = engine(&[5, 20]);
        e.death_save("amy");
        let r = e.death_save("amy");
        assert_eq!(r.status, DeathSaveStatus::Stabilized);
        assert_eq!((r.successes, r.failures), (0, 0));
    }

    #[test]
    fn death_saves_ignore_streak_state() {
        let mut e = engine(&[3]);
        set_state(&mut e, HERO, |s| s.pity.streak_fail_count = 9);
        let r = e.death_save(HERO);
        assert_eq!(r.roll, 3);
        assert_eq!(e.user_state(HERO).pity.streak_fail_count, 9);
    }

    #[test]
    fn mutations_are_persisted() {
        let backend = MemoryBackend::new();
        let store = StateStore::open(backend.clone()).unwrap();
        let mut e = Engine::new(EngineConfig::default(), store, SequenceRoller::new([20, 2]));
        let r = e.resolve("1d20", "amy", &ResolveOptions::check()).unwrap();
        assert!(r.persist_warning.is_none());

        let saved: StateMap = backend.load().unwrap();
        assert!(saved["amy"].status.next_advantage);
    }

    #[test]
    fn persist_failure_is_reported_not_fatal() {
        struct ReadOnly;
        impl StateBackend for ReadOnly {
            fn load(&self) -> Result<StateMap, StoreError> {
                Ok(StateMap::new())
            }
            fn save(&self, _: &StateMap) -> Result<(), StoreError> {
                Err(StoreError::Io {
                    path: "state.json".into(),
                    source: std::io::Error::other("read-only"),
                })
            }
        }

        let store = StateStore::open(ReadOnly).unwrap();
        let mut e = Engine::new(EngineConfig::default(), store, SequenceRoller::new([4]));
        let r = e.death_save("amy");
        assert!(r.persist_warning.is_some());
        assert_eq!(e.user_state("amy").death.failures, 1);
    }
}
