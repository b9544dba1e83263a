//! A thread-safe handle around one [`Engine`].
//!
//! Front ends that serve several users concurrently clone a [`SharedEngine`]
//! into each task. Every request holds the lock from parse to flush, so
//! requests are totally ordered and a user's record is never read by one
//! request while another is halfway through updating it.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::death::DeathSaveReport;
use crate::dice::{DieRoller, RngRoller};
use crate::error::{MechResult, StoreError};
use crate::resolver::{Engine, Resolution, ResolveOptions};
use crate::state::UserState;

/// A cloneable, lock-guarded [`Engine`].
#[derive(Debug)]
pub struct SharedEngine<R = RngRoller> {
    inner: Arc<Mutex<Engine<R>>>,
}

impl<R> Clone for SharedEngine<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: DieRoller> SharedEngine<R> {
    /// Wrap an engine.
    pub fn new(engine: Engine<R>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// See [`Engine::resolve`].
    pub fn resolve(
        &self,
        text: &str,
        user_id: &str,
        opts: &ResolveOptions,
    ) -> MechResult<Resolution> {
        self.inner.lock().resolve(text, user_id, opts)
    }

    /// See [`Engine::death_save`].
    pub fn death_save(&self, user_id: &str) -> DeathSaveReport {
        self.inner.lock().death_save(user_id)
    }

    /// See [`Engine::user_state`].
    pub fn user_state(&self, user_id: &str) -> UserState {
        self.inner.lock().user_state(user_id)
    }

    /// See [`Engine::save_all`].
    pub fn save_all(&self) -> Result<(), StoreError> {
        self.inner.lock().save_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::state::StateStore;

    #[test]
    fn concurrent_requests_are_serialized() {
        let engine = Engine::new(
            EngineConfig::default().with_distinguished("hero"),
            StateStore::in_memory(),
            RngRoller::seeded(99),
        );
        let shared = SharedEngine::new(engine);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        shared.death_save("hero");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let state = shared.user_state("hero");
        assert!(state.death.successes < 3);
        assert!(state.death.failures < 3);
    }

    #[test]
    fn clones_share_one_engine() {
        let shared = SharedEngine::new(Engine::new(
            EngineConfig::default(),
            StateStore::in_memory(),
            RngRoller::seeded(1),
        ));
        let other = shared.clone();
        let report = other.death_save("amy");
        let state = shared.user_state("amy");
        assert_eq!(state.death.successes, report.successes);
        assert_eq!(state.death.failures, report.failures);
        assert!(shared.save_all().is_ok());
        assert!(
            shared
                .resolve("2d6", "amy", &ResolveOptions::default())
                .is_ok()
        );
    }
}
