//! The randomness boundary.
//!
//! Every random draw in the engine goes through a [`DieRoller`], so the
//! streak probabilities and explosion chains can be tested with a seeded
//! or scripted source.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A source of die results.
pub trait DieRoller {
    /// A uniform integer in `1..=faces`. `faces` is never zero.
    fn roll(&mut self, faces: u32) -> u32;

    /// A uniform fraction in `[0, 1)`.
    fn fraction(&mut self) -> f64;
}

impl<T: DieRoller + ?Sized> DieRoller for &mut T {
    fn roll(&mut self, faces: u32) -> u32 {
        (**self).roll(faces)
    }

    fn fraction(&mut self) -> f64 {
        (**self).fraction()
    }
}

impl<T: DieRoller + ?Sized> DieRoller for Box<T> {
    fn roll(&mut self, faces: u32) -> u32 {
        (**self).roll(faces)
    }

    fn fraction(&mut self) -> f64 {
        (**self).fraction()
    }
}

/// A roller backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngRoller<R = StdRng> {
    rng: R,
}

impl<R: Rng> RngRoller<R> {
    /// Wrap an existing generator.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngRoller<StdRng> {
    /// A deterministic roller for replays and tests.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// A roller seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl<R: Rng> DieRoller for RngRoller<R> {
    fn roll(&mut self, faces: u32) -> u32 {
        self.rng.random_range(1..=faces)
    }

    fn fraction(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// A roller that replays scripted values in order.
///
/// # Panics
///
/// Panics when the script runs out, or when a scripted die value does not
/// fit the die being rolled.
#[derive(Debug, Clone, Default)]
pub struct SequenceRoller {
    rolls: VecDeque<u32>,
    fractions: VecDeque<f64>,
}

impl SequenceRoller {
    /// Script the die values to return.
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            fractions: VecDeque::new(),
        }
    }

    /// Script the fractions to return.
    pub fn with_fractions(mut self, fractions: impl IntoIterator<Item = f64>) -> Self {
        self.fractions.extend(fractions);
        self
    }

    /// Append more fractions to the script.
    pub fn push_fractions(&mut self, fractions: impl IntoIterator<Item = f64>) {
        self.fractions.extend(fractions);
    }

    /// Returns true once every scripted value has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.rolls.is_empty() && self.fractions.is_empty()
    }
}

impl DieRoller for SequenceRoller {
    fn roll(&mut self, faces: u32) -> u32 {
        let value = self
            .rolls
            .pop_front()
            .unwrap_or_else(|| panic!("scripted rolls exhausted at a d{faces}"));
        assert!(
            (1..=faces).contains(&value),
            "scripted value {value} does not fit a d{faces}"
        );
        value
    }

    fn fraction(&mut self) -> f64 {
        self.fractions
            .pop_front()
            .unwrap_or_else(|| panic!("scripted fractions exhausted"))
    }
}
