//! Randomness used by the simulation.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of the simulation's random draws.
pub trait RandomSource: Send {
    /// Uniform integer in `0..upper`. Returns 0 when `upper` is 0.
    fn below(&mut self, upper: u32) -> u32;

    /// Fair coin.
    fn coin(&mut self) -> bool {
        self.below(2) == 1
    }

    /// Uniform integer in `low..=high`.
    fn between(&mut self, low: u32, high: u32) -> u32 {
        low + self.below(high.saturating_sub(low) + 1)
    }

    /// Uniform pick from a slice.
    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T>
    where
        Self: Sized,
    {
        if items.is_empty() {
            return None;
        }
        items.get(self.below(items.len() as u32) as usize)
    }
}

/// [`RandomSource`] backed by a `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R = StdRng>(R);

impl RngSource<StdRng> {
    /// Generator seeded from the thread RNG.
    pub fn from_entropy() -> Self {
        Self(StdRng::from_rng(&mut rand::rng()))
    }

    /// Reproducible generator.
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> RandomSource for RngSource<R> {
    fn below(&mut self, upper: u32) -> u32 {
        if upper == 0 {
            return 0;
        }
        self.0.random_range(0..upper)
    }
}

/// Replays a fixed sequence of draws, each reduced modulo the requested
/// bound. Yields 0 once exhausted.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    draws: VecDeque<u32>,
}

impl ScriptedRandom {
    /// Create a source that replays `draws` in order.
    pub fn new(draws: impl IntoIterator<Item = u32>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
        }
    }

    /// Draws not consumed yet.
    pub fn remaining(&self) -> usize {
        self.draws.len()
    }
}

impl RandomSource for ScriptedRandom {
    fn below(&mut self, upper: u32) -> u32 {
        let draw = self.draws.pop_front().unwrap_or(0);
        if upper == 0 {
            0
        } else {
            draw % upper
        }
    }
}

/// Boxed sources forward to the inner one, so the coordinator can hold a
/// trait object.
impl RandomSource for Box<dyn RandomSource> {
    fn below(&mut self, upper: u32) -> u32 {
        (**self).below(upper)
    }
}
