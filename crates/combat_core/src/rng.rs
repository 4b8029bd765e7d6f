//! Seeded randomness for combat rolls.
//!
//! Every hit, crit, block, effect-hit and damage-range roll in a scene goes
//! through one [`CombatRng`], so a scene replays identically from its seed.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::math::Fixed;

/// Per-scene random number generator.
#[derive(Debug, Clone)]
pub struct CombatRng {
    rng: ChaCha8Rng,
    seed: u64,
    draws: u64,
}

impl CombatRng {
    /// Create a generator from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            draws: 0,
        }
    }

    /// Seed this generator was created with.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of values drawn so far.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }

    /// Uniform fraction in `[0, 1)`.
    pub fn fraction(&mut self) -> Fixed {
        self.draws += 1;
        // 32 random bits are exactly the fractional part of an I32F32.
        Fixed::from_bits(i64::from(self.rng.next_u32()))
    }

    /// `true` with probability `chance`.
    ///
    /// Chances at or above one never draw, nor do chances at or below zero.
    pub fn roll(&mut self, chance: Fixed) -> bool {
        if chance >= Fixed::ONE {
            return true;
        }
        if chance <= Fixed::ZERO {
            return false;
        }
        self.fraction() < chance
    }

    /// Uniform value in `[min, max]`. Returns `min` when the range is empty.
    pub fn range(&mut self, min: Fixed, max: Fixed) -> Fixed {
        if max <= min {
            return min;
        }
        min + (max - min) * self.fraction()
    }

    /// Uniform integer in `0..n`; zero when `n` is zero.
    pub fn below(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        self.draws += 1;
        self.rng.gen_range(0..n)
    }
}
