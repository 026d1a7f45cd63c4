// src/core/rng.rs
//! Deterministic RNG discipline. One stream per turn, seeded by the caller
//! from `(game_seed, turn_number)`; sub-streams (starbase surveillance) are
//! derived as `seed + constant` so adding a consumer never perturbs the
//! main stream.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Offset for the starbase surveillance sub-stream.
pub const SURVEILLANCE_STREAM: u64 = 0x5153;

#[derive(Debug, Clone)]
pub struct TurnRng {
    seed: u64,
    rng: ChaCha8Rng,
}

impl TurnRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Derive the turn seed from a stable game seed. SplitMix64 finalizer,
    /// so consecutive turns land far apart in seed space.
    pub fn turn_seed(game_seed: u64, turn: u32) -> u64 {
        let mut z = game_seed ^ (u64::from(turn)).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Independent stream at `seed + offset`.
    pub fn substream(&self, offset: u64) -> TurnRng {
        TurnRng::new(self.seed.wrapping_add(offset))
    }

    /// One die, 1..=20.
    pub fn d20(&mut self) -> i32 {
        self.rng.gen_range(1..=20)
    }

    /// Uniform in `0..bound`; `bound` must be nonzero.
    pub fn roll(&mut self, bound: u32) -> u32 {
        self.rng.gen_range(0..bound)
    }

    /// Uniform in `lo..=hi`.
    pub fn range_inclusive(&mut self, lo: i64, hi: i64) -> i64 {
        self.rng.gen_range(lo..=hi)
    }

    /// Percentile check: true with probability `pct`/100.
    pub fn percent(&mut self, pct: u32) -> bool {
        self.roll(100) < pct
    }
}
