//! Random sources for the flip engine.

use std::collections::VecDeque;

use hmac::{Hmac, Mac};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use sha2::Sha256;

/// Uniform randomness consumed by the flip decision.
pub trait RandomSource {
    /// Uniform draw in `[0, 1)`.
    fn value(&mut self) -> f32;

    /// Uniform index in `0..upper`; returns 0 when `upper` is 0.
    fn index(&mut self, upper: usize) -> usize;
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

/// Seeded production source: one stream for the flip roll, one for branch picks.
#[derive(Debug, Clone)]
pub struct SessionRng {
    roll: CountingRng<SmallRng>,
    pick: CountingRng<SmallRng>,
}

impl SessionRng {
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            roll: CountingRng::new(derive_stream_seed(seed, b"flip-roll")),
            pick: CountingRng::new(derive_stream_seed(seed, b"flip-pick")),
        }
    }

    /// Total draws across both streams.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.roll.draws().saturating_add(self.pick.draws())
    }
}

impl RandomSource for SessionRng {
    fn value(&mut self) -> f32 {
        self.roll.r#gen::<f32>()
    }

    fn index(&mut self, upper: usize) -> usize {
        if upper == 0 {
            return 0;
        }
        self.pick.gen_range(0..upper)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// Deterministic source replaying queued draws, then repeating a fallback.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    values: VecDeque<f32>,
    indices: VecDeque<usize>,
    fallback_value: f32,
    fallback_index: usize,
    value_draws: usize,
    index_draws: usize,
}

impl ScriptedRandom {
    /// Every `value()` call returns `value`; every `index()` call returns 0.
    #[must_use]
    pub fn fixed(value: f32) -> Self {
        Self {
            fallback_value: value,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_values(mut self, values: impl IntoIterator<Item = f32>) -> Self {
        self.values.extend(values);
        self
    }

    #[must_use]
    pub fn with_indices(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.indices.extend(indices);
        self
    }

    #[must_use]
    pub const fn with_fallback_index(mut self, index: usize) -> Self {
        self.fallback_index = index;
        self
    }

    #[must_use]
    pub const fn value_draws(&self) -> usize {
        self.value_draws
    }

    #[must_use]
    pub const fn index_draws(&self) -> usize {
        self.index_draws
    }
}

impl RandomSource for ScriptedRandom {
    fn value(&mut self) -> f32 {
        self.value_draws += 1;
        self.values.pop_front().unwrap_or(self.fallback_value)
    }

    fn index(&mut self, upper: usize) -> usize {
        self.index_draws += 1;
        if upper == 0 {
            return 0;
        }
        self.indices.pop_front().unwrap_or(self.fallback_index) % upper
    }
}
