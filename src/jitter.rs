// src/jitter.rs
//! Random tie-breaking noise added to crop scores. Always injected so tests
//! and offline evaluation can pin it with a seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait JitterSource {
    /// Uniform draw in `[0, max)`; `0.0` when `max <= 0`.
    fn jitter(&mut self, max: f32) -> f32;
}

impl<R: Rng + ?Sized> JitterSource for R {
    fn jitter(&mut self, max: f32) -> f32 {
        if max > 0.0 && max.is_finite() {
            self.random_range(0.0..max)
        } else {
            0.0
        }
    }
}

/// Deterministic source: scores are base + rule deltas only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn jitter(&mut self, _max: f32) -> f32 {
        0.0
    }
}

/// Seeded when configured, OS entropy otherwise.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    }
}
