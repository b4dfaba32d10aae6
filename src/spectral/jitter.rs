//! Deterministic phase jitter.
//!
//! Offsets are a pure function of `(pass, frame, channel)`: a fresh ChaCha
//! stream is seeded for every frame of every channel, so frames and channels
//! can be processed in any order or in parallel with identical output.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseJitter {
    /// Offsets are drawn uniformly from `[-amplitude, amplitude]` radians.
    pub amplitude: f64,
    salt: u64,
}

impl PhaseJitter {
    pub const CONSERVATIVE: PhaseJitter = PhaseJitter {
        amplitude: 0.02,
        salt: 1,
    };
    pub const AGGRESSIVE: PhaseJitter = PhaseJitter {
        amplitude: 0.03,
        salt: 2,
    };

    fn seed(&self, frame: usize, channel: usize) -> u64 {
        (self.salt << 56) ^ ((frame as u64) << 16) ^ channel as u64
    }

    /// `count` phase offsets for one frame of one channel.
    pub fn offsets(&self, frame: usize, channel: usize, count: usize) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed(frame, channel));
        (0..count)
            .map(|_| rng.random::<f64>() * 2.0 * self.amplitude - self.amplitude)
            .collect()
    }
}
