//! Reproducibility keys for the exploration pipeline.
//!
//! A solve fans out in three directions that all consume randomness: pool
//! workers restart the same configuration sweep from different initial
//! states, each exploration draws its batch initializations and iteration
//! counts from a local generator, and the deep search chains one run after
//! another. [`RngKey`] makes all of that replayable from one root seed:
//! children are carved out of independent ChaCha8 streams of the parent
//! key, so any worker, run or exploration can be re-derived in isolation
//! without replaying the draws that preceded it.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A key for deterministic random number generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RngKey(pub u64);

impl RngKey {
    pub fn new(seed: u64) -> Self {
        RngKey(seed)
    }

    /// The seed value, recorded in exploration results so a sweep can be
    /// replayed without the key that spawned it.
    pub fn seed(&self) -> u64 {
        self.0
    }

    /// The child key at `index`.
    ///
    /// Children live on separate ChaCha8 streams of the parent seed, so
    /// derivation is random access: the key for deep-search run 17 or
    /// pool worker 3 never depends on how many siblings came before it.
    pub fn child(self, index: u64) -> RngKey {
        let mut stream = ChaCha8Rng::seed_from_u64(self.0);
        stream.set_stream(index);
        RngKey(stream.next_u64())
    }

    /// One child per pool worker, so every worker restarts the sweep from
    /// its own initial states.
    pub fn worker_keys(self, workers: usize) -> Vec<RngKey> {
        (0..workers as u64).map(|w| self.child(w)).collect()
    }

    /// The host-side generator this key stands for. Batch initial states
    /// and iteration draws inside one exploration all come from here.
    pub fn host_rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.0)
    }
}
