use ark_std::rand::{thread_rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Proving keys are read through a buffer this large unless overridden.
pub const DEFAULT_KEY_BUFFER: usize = 64 << 20;

#[derive(Clone, Debug)]
pub struct ProverConfig {
    /// Fixes the randomness of key generation and proving. Only meant for
    /// tests and reproducible benchmarks: a known setup seed leaks the toxic
    /// waste.
    pub seed: Option<u64>,
    pub key_buffer_capacity: usize,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            seed: None,
            key_buffer_capacity: DEFAULT_KEY_BUFFER,
        }
    }
}

impl ProverConfig {
    pub fn rng(&self) -> ChaCha20Rng {
        match self.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => {
                let mut seed = [0u8; 32];
                thread_rng().fill_bytes(&mut seed);
                ChaCha20Rng::from_seed(seed)
            }
        }
    }
}
