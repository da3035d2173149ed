use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Seed used by [`set_seed`].
pub const DEFAULT_SEED: u64 = 12499489;

/// Seed every random number generator with [`DEFAULT_SEED`].
pub fn set_seed() -> ChaCha8Rng {
    set_seed_with(DEFAULT_SEED)
}

/// Seed torch on the CPU and on every CUDA device, turn off cuDNN
/// benchmarking, and return a generator for the shuffles done in this crate.
pub fn set_seed_with(seed: u64) -> ChaCha8Rng {
    tch::manual_seed(seed as i64);
    tch::Cuda::manual_seed_all(seed);
    tch::Cuda::cudnn_set_benchmark(false);
    debug!(seed, "seeded random number generators");
    ChaCha8Rng::seed_from_u64(seed)
}
