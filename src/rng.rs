//! The random engine threaded through weight initialization and noise
//! injection.
//!
//! Nothing in the crate keeps ambient random state: every operation that
//! draws random numbers takes the engine as an argument, so a network built
//! from `seeded(n)` is reproducible.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// The engine type used by the demo binary and tests.
pub type Engine = StdRng;

/// Returns an engine with a fixed seed.
pub fn seeded(seed: u64) -> Engine {
    StdRng::seed_from_u64(seed)
}

/// Returns an engine seeded from the operating system.
pub fn from_entropy() -> Engine {
    StdRng::from_os_rng()
}
