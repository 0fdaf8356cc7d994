//! Injectable pairing order for seeding and round generation.

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use super::models::Participant;

/// Decides the order in which participants are paired.
pub trait Shuffler: Send {
    /// Reorder `participants` in place
    fn shuffle(&mut self, participants: &mut [Participant]);
}

/// Unbiased Fisher-Yates shuffle over a `StdRng`
pub struct RandomShuffler {
    rng: StdRng,
}

impl RandomShuffler {
    /// Create a shuffler seeded from the operating system
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Create a reproducible shuffler
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomShuffler {
    fn default() -> Self {
        Self::new()
    }
}

impl Shuffler for RandomShuffler {
    fn shuffle(&mut self, participants: &mut [Participant]) {
        participants.shuffle(&mut self.rng);
    }
}

/// Leaves the order untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepOrder;

impl Shuffler for KeepOrder {
    fn shuffle(&mut self, _participants: &mut [Participant]) {}
}
