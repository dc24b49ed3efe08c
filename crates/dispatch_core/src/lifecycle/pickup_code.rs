use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CODE_RANGE: std::ops::Range<u32> = 100_000..1_000_000;

/// Six-digit one-time codes handed to the rider at accept time.
#[derive(Debug)]
pub struct PickupCodeGenerator {
    rng: Mutex<StdRng>,
}

impl PickupCodeGenerator {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn next_code(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_range(CODE_RANGE).to_string()
    }
}

/// Compare a submitted code with the stored one, ignoring surrounding space.
pub(super) fn codes_match(expected: &str, submitted: &str) -> bool {
    expected == submitted.trim()
}
