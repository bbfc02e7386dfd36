use std::sync::Mutex;

use rand::{rngs::StdRng, RngCore, SeedableRng};

/// Source of tower heights for newly inserted nodes. Implementations must be
/// safe to call from any thread.
pub trait LevelGenerator: Send + Sync {
    /// Draws a level in `[1, max_level]`.
    fn random_level(&self, max_level: usize) -> usize;
}

/// Geometric draw: start at 1, keep a fair coin flipping, cap at `max_level`.
pub struct GeometricLevels {
    rng: Mutex<StdRng>,
}

impl GeometricLevels {
    pub fn new() -> Self {
        GeometricLevels {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        GeometricLevels {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for GeometricLevels {
    fn default() -> Self {
        GeometricLevels::new()
    }
}

impl LevelGenerator for GeometricLevels {
    fn random_level(&self, max_level: usize) -> usize {
        let mut rng = self.rng.lock().unwrap();
        let mut level = 1;
        while level < max_level && rng.next_u32() % 2 == 0 {
            level += 1;
        }
        level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_stay_in_bounds() {
        let levels = GeometricLevels::with_seed(0xdeadbeef);
        for _ in 0..10_000 {
            let l = levels.random_level(12);
            assert!((1..=12).contains(&l));
        }
    }

    #[test]
    fn test_cap_of_one() {
        let levels = GeometricLevels::with_seed(7);
        for _ in 0..100 {
            assert_eq!(levels.random_level(1), 1);
        }
    }

    #[test]
    fn test_seeded_draws_are_reproducible() {
        let a = GeometricLevels::with_seed(42);
        let b = GeometricLevels::with_seed(42);
        let left: Vec<usize> = (0..256).map(|_| a.random_level(16)).collect();
        let right: Vec<usize> = (0..256).map(|_| b.random_level(16)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_tall_towers_are_rare() {
        let levels = GeometricLevels::with_seed(1);
        let draws = 10_000;
        let tall = (0..draws)
            .filter(|_| levels.random_level(20) > 10)
            .count();
        // P(level > 10) = 2^-10; even a loose bound catches a broken coin.
        assert!(tall < draws / 100);
    }
}
