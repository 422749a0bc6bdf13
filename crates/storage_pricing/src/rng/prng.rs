//! Seeded pseudo-random number generation for path simulation.
//!
//! This module provides [`PathRng`], a seeded PRNG wrapper. Every simulated
//! path owns an independent stream derived from the run seed and the path
//! index, so results do not depend on how paths are scheduled across
//! threads.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

/// Monte Carlo random number generator.
///
/// # Examples
///
/// ```rust
/// use storage_pricing::rng::PathRng;
///
/// let mut a = PathRng::for_path(42, 7);
/// let mut b = PathRng::for_path(42, 7);
/// assert_eq!(a.gen_normal(), b.gen_normal());
///
/// let mut buffer = vec![0.0; 16];
/// a.fill_normal(&mut buffer);
/// ```
pub struct PathRng {
    inner: StdRng,
    seed: u64,
}

impl PathRng {
    /// Creates a generator initialised with `seed`.
    #[inline]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Generator for path `path` of a run seeded with `seed`.
    ///
    /// The two values are mixed with a SplitMix64 finaliser so that
    /// neighbouring paths receive unrelated streams.
    #[inline]
    pub fn for_path(seed: u64, path: usize) -> Self {
        Self::from_seed(mix_seed(seed, path as u64))
    }

    /// Seed used for initialisation.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform variate in [0, 1).
    #[inline]
    pub fn gen_uniform(&mut self) -> f64 {
        self.inner.gen()
    }

    /// Standard normal variate via `rand_distr::StandardNormal`.
    #[inline]
    pub fn gen_normal(&mut self) -> f64 {
        StandardNormal.sample(&mut self.inner)
    }

    /// Fills `buffer` with standard normal variates.
    #[inline]
    pub fn fill_normal(&mut self, buffer: &mut [f64]) {
        for value in buffer.iter_mut() {
            *value = StandardNormal.sample(&mut self.inner);
        }
    }
}

fn mix_seed(seed: u64, stream: u64) -> u64 {
    let mut z = seed ^ stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = PathRng::from_seed(12345);
        let mut b = PathRng::from_seed(12345);
        for _ in 0..100 {
            assert_eq!(a.gen_normal(), b.gen_normal());
        }
    }

    #[test]
    fn test_paths_get_distinct_streams() {
        let mut a = PathRng::for_path(1, 0);
        let mut b = PathRng::for_path(1, 1);
        assert_ne!(a.seed(), b.seed());
        assert_ne!(a.gen_normal(), b.gen_normal());
    }

    #[test]
    fn test_uniform_range() {
        let mut rng = PathRng::from_seed(3);
        for _ in 0..1000 {
            let u = rng.gen_uniform();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn test_fill_normal_moments() {
        let mut rng = PathRng::from_seed(99);
        let mut buffer = vec![0.0; 20_000];
        rng.fill_normal(&mut buffer);

        let n = buffer.len() as f64;
        let mean = buffer.iter().sum::<f64>() / n;
        let var = buffer.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
        assert!(mean.abs() < 0.03, "mean {}", mean);
        assert!((var - 1.0).abs() < 0.05, "variance {}", var);
    }
}
