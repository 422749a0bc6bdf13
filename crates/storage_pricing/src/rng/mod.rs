//! Random number generation for Monte Carlo path simulation.

mod prng;

pub use prng::PathRng;
