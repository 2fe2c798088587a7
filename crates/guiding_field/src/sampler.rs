//! Uniform random source consumed by the stochastic region lookup.

use rand::{Rng, RngCore};

/// Produces uniform variates in `[0, 1)`.
pub trait Sampler {
  /// Next uniform variate in `[0, 1)`.
  fn next_1d(&mut self) -> f32;
}

impl<R: RngCore> Sampler for R {
  #[inline]
  fn next_1d(&mut self) -> f32 {
    self.random::<f32>()
  }
}

/// Sampler replaying a fixed variate; useful when the caller already drew
/// the random number elsewhere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedSampler(pub f32);

impl Sampler for FixedSampler {
  #[inline]
  fn next_1d(&mut self) -> f32 {
    self.0
  }
}

#[cfg(test)]
mod tests {
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  use super::*;

  #[test]
  fn test_rng_variates_in_unit_interval() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..1000 {
      let u = rng.next_1d();
      assert!((0.0..1.0).contains(&u), "variate {u} out of range");
    }
  }

  #[test]
  fn test_fixed_sampler_replays() {
    let mut sampler = FixedSampler(0.75);
    assert_eq!(sampler.next_1d(), 0.75);
    assert_eq!(sampler.next_1d(), 0.75);
  }
}
