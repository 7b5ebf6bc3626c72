//! Uniform winner selection
//!
//! The draw happens once, synchronously, before the wheel starts moving.

use rand::Rng;

use crate::consts::{MAX_PARTICIPANTS, MIN_PARTICIPANTS};
use crate::error::ValidationError;

/// Source of uniform floats in [0, 1)
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

impl<R: Rng> RandomSource for R {
    fn next_unit(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// Picks a winner index with participant-count bounds enforced
#[derive(Debug, Clone, Copy)]
pub struct Selector {
    pub min: usize,
    pub max: usize,
}

impl Default for Selector {
    fn default() -> Self {
        Self {
            min: MIN_PARTICIPANTS,
            max: MAX_PARTICIPANTS,
        }
    }
}

impl Selector {
    pub fn with_max(max: usize) -> Self {
        Self {
            max: max.max(MIN_PARTICIPANTS),
            ..Self::default()
        }
    }

    /// Reject counts outside [min, max]
    pub fn check(&self, n: usize) -> Result<(), ValidationError> {
        if n < self.min {
            return Err(ValidationError::TooFewParticipants {
                count: n,
                min: self.min,
            });
        }
        if n > self.max {
            return Err(ValidationError::TooManyParticipants {
                count: n,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Draw an index uniformly from [0, n)
    pub fn pick<R: RandomSource + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<usize, ValidationError> {
        self.check(n)?;
        let u = rng.next_unit();
        // u * n can round up to n when u is within an ulp of 1
        Ok(((u * n as f64).floor() as usize).min(n - 1))
    }
}

/// Draw with the default bounds
pub fn pick<R: RandomSource + ?Sized>(n: usize, rng: &mut R) -> Result<usize, ValidationError> {
    Selector::default().pick(n, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    struct Fixed(f64);

    impl RandomSource for Fixed {
        fn next_unit(&mut self) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_rejects_fewer_than_two() {
        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(
            pick(0, &mut rng),
            Err(ValidationError::TooFewParticipants { count: 0, min: 2 })
        );
        assert!(pick(1, &mut rng).is_err());
        assert!(pick(2, &mut rng).is_ok());
    }

    #[test]
    fn test_rejects_above_max() {
        let mut rng = Pcg32::seed_from_u64(1);
        assert!(pick(1000, &mut rng).is_ok());
        assert_eq!(
            pick(1001, &mut rng),
            Err(ValidationError::TooManyParticipants { count: 1001, max: 1000 })
        );
        assert!(Selector::with_max(5).pick(6, &mut rng).is_err());
    }

    #[test]
    fn test_top_of_unit_range_stays_in_bounds() {
        let almost_one = 1.0 - f64::EPSILON / 2.0;
        assert_eq!(pick(7, &mut Fixed(almost_one)), Ok(6));
        assert_eq!(pick(7, &mut Fixed(0.0)), Ok(0));
    }

    #[test]
    fn test_distribution_is_uniform() {
        // Chi-square with 9 degrees of freedom; 27.88 is the p = 0.001 cutoff
        let n = 10;
        let trials = 50_000;
        let mut rng = Pcg32::seed_from_u64(0xD1CE);
        let mut counts = vec![0u32; n];
        for _ in 0..trials {
            counts[pick(n, &mut rng).unwrap()] += 1;
        }
        let expected = trials as f64 / n as f64;
        let chi2: f64 = counts
            .iter()
            .map(|&c| {
                let d = c as f64 - expected;
                d * d / expected
            })
            .sum();
        assert!(chi2 < 27.88, "chi-square too large: {chi2} ({counts:?})");
    }

    proptest! {
        #[test]
        fn prop_pick_in_range(n in 2usize..=1000, seed in any::<u64>()) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let i = pick(n, &mut rng).unwrap();
            prop_assert!(i < n);
        }
    }
}
