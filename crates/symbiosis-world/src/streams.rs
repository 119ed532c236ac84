//! Independent, reproducible random variate streams.
//!
//! Every stochastic component of the model draws from its own generator
//! (see [`Stream`]). All generators share the run seed and are separated by
//! their `ChaCha` stream id, so the sequence seen by one component depends
//! only on the seed and on how often that component itself has drawn.
//!
//! Rejection samplers ([`RandomStreams::fuzz`],
//! [`RandomStreams::gamma_until`]) redraw until the value is acceptable and
//! give up with [`StreamError::RejectionLimit`] after
//! [`MAX_REJECTION_ATTEMPTS`] draws.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp, Gamma, Normal};
use symbiosis_types::Stream;

use crate::error::StreamError;

/// Upper bound on redraws in a rejection sampler.
pub const MAX_REJECTION_ATTEMPTS: u32 = 10_000;

/// One seeded generator per [`Stream`].
#[derive(Debug, Clone)]
pub struct RandomStreams {
    seed: u64,
    generators: Vec<ChaCha8Rng>,
}

impl RandomStreams {
    /// Create the full set of streams from a run seed.
    pub fn new(seed: u64) -> Self {
        let generators = Stream::ALL
            .iter()
            .map(|stream| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(stream.stream_id());
                rng
            })
            .collect();
        Self { seed, generators }
    }

    /// Return the run seed.
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    fn generator(&mut self, stream: Stream) -> Result<&mut ChaCha8Rng, StreamError> {
        self.generators
            .get_mut(stream.index())
            .ok_or(StreamError::MissingStream(stream))
    }

    /// Uniform draw on `[0, 1)`.
    pub fn random(&mut self, stream: Stream) -> Result<f64, StreamError> {
        Ok(self.generator(stream)?.random::<f64>())
    }

    /// Uniform draw on `[low, high)`; `low == high` returns `low`.
    pub fn uniform(&mut self, low: f64, high: f64, stream: Stream) -> Result<f64, StreamError> {
        if !low.is_finite() || !high.is_finite() || low > high {
            return Err(StreamError::InvalidParameter {
                distribution: "uniform",
                reason: format!("bounds [{low}, {high}]"),
            });
        }
        let u = self.random(stream)?;
        Ok((high - low).mul_add(u, low))
    }

    /// Exponential draw with the given mean.
    pub fn exponential(&mut self, mean: f64, stream: Stream) -> Result<f64, StreamError> {
        if !mean.is_finite() || mean <= 0.0 {
            return Err(StreamError::InvalidParameter {
                distribution: "exponential",
                reason: format!("mean {mean} must be positive"),
            });
        }
        let dist = Exp::new(mean.recip()).map_err(|e| StreamError::InvalidParameter {
            distribution: "exponential",
            reason: e.to_string(),
        })?;
        Ok(dist.sample(self.generator(stream)?))
    }

    /// Gamma draw with the given shape and scale (mean `shape * scale`).
    pub fn gamma(&mut self, shape: f64, scale: f64, stream: Stream) -> Result<f64, StreamError> {
        let dist = Gamma::new(shape, scale).map_err(|e| StreamError::InvalidParameter {
            distribution: "gamma",
            reason: e.to_string(),
        })?;
        Ok(dist.sample(self.generator(stream)?))
    }

    /// Gamma draw repeated until `accept` holds for the value.
    pub fn gamma_until(
        &mut self,
        shape: f64,
        scale: f64,
        stream: Stream,
        accept: impl Fn(f64) -> bool,
    ) -> Result<f64, StreamError> {
        let dist = Gamma::new(shape, scale).map_err(|e| StreamError::InvalidParameter {
            distribution: "gamma",
            reason: e.to_string(),
        })?;
        let rng = self.generator(stream)?;
        for _ in 0..MAX_REJECTION_ATTEMPTS {
            let value = dist.sample(rng);
            if accept(value) {
                return Ok(value);
            }
        }
        Err(StreamError::RejectionLimit {
            stream,
            attempts: MAX_REJECTION_ATTEMPTS,
        })
    }

    /// Normal draw with the given mean and standard deviation.
    pub fn normal(&mut self, mean: f64, sd: f64, stream: Stream) -> Result<f64, StreamError> {
        let dist = Normal::new(mean, sd).map_err(|e| StreamError::InvalidParameter {
            distribution: "normal",
            reason: e.to_string(),
        })?;
        Ok(dist.sample(self.generator(stream)?))
    }

    /// Integer draw on the inclusive range `[low, high]`.
    pub fn randint(&mut self, low: usize, high: usize, stream: Stream) -> Result<usize, StreamError> {
        if low > high {
            return Err(StreamError::EmptyRange { low, high });
        }
        Ok(self.generator(stream)?.random_range(low..=high))
    }

    /// Shuffle `items` in place.
    pub fn shuffle<T>(&mut self, items: &mut [T], stream: Stream) -> Result<(), StreamError> {
        items.shuffle(self.generator(stream)?);
        Ok(())
    }

    /// Perturb `mean` by a non-negative normal variate.
    ///
    /// `pct` is the fraction of the mean covered by two standard deviations,
    /// so roughly 95% of draws fall in `mean * (1 +/- pct)`. Negative draws
    /// are redrawn.
    pub fn fuzz(&mut self, mean: f64, pct: f64, stream: Stream) -> Result<f64, StreamError> {
        if !mean.is_finite() || mean < 0.0 || !pct.is_finite() || pct < 0.0 {
            return Err(StreamError::InvalidParameter {
                distribution: "fuzz",
                reason: format!("mean {mean} and fraction {pct} must be non-negative"),
            });
        }
        let sd = mean * pct / 2.0;
        let dist = Normal::new(mean, sd).map_err(|e| StreamError::InvalidParameter {
            distribution: "fuzz",
            reason: e.to_string(),
        })?;
        let rng = self.generator(stream)?;
        for _ in 0..MAX_REJECTION_ATTEMPTS {
            let value = dist.sample(rng);
            if value >= 0.0 {
                return Ok(value);
            }
        }
        Err(StreamError::RejectionLimit {
            stream,
            attempts: MAX_REJECTION_ATTEMPTS,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_sequence() {
        let mut a = RandomStreams::new(5_551_212);
        let mut b = RandomStreams::new(5_551_212);
        for _ in 0..50 {
            assert_eq!(
                a.random(Stream::Arrivals).unwrap(),
                b.random(Stream::Arrivals).unwrap()
            );
        }
    }

    #[test]
    fn streams_do_not_perturb_each_other() {
        let mut a = RandomStreams::new(42);
        let mut b = RandomStreams::new(42);
        // Burn draws on one component of `a` only.
        for _ in 0..100 {
            let _ = a.random(Stream::Eviction).unwrap();
        }
        assert_eq!(
            a.random(Stream::Clade).unwrap(),
            b.random(Stream::Clade).unwrap()
        );
    }

    #[test]
    fn distinct_streams_differ() {
        let mut s = RandomStreams::new(7);
        let x: Vec<f64> = (0..8).map(|_| s.random(Stream::EndG0).unwrap()).collect();
        let mut t = RandomStreams::new(7);
        let y: Vec<f64> = (0..8).map(|_| t.random(Stream::EndG1sg2m).unwrap()).collect();
        assert_ne!(x, y);
    }

    #[test]
    fn fuzz_is_non_negative_and_centered() {
        let mut s = RandomStreams::new(1);
        let n = 2_000;
        let mut sum = 0.0;
        for _ in 0..n {
            let v = s.fuzz(10.0, 0.2, Stream::HostCellDemand).unwrap();
            assert!(v >= 0.0);
            sum += v;
        }
        let mean = sum / f64::from(n);
        assert!((mean - 10.0).abs() < 0.1, "mean was {mean}");
    }

    #[test]
    fn fuzz_with_zero_fraction_is_exact() {
        let mut s = RandomStreams::new(1);
        assert_eq!(s.fuzz(3.5, 0.0, Stream::EndG0).unwrap(), 3.5);
    }

    #[test]
    fn fuzz_rejects_negative_mean() {
        let mut s = RandomStreams::new(1);
        assert!(s.fuzz(-1.0, 0.1, Stream::EndG0).is_err());
    }

    #[test]
    fn randint_is_inclusive() {
        let mut s = RandomStreams::new(9);
        let mut seen_low = false;
        let mut seen_high = false;
        for _ in 0..500 {
            let v = s.randint(2, 4, Stream::OpenCellOnArrival).unwrap();
            assert!((2..=4).contains(&v));
            seen_low |= v == 2;
            seen_high |= v == 4;
        }
        assert!(seen_low && seen_high);
        assert!(s.randint(3, 2, Stream::OpenCellOnArrival).is_err());
    }

    #[test]
    fn gamma_until_respects_bound() {
        let mut s = RandomStreams::new(11);
        for _ in 0..200 {
            let v = s
                .gamma_until(2.0, 1.0, Stream::Photosynthate, |x| x <= 1.5)
                .unwrap();
            assert!(v <= 1.5);
        }
    }

    #[test]
    fn gamma_until_gives_up() {
        let mut s = RandomStreams::new(11);
        let r = s.gamma_until(2.0, 1.0, Stream::Photosynthate, |_| false);
        assert!(matches!(r, Err(StreamError::RejectionLimit { .. })));
    }

    #[test]
    fn exponential_mean_is_close() {
        let mut s = RandomStreams::new(3);
        let n = 5_000;
        let total: f64 = (0..n)
            .map(|_| s.exponential(2.0, Stream::Arrivals).unwrap())
            .sum();
        let mean = total / f64::from(n);
        assert!((mean - 2.0).abs() < 0.15, "mean was {mean}");
        assert!(s.exponential(0.0, Stream::Arrivals).is_err());
    }

    #[test]
    fn uniform_stays_in_bounds() {
        let mut s = RandomStreams::new(5);
        for _ in 0..200 {
            let v = s.uniform(1.0, 3.0, Stream::TimeG0Escape).unwrap();
            assert!((1.0..3.0).contains(&v));
        }
        assert_eq!(s.uniform(2.0, 2.0, Stream::TimeG0Escape).unwrap(), 2.0);
        assert!(s.uniform(3.0, 1.0, Stream::TimeG0Escape).is_err());
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut s = RandomStreams::new(8);
        let mut items: Vec<u32> = (0..20).collect();
        s.shuffle(&mut items, Stream::CheckForOpenCell).unwrap();
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }
}
