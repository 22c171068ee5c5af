use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of randomness for the template generators.
pub trait RandomSource: Send {
    /// Uniform index in `0..n`; returns 0 when `n` is 0.
    fn below(&mut self, n: usize) -> usize;

    /// Uniform value in the inclusive range `lo..=hi`.
    fn between(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        lo + self.below((hi - lo + 1) as usize) as u32
    }
}

pub struct RngSource<R>(pub R);

impl RngSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> RandomSource for RngSource<R> {
    fn below(&mut self, n: usize) -> usize {
        if n == 0 {
            0
        } else {
            self.0.gen_range(0..n)
        }
    }
}

pub fn pick<'a, T>(rng: &mut dyn RandomSource, items: &'a [T]) -> &'a T {
    &items[rng.below(items.len())]
}

/// Fisher-Yates over a copy of `items`.
pub fn shuffled<T: Clone>(rng: &mut dyn RandomSource, items: &[T]) -> Vec<T> {
    let mut out = items.to_vec();
    for i in (1..out.len()).rev() {
        let j = rng.below(i + 1);
        out.swap(i, j);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_stays_in_range() {
        let mut rng = RngSource::seeded(7);
        for _ in 0..500 {
            let v = rng.between(80, 99);
            assert!((80..=99).contains(&v));
        }
        assert_eq!(rng.between(5, 5), 5);
    }

    #[test]
    fn same_seed_same_shuffle() {
        let items = ["a", "b", "c", "d", "e"];
        let a = shuffled(&mut RngSource::seeded(42), &items);
        let b = shuffled(&mut RngSource::seeded(42), &items);
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(sorted, items.to_vec());
    }
}
