//! Benchmark fixtures for barline.

use barline_lib::Tick;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Configuration for a generated tick stream.
#[derive(Debug, Clone)]
pub struct TickFixture {
    /// Symbol stamped on every tick.
    pub symbol: String,
    /// Number of ticks to generate.
    pub count: usize,
    /// Milliseconds between consecutive ticks.
    pub step_ms: i64,
    /// Starting price.
    pub start_price: f64,
    /// Random seed.
    pub seed: u64,
}

impl Default for TickFixture {
    fn default() -> Self {
        Self {
            symbol: "EURUSD".to_string(),
            // Roughly a busy FX hour at four ticks per second
            count: 14_400,
            step_ms: 250,
            start_price: 1.1,
            seed: 7,
        }
    }
}

impl TickFixture {
    /// Generates the tick stream, deterministic for a given seed.
    pub fn generate(&self) -> Vec<Tick> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut price = self.start_price;
        (0..self.count)
            .map(|i| {
                price *= 1.0 + rng.random_range(-0.0002..=0.0002);
                Tick::new(self.symbol.clone(), i as i64 * self.step_ms, price)
                    .with_volume(rng.random_range(0.1..2.0))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_is_deterministic() {
        let fixture = TickFixture {
            count: 100,
            ..Default::default()
        };
        let first = fixture.generate();
        let second = fixture.generate();
        assert_eq!(first.len(), 100);
        assert_eq!(first[99].timestamp_ms, 99 * 250);
        assert!(first.iter().zip(&second).all(|(a, b)| a.price == b.price));
    }
}
