// Default adapters for the randomness and pricing ports.

use std::collections::{BTreeMap, VecDeque};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ports::{PriceSource, RandomSource};

/// Production randomness backed by an OS-seeded `StdRng`.
pub struct ThreadRngSource {
    rng: StdRng,
}

impl ThreadRngSource {
    pub fn new() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    /// Deterministic source for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Default for ThreadRngSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for ThreadRngSource {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn range_inclusive(&mut self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// Replays fixed values, then falls back to the low end of every range.
pub struct ScriptedRandom {
    units: VecDeque<f64>,
    picks: VecDeque<u64>,
}

impl ScriptedRandom {
    pub fn new() -> Self {
        Self { units: VecDeque::new(), picks: VecDeque::new() }
    }

    pub fn with_units(mut self, units: &[f64]) -> Self {
        self.units.extend(units.iter().copied());
        self
    }

    /// Values returned by `range_inclusive`, clamped into the requested range.
    pub fn with_picks(mut self, picks: &[u64]) -> Self {
        self.picks.extend(picks.iter().copied());
        self
    }
}

impl Default for ScriptedRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(0.0)
    }

    fn range_inclusive(&mut self, low: u64, high: u64) -> u64 {
        match self.picks.pop_front() {
            Some(v) => v.clamp(low, high.max(low)),
            None => low,
        }
    }
}

/// Hard-coded testnet rates. Never refreshed.
#[derive(Debug, Clone)]
pub struct StaticRates {
    rates: BTreeMap<(String, String), f64>,
}

impl StaticRates {
    pub fn new() -> Self {
        Self { rates: BTreeMap::new() }
    }

    pub fn with_rate(mut self, source: &str, target: &str, source_per_target: f64) -> Self {
        self.rates.insert((source.to_string(), target.to_string()), source_per_target);
        self
    }

    /// Rough Pharos testnet rates: one WPHRS is worth about 50 of either stable.
    pub fn pharos_testnet() -> Self {
        Self::new()
            .with_rate("USDC", "WPHRS", 50.0)
            .with_rate("USDT", "WPHRS", 50.0)
            .with_rate("WPHRS", "USDC", 0.02)
            .with_rate("WPHRS", "USDT", 0.02)
            .with_rate("USDC", "USDT", 1.0)
            .with_rate("USDT", "USDC", 1.0)
    }
}

impl Default for StaticRates {
    fn default() -> Self {
        Self::pharos_testnet()
    }
}

impl PriceSource for StaticRates {
    fn source_per_target(&self, source: &str, target: &str) -> Option<f64> {
        self.rates.get(&(source.to_string(), target.to_string())).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::shuffle;

    #[test]
    fn test_seeded_source_is_reproducible() {
        let mut a = ThreadRngSource::seeded(7);
        let mut b = ThreadRngSource::seeded(7);
        for _ in 0..20 {
            assert_eq!(a.range_inclusive(3, 9), b.range_inclusive(3, 9));
        }
    }

    #[test]
    fn test_range_inclusive_degenerate() {
        let mut rng = ThreadRngSource::seeded(1);
        assert_eq!(rng.range_inclusive(5, 5), 5);
        assert_eq!(rng.range_inclusive(5, 2), 5);
    }

    #[test]
    fn test_scripted_picks_are_clamped() {
        let mut rng = ScriptedRandom::new().with_picks(&[100, 0]);
        assert_eq!(rng.range_inclusive(3, 5), 5);
        assert_eq!(rng.range_inclusive(3, 5), 3);
        assert_eq!(rng.range_inclusive(3, 5), 3);
    }

    #[test]
    fn test_shuffle_keeps_elements() {
        let mut rng = ThreadRngSource::seeded(42);
        let mut items: Vec<u32> = (0..9).collect();
        shuffle(&mut items, &mut rng);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn test_static_rates_lookup() {
        let rates = StaticRates::pharos_testnet();
        assert_eq!(rates.source_per_target("USDC", "WPHRS"), Some(50.0));
        assert_eq!(rates.source_per_target("WPHRS", "DAI"), None);
        assert!(!rates.is_live());
    }
}
