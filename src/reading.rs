//! Synthetic rain readings
//!
//! The generator is a bounded random walk over rain intensity in mm/h, which
//! looks more like weather than independent uniform draws. Seedable for
//! deterministic tests.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Plausible range for a rain sensor: 0 (dry) to 50 mm/h (violent rain)
pub const MAX_INTENSITY_MM_H: f64 = 50.0;

/// Largest step between consecutive readings
const MAX_STEP_MM_H: f64 = 3.0;

/// One measurement, timestamped at generation time and sent immediately
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub intensity_mm_h: f64,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Line encoding for the collector wire: intensity with two decimals,
    /// one reading per line
    pub fn encode_line(&self) -> String {
        format!("{:.2}", self.intensity_mm_h)
    }
}

pub struct ReadingGenerator {
    rng: StdRng,
    current: f64,
}

impl ReadingGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            current: 0.0,
        }
    }

    /// Deterministic generator for tests
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            current: 0.0,
        }
    }

    pub fn next(&mut self) -> Reading {
        let step = self.rng.gen_range(-MAX_STEP_MM_H..=MAX_STEP_MM_H);
        self.current = (self.current + step).clamp(0.0, MAX_INTENSITY_MM_H);
        Reading {
            intensity_mm_h: self.current,
            timestamp: Utc::now(),
        }
    }
}

impl Default for ReadingGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readings_stay_in_range() {
        let mut generator = ReadingGenerator::with_seed(7);
        for _ in 0..10_000 {
            let reading = generator.next();
            assert!(reading.intensity_mm_h >= 0.0);
            assert!(reading.intensity_mm_h <= MAX_INTENSITY_MM_H);
        }
    }

    #[test]
    fn test_seeded_generators_agree() {
        let mut a = ReadingGenerator::with_seed(42);
        let mut b = ReadingGenerator::with_seed(42);
        for _ in 0..100 {
            assert_eq!(a.next().intensity_mm_h, b.next().intensity_mm_h);
        }
    }

    #[test]
    fn test_line_encoding() {
        let reading = Reading {
            intensity_mm_h: 12.345,
            timestamp: Utc::now(),
        };
        assert_eq!(reading.encode_line(), "12.35");
    }
}
