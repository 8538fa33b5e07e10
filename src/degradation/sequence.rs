use serde::{Deserialize, Serialize};
use std::iter::FusedIterator;

/// Shape of the degradation curve `h(t) = 1 - offset - exp(rate * t^exponent)`.
///
/// With `rate < 0` and `0 < exponent < 1` the curve climbs toward
/// `1 - offset` for large `t` and drops to `-offset` at `t = 0`, so any
/// sequence walking `t` down to zero crosses `threshold` eventually.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayShape {
    pub offset: f64,
    pub rate: f64,
    pub exponent: f64,
    pub threshold: f64,
}

impl DecayShape {
    pub fn health_at(&self, t: u64) -> f64 {
        1.0 - self.offset - (self.rate * (t as f64).powf(self.exponent)).exp()
    }
}

impl Default for DecayShape {
    fn default() -> Self {
        Self {
            offset: 0.05,
            rate: -0.3,
            exponent: 0.2,
            threshold: 0.45,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthSample {
    /// Ticks left until theoretical failure.
    pub t: u64,
    pub h: f64,
}

/// Lazily evaluated health curve for one subcomponent.
///
/// Counts `t` down from the horizon and yields one sample per call. The
/// first value under the threshold ends the sequence without being yielded.
/// Once it returns `None` it stays exhausted; repair means building a new
/// one.
#[derive(Debug, Clone)]
pub struct HealthSequence {
    ttf: u64,
    shape: DecayShape,
    next_t: Option<u64>,
}

impl HealthSequence {
    pub fn new(ttf: u64, shape: DecayShape) -> Self {
        Self {
            ttf,
            shape,
            next_t: Some(ttf),
        }
    }

    pub fn ttf(&self) -> u64 {
        self.ttf
    }

    pub fn shape(&self) -> &DecayShape {
        &self.shape
    }

    pub fn is_exhausted(&self) -> bool {
        self.next_t.is_none()
    }
}

impl Iterator for HealthSequence {
    type Item = HealthSample;

    fn next(&mut self) -> Option<HealthSample> {
        let t = self.next_t?;
        let h = self.shape.health_at(t);
        if h < self.shape.threshold {
            self.next_t = None;
            return None;
        }

        self.next_t = t.checked_sub(1);
        Some(HealthSample { t, h })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next_t {
            Some(t) => (0, usize::try_from(t).ok().and_then(|t| t.checked_add(1))),
            None => (0, Some(0)),
        }
    }
}

impl FusedIterator for HealthSequence {}
