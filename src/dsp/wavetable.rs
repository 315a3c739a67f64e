use std::f64::consts::TAU;

use crate::error::{EngineError, Result};

/// One period of a sine wave sampled at `len` points, plus a copy of the
/// first sample at index `len` so interpolation never has to wrap.
#[derive(Debug, Clone)]
pub struct SineTable {
    samples: Box<[f32]>,
    len: usize,
}

impl SineTable {
    pub fn new(len: usize) -> Result<Self> {
        if len < 4 {
            return Err(EngineError::TableSize(len));
        }
        let mut samples = Vec::with_capacity(len + 1);
        for i in 0..len {
            samples.push((TAU * i as f64 / len as f64).sin() as f32);
        }
        samples.push(samples[0]);
        Ok(Self {
            samples: samples.into_boxed_slice(),
            len,
        })
    }

    /// Number of distinct samples in one period (excludes the guard sample).
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Linear interpolation at `phase`, which must lie in `[0, len)`.
    #[inline]
    pub fn lookup(&self, phase: f64) -> f32 {
        let idx = phase as usize;
        let frac = (phase - idx as f64) as f32;
        // Clamp keeps the read in bounds even if a caller hands us len exactly.
        let idx = idx.min(self.len - 1);
        let a = self.samples[idx];
        let b = self.samples[idx + 1];
        a + (b - a) * frac
    }

    /// Cosine of an angle in radians, read from the same table.
    #[inline]
    pub fn cos(&self, radians: f64) -> f32 {
        let len = self.len as f64;
        let mut phase = (radians / TAU + 0.25) * len;
        phase = phase.rem_euclid(len);
        self.lookup(phase)
    }
}
