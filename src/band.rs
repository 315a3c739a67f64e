use std::f64::consts::TAU;

use crate::dsp::{isochronic_envelope, SineTable, Smoothed};

/// Frequencies closer than this to their target snap onto it.
const FREQ_SNAP_HZ: f32 = 1e-4;

/// One stereo oscillator pair. The difference between the right and left
/// frequency is the beat, which also drives the band's isochronic pulse.
#[derive(Debug, Clone)]
pub struct Band {
    phase_l: f64,
    phase_r: f64,
    freq_l: Smoothed,
    freq_r: Smoothed,
    iso_phase: f64,
}

impl Band {
    pub fn new(freq_l: f32, freq_r: f32) -> Self {
        Self {
            phase_l: 0.0,
            phase_r: 0.0,
            freq_l: Smoothed::new(freq_l, FREQ_SNAP_HZ),
            freq_r: Smoothed::new(freq_r, FREQ_SNAP_HZ),
            iso_phase: 0.0,
        }
    }

    pub fn set_targets(&mut self, left: Option<f32>, right: Option<f32>) {
        if let Some(f) = left {
            self.freq_l.set_target(f);
        }
        if let Some(f) = right {
            self.freq_r.set_target(f);
        }
    }

    pub fn targets(&self) -> (f32, f32) {
        (self.freq_l.target(), self.freq_r.target())
    }

    pub fn frequencies(&self) -> (f32, f32) {
        (self.freq_l.value(), self.freq_r.value())
    }

    pub fn phases(&self) -> (f64, f64) {
        (self.phase_l, self.phase_r)
    }

    pub fn iso_phase(&self) -> f64 {
        self.iso_phase
    }

    /// Beat frequency from the current smoothed values; negative when the
    /// left channel is higher.
    #[inline]
    pub fn beat(&self) -> f32 {
        self.freq_r.value() - self.freq_l.value()
    }

    /// Advance the frequency smoothers only.
    #[inline]
    pub fn smooth(&mut self, coeff: f32) {
        self.freq_l.next(coeff);
        self.freq_r.next(coeff);
    }

    /// Produce one stereo sample from the current phases, then advance them.
    /// `phase_scale` is `table_len / sample_rate`.
    #[inline]
    pub fn tick(&mut self, table: &SineTable, phase_scale: f64) -> (f32, f32) {
        let len = table.len() as f64;
        let l = table.lookup(self.phase_l);
        let r = table.lookup(self.phase_r);
        self.phase_l = wrap(self.phase_l + self.freq_l.value() as f64 * phase_scale, len);
        self.phase_r = wrap(self.phase_r + self.freq_r.value() as f64 * phase_scale, len);
        (l, r)
    }

    /// Sample the isochronic envelope, then advance its phase by one sample
    /// of the current beat frequency.
    #[inline]
    pub fn envelope(&mut self, table: &SineTable, sample_rate: f64) -> f32 {
        let env = isochronic_envelope(table, self.iso_phase);
        let step = TAU * self.beat() as f64 / sample_rate;
        let mut phase = self.iso_phase + step;
        if phase >= TAU {
            phase -= TAU;
        } else if phase < 0.0 {
            phase += TAU;
        }
        self.iso_phase = phase;
        env
    }
}

/// Single subtraction is enough: frequencies stay far below the sample rate.
#[inline]
fn wrap(phase: f64, len: f64) -> f64 {
    if phase >= len {
        phase - len
    } else {
        phase
    }
}
