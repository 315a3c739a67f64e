use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dsp::{smoothing_coeff, Smoothed};
use crate::error::{EngineError, Result};
use crate::models::{NoiseColor, NoiseUpdate};
use crate::session::Voice;

const GAIN_SNAP: f32 = 1e-6;

/// Leak applied to the brown-noise integrator so it cannot drift off.
const BROWN_LEAK: f32 = 0.998;
const BROWN_STEP: f32 = 0.05;

#[derive(Clone, Copy, Default)]
struct PinkState {
    b0: f32,
    b1: f32,
    b2: f32,
    b3: f32,
    b4: f32,
    b5: f32,
}

impl PinkState {
    /// Paul Kellet's economy pink filter fed with a uniform sample.
    #[inline]
    fn next(&mut self, w: f32) -> f32 {
        self.b0 = 0.99886 * self.b0 + w * 0.0555179;
        self.b1 = 0.99332 * self.b1 + w * 0.0750759;
        self.b2 = 0.96900 * self.b2 + w * 0.1538520;
        self.b3 = 0.86650 * self.b3 + w * 0.3104856;
        self.b4 = 0.55000 * self.b4 + w * 0.5329522;
        self.b5 = -0.7616 * self.b5 - w * 0.0168980;
        ((self.b0 + self.b1 + self.b2 + self.b3 + self.b4 + self.b5 + w * 0.5362) * 0.11)
            .clamp(-1.0, 1.0)
    }
}

#[derive(Clone, Copy, Default)]
struct ChannelState {
    pink: PinkState,
    brown: f32,
}

/// Stereo noise companion to the binaural engine. No phase state; the only
/// smoothed parameter is the output gain.
pub struct NoiseEngine {
    sample_rate: f32,
    color: NoiseColor,
    gain: Smoothed,
    coeff: f32,
    rng: StdRng,
    channels: [ChannelState; 2],
}

impl NoiseEngine {
    pub fn new(sample_rate: u32, smooth: f32) -> Result<Self> {
        Self::with_rng(sample_rate, smooth, StdRng::from_entropy())
    }

    /// Deterministic generator for offline rendering and tests.
    pub fn with_seed(sample_rate: u32, smooth: f32, seed: u64) -> Result<Self> {
        Self::with_rng(sample_rate, smooth, StdRng::seed_from_u64(seed))
    }

    fn with_rng(sample_rate: u32, smooth: f32, rng: StdRng) -> Result<Self> {
        if sample_rate == 0 {
            return Err(EngineError::ZeroSampleRate);
        }
        let sample_rate = sample_rate as f32;
        Ok(Self {
            sample_rate,
            color: NoiseColor::White,
            gain: Smoothed::new(0.0, GAIN_SNAP),
            coeff: smoothing_coeff(sample_rate, smooth),
            rng,
            channels: [ChannelState::default(); 2],
        })
    }

    pub fn apply(&mut self, msg: &NoiseUpdate) {
        if let Some(seconds) = msg.smooth {
            self.coeff = smoothing_coeff(self.sample_rate, seconds);
        }
        if let Some(gain) = msg.gain {
            self.gain.set_target(gain.clamp(0.0, 1.0));
        }
        if let Some(color) = msg.color {
            self.color = color;
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain.value()
    }

    pub fn color(&self) -> NoiseColor {
        self.color
    }

    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        self.process(out);
    }

    #[inline]
    fn next_sample(&mut self, channel: usize) -> f32 {
        let w: f32 = self.rng.gen_range(-1.0..=1.0);
        let state = &mut self.channels[channel];
        match self.color {
            NoiseColor::White => w,
            NoiseColor::Pink => state.pink.next(w),
            NoiseColor::Brown => {
                state.brown = (state.brown * BROWN_LEAK + w * BROWN_STEP).clamp(-1.0, 1.0);
                state.brown
            }
        }
    }
}

impl Voice for NoiseEngine {
    fn process(&mut self, output: &mut [f32]) {
        for frame in output.chunks_exact_mut(2) {
            let gain = self.gain.next(self.coeff);
            if gain == 0.0 {
                continue;
            }
            frame[0] += self.next_sample(0) * gain;
            frame[1] += self.next_sample(1) * gain;
        }
    }
}
