use crate::band::Band;
use crate::dsp::{clip_guard, slow_coeff, smoothing_coeff, GainRamp, InterleaveDelay, SineTable, Smoothed};
use crate::error::{EngineError, Result};
use crate::models::ParamUpdate;
use crate::session::Voice;

/// Number of bands addressable by [`ParamUpdate`].
pub const MAX_BANDS: usize = 2;

const MIX_SNAP: f32 = 1e-6;
const DELAY_SNAP: f32 = 1e-3;

/// Construction-time parameters of a [`BinauralEngine`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub sample_rate: u32,
    pub band_count: usize,
    pub table_size: usize,
    /// Initial frequency smoothing time in seconds.
    pub freq_smooth: f32,
    /// Gain ramp duration used until a message supplies `gainSmooth`.
    pub gain_smooth: f32,
    /// Initial left/right frequency of each band.
    pub band_defaults: [[f32; 2]; MAX_BANDS],
}

impl EngineSettings {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            band_count: MAX_BANDS,
            table_size: 2048,
            freq_smooth: 0.05,
            gain_smooth: 0.5,
            band_defaults: [[200.0, 210.0], [400.0, 410.0]],
        }
    }
}

struct Slot {
    band: Band,
    enabled: bool,
    mix: Smoothed,
}

/// N-band binaural beat renderer.
///
/// All mutable state lives here and is only touched by the thread that calls
/// [`BinauralEngine::apply`] and [`BinauralEngine::render`]. Band 0 is always
/// mixed at unit weight; secondary bands are gated by their enable flag and
/// weighted by their smoothed mix level. The right channel runs through the
/// interleave delay before the output gain is applied.
pub struct BinauralEngine {
    sample_rate: f32,
    phase_scale: f64,
    table: SineTable,
    slots: Vec<Slot>,
    iso_enabled: bool,
    interleave: Smoothed,
    delay: InterleaveDelay,
    gain: GainRamp,
    gain_smooth: f32,
    freq_coeff: f32,
    slow_coeff: f32,
}

impl BinauralEngine {
    pub fn new(settings: &EngineSettings) -> Result<Self> {
        if settings.sample_rate == 0 {
            return Err(EngineError::ZeroSampleRate);
        }
        if settings.band_count == 0 || settings.band_count > MAX_BANDS {
            return Err(EngineError::BandCount(settings.band_count));
        }
        let table = SineTable::new(settings.table_size)?;
        let sample_rate = settings.sample_rate as f32;

        let slots = settings.band_defaults[..settings.band_count]
            .iter()
            .enumerate()
            .map(|(i, &[l, r])| Slot {
                band: Band::new(l, r),
                enabled: i == 0,
                mix: Smoothed::new(if i == 0 { 1.0 } else { 0.0 }, MIX_SNAP),
            })
            .collect();

        log::info!(
            "binaural engine: {} band(s) at {} Hz, {}-point table",
            settings.band_count,
            settings.sample_rate,
            settings.table_size
        );

        Ok(Self {
            sample_rate,
            phase_scale: table.len() as f64 / sample_rate as f64,
            table,
            slots,
            iso_enabled: false,
            interleave: Smoothed::new(0.0, DELAY_SNAP),
            delay: InterleaveDelay::new(sample_rate),
            gain: GainRamp::new(0.0),
            gain_smooth: settings.gain_smooth.max(0.0),
            freq_coeff: smoothing_coeff(sample_rate, settings.freq_smooth),
            slow_coeff: slow_coeff(sample_rate),
        })
    }

    /// Merge a sparse update into the current targets. Flags take effect on
    /// the next sample; scalar fields only move targets.
    pub fn apply(&mut self, msg: &ParamUpdate) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            let (l, r) = msg.band_freqs(i);
            slot.band.set_targets(l, r);
        }
        if let Some(slot) = self.slots.get_mut(1) {
            if let Some(enabled) = msg.band2_enabled {
                slot.enabled = enabled;
            }
            if let Some(mix) = msg.band2_mix {
                slot.mix.set_target(mix);
            }
        }
        if let Some(iso) = msg.iso_enabled {
            self.iso_enabled = iso;
        }
        if let Some(ms) = msg.interleave_ms {
            let samples = (ms * self.sample_rate / 1000.0).clamp(0.0, self.delay.max_delay());
            self.interleave.set_target(samples);
        }
        if let Some(seconds) = msg.freq_smooth {
            self.freq_coeff = smoothing_coeff(self.sample_rate, seconds);
        }
        if let Some(seconds) = msg.gain_smooth {
            self.gain_smooth = seconds.max(0.0);
        }
        if let Some(gain) = msg.gain {
            self.gain
                .retarget(gain, self.gain_smooth as f64 * self.sample_rate as f64);
        }
    }

    /// Overwrite `out` (interleaved stereo) with the next frames.
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        self.process(out);
    }

    #[inline]
    fn next_frame(&mut self) -> (f32, f32) {
        let freq_coeff = self.freq_coeff;
        let slow = self.slow_coeff;
        let sample_rate = self.sample_rate as f64;

        let mut left = 0.0;
        let mut right = 0.0;
        let mut weight_total = 0.0;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.band.smooth(freq_coeff);
            let weight = if i == 0 { 1.0 } else { slot.mix.next(slow) };
            if !slot.enabled {
                continue;
            }
            let (mut l, mut r) = slot.band.tick(&self.table, self.phase_scale);
            if self.iso_enabled {
                let env = slot.band.envelope(&self.table, sample_rate);
                l *= env;
                r *= env;
            }
            left += l * weight;
            right += r * weight;
            if i > 0 && weight > 0.0 {
                weight_total += weight;
            }
        }
        let (left, right) = clip_guard(left, right, weight_total);

        let delay = self.interleave.next(slow);
        let right = self.delay.process(right, delay);

        let gain = self.gain.next();
        (left * gain, right * gain)
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn band_count(&self) -> usize {
        self.slots.len()
    }

    pub fn band(&self, index: usize) -> Option<&Band> {
        self.slots.get(index).map(|s| &s.band)
    }

    pub fn band_enabled(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|s| s.enabled)
    }

    /// Current smoothed mix weight of band `index` (band 0 is always 1).
    pub fn band_mix(&self, index: usize) -> Option<f32> {
        self.slots.get(index).map(|s| s.mix.value())
    }

    pub fn iso_enabled(&self) -> bool {
        self.iso_enabled
    }

    pub fn gain(&self) -> f32 {
        self.gain.value()
    }

    pub fn gain_target(&self) -> f32 {
        self.gain.target()
    }

    /// Current smoothed right-channel delay in samples.
    pub fn interleave_samples(&self) -> f32 {
        self.interleave.value()
    }

    pub fn interleave_target(&self) -> f32 {
        self.interleave.target()
    }

    pub fn delay_capacity(&self) -> usize {
        self.delay.capacity()
    }
}

impl Voice for BinauralEngine {
    fn process(&mut self, output: &mut [f32]) {
        for frame in output.chunks_exact_mut(2) {
            let (l, r) = self.next_frame();
            frame[0] += l;
            frame[1] += r;
        }
    }
}
