//! Lock-free control path from the producer side into the render thread.
//!
//! Each engine gets its own single-producer/single-consumer ring buffer of
//! immutable update records. The producer clamps every record before it is
//! queued; the render thread drains the queue once per block.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::dsp::MAX_DELAY_MS;
use crate::error::{EngineError, Result};
use crate::models::{NoiseUpdate, ParamUpdate};

/// Lowest oscillator frequency accepted from the outside.
pub const MIN_FREQ_HZ: f32 = 0.01;
/// Highest oscillator frequency as a fraction of the sample rate.
pub const MAX_FREQ_RATIO: f32 = 0.45;
/// Hard ceiling on any externally requested output level.
pub const VOLUME_CEILING: f32 = 0.8;

/// Bounds applied to update records before they reach an engine.
#[derive(Debug, Clone, Copy)]
pub struct ControlLimits {
    pub sample_rate: f32,
    pub max_volume: f32,
}

impl ControlLimits {
    pub fn new(sample_rate: f32, max_volume: f32) -> Self {
        Self {
            sample_rate,
            max_volume: max_volume.clamp(0.0, VOLUME_CEILING),
        }
    }

    fn max_freq(&self) -> f32 {
        self.sample_rate * MAX_FREQ_RATIO
    }

    fn max_interleave_ms(&self) -> f32 {
        (MAX_DELAY_MS - 1000.0 / self.sample_rate).max(0.0)
    }
}

/// A record that can travel through a control channel.
pub trait ControlMessage: Copy + Send + 'static {
    /// Clamp every present field into its legal range. Non-finite values
    /// are dropped so the field is treated as absent.
    fn sanitized(self, limits: &ControlLimits) -> Self;
}

fn finite(v: Option<f32>) -> Option<f32> {
    v.filter(|x| x.is_finite())
}

fn clamp_opt(v: Option<f32>, lo: f32, hi: f32) -> Option<f32> {
    finite(v).map(|x| x.clamp(lo, hi))
}

fn non_negative(v: Option<f32>) -> Option<f32> {
    finite(v).map(|x| x.max(0.0))
}

impl ControlMessage for ParamUpdate {
    fn sanitized(self, limits: &ControlLimits) -> Self {
        let max_freq = limits.max_freq();
        Self {
            freq1_left: clamp_opt(self.freq1_left, MIN_FREQ_HZ, max_freq),
            freq1_right: clamp_opt(self.freq1_right, MIN_FREQ_HZ, max_freq),
            freq2_left: clamp_opt(self.freq2_left, MIN_FREQ_HZ, max_freq),
            freq2_right: clamp_opt(self.freq2_right, MIN_FREQ_HZ, max_freq),
            band2_enabled: self.band2_enabled,
            band2_mix: clamp_opt(self.band2_mix, 0.0, 1.0),
            iso_enabled: self.iso_enabled,
            interleave_ms: clamp_opt(self.interleave_ms, 0.0, limits.max_interleave_ms()),
            freq_smooth: non_negative(self.freq_smooth),
            gain: clamp_opt(self.gain, 0.0, limits.max_volume),
            gain_smooth: non_negative(self.gain_smooth),
        }
    }
}

impl ControlMessage for NoiseUpdate {
    fn sanitized(self, limits: &ControlLimits) -> Self {
        Self {
            gain: clamp_opt(self.gain, 0.0, limits.max_volume),
            smooth: non_negative(self.smooth),
            color: self.color,
        }
    }
}

/// Producer half of a control channel.
pub struct ControlSender<T: ControlMessage> {
    prod: HeapProd<T>,
    limits: ControlLimits,
}

/// Consumer half of a control channel, owned by the render thread.
pub struct ControlReceiver<T: ControlMessage> {
    cons: HeapCons<T>,
}

pub fn control_channel<T: ControlMessage>(
    capacity: usize,
    limits: ControlLimits,
) -> (ControlSender<T>, ControlReceiver<T>) {
    let rb = HeapRb::<T>::new(capacity.max(1));
    let (prod, cons) = rb.split();
    (ControlSender { prod, limits }, ControlReceiver { cons })
}

impl<T: ControlMessage> ControlSender<T> {
    /// Queue a clamped copy of `msg`. Never blocks; a full queue drops the
    /// update and reports it.
    pub fn send(&mut self, msg: T) -> Result<()> {
        let msg = msg.sanitized(&self.limits);
        self.prod.try_push(msg).map_err(|_| {
            log::warn!("control queue full ({} slots), dropping update", self.prod.capacity());
            EngineError::QueueFull
        })
    }

    pub fn limits(&self) -> &ControlLimits {
        &self.limits
    }

    pub fn free_slots(&self) -> usize {
        self.prod.vacant_len()
    }
}

impl<T: ControlMessage> ControlReceiver<T> {
    /// Hand every pending record to `apply`. Bounded by the queue capacity.
    #[inline]
    pub fn drain<F: FnMut(T)>(&mut self, mut apply: F) -> usize {
        let mut count = 0;
        while let Some(msg) = self.cons.try_pop() {
            apply(msg);
            count += 1;
        }
        count
    }

    pub fn pending(&self) -> usize {
        self.cons.occupied_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ControlLimits {
        ControlLimits::new(48_000.0, 0.8)
    }

    #[test]
    fn gain_is_capped_at_volume_ceiling() {
        let msg = ParamUpdate { gain: Some(1.5), ..ParamUpdate::default() }.sanitized(&limits());
        assert_eq!(msg.gain, Some(0.8));
        let lim = ControlLimits::new(48_000.0, 2.0);
        assert_eq!(lim.max_volume, VOLUME_CEILING);
    }

    #[test]
    fn out_of_range_fields_are_clamped() {
        let msg = ParamUpdate {
            freq1_left: Some(-5.0),
            freq1_right: Some(1.0e6),
            band2_mix: Some(3.0),
            interleave_ms: Some(500.0),
            freq_smooth: Some(-1.0),
            gain_smooth: Some(-2.0),
            ..ParamUpdate::default()
        }
        .sanitized(&limits());
        assert_eq!(msg.freq1_left, Some(MIN_FREQ_HZ));
        assert_eq!(msg.freq1_right, Some(48_000.0 * MAX_FREQ_RATIO));
        assert_eq!(msg.band2_mix, Some(1.0));
        assert!(msg.interleave_ms.unwrap() < MAX_DELAY_MS);
        assert_eq!(msg.freq_smooth, Some(0.0));
        assert_eq!(msg.gain_smooth, Some(0.0));
    }

    #[test]
    fn non_finite_fields_are_dropped() {
        let msg = ParamUpdate {
            freq2_left: Some(f32::NAN),
            gain: Some(f32::INFINITY),
            iso_enabled: Some(true),
            ..ParamUpdate::default()
        }
        .sanitized(&limits());
        assert_eq!(msg.freq2_left, None);
        assert_eq!(msg.gain, None);
        assert_eq!(msg.iso_enabled, Some(true));
    }

    #[test]
    fn noise_gain_is_clamped() {
        let msg = NoiseUpdate { gain: Some(4.0), smooth: Some(-1.0), color: None }.sanitized(&limits());
        assert_eq!(msg.gain, Some(0.8));
        assert_eq!(msg.smooth, Some(0.0));
    }

    #[test]
    fn drain_delivers_in_order_and_empties_queue() {
        let (mut tx, mut rx) = control_channel::<ParamUpdate>(8, limits());
        for g in [0.1, 0.2, 0.3] {
            tx.send(ParamUpdate::gain_ramp(g, 0.0)).unwrap();
        }
        assert_eq!(rx.pending(), 3);
        let mut seen = Vec::new();
        assert_eq!(rx.drain(|m| seen.push(m.gain.unwrap())), 3);
        assert_eq!(seen, vec![0.1, 0.2, 0.3]);
        assert_eq!(rx.pending(), 0);
    }

    #[test]
    fn full_queue_reports_overflow() {
        let (mut tx, mut rx) = control_channel::<NoiseUpdate>(2, limits());
        tx.send(NoiseUpdate::default()).unwrap();
        tx.send(NoiseUpdate::default()).unwrap();
        assert_eq!(tx.free_slots(), 0);
        assert!(matches!(tx.send(NoiseUpdate::default()), Err(EngineError::QueueFull)));
        rx.drain(|_| {});
        assert!(tx.send(NoiseUpdate::default()).is_ok());
    }
}
