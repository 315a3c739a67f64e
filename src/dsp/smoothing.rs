//! Per-sample parameter smoothing.
//!
//! Frequencies glide with a fast one-pole whose coefficient is derived from a
//! caller-supplied smoothing time, mix and delay glide with a fixed slow
//! one-pole, and gain follows a linear ramp.

/// Shortest smoothing time accepted when deriving a coefficient, in seconds.
pub const MIN_SMOOTH_SECONDS: f32 = 0.001;

/// Time constant of the slow glide used for mix weight and delay length.
pub const SLOW_TIME_CONSTANT: f32 = 0.1;

/// Coefficient that brings a one-pole to ~99% of its target after `seconds`.
pub fn smoothing_coeff(sample_rate: f32, seconds: f32) -> f32 {
    let seconds = seconds.max(MIN_SMOOTH_SECONDS);
    1.0 - (-5.0 / (sample_rate * seconds)).exp()
}

/// Coefficient of a one-pole with time constant [`SLOW_TIME_CONSTANT`].
pub fn slow_coeff(sample_rate: f32) -> f32 {
    1.0 - (-1.0 / (sample_rate * SLOW_TIME_CONSTANT)).exp()
}

/// Exponentially smoothed scalar.
///
/// State is kept in f64 so that a slow glide towards a large target (a delay
/// length of thousands of samples) keeps moving until it is inside `snap`.
#[derive(Debug, Clone, Copy)]
pub struct Smoothed {
    value: f64,
    target: f64,
    snap: f64,
}

impl Smoothed {
    /// `snap` is the distance below which the value lands exactly on target.
    pub fn new(value: f32, snap: f32) -> Self {
        Self {
            value: value as f64,
            target: value as f64,
            snap: snap as f64,
        }
    }

    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target as f64;
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target as f32
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value as f32
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        self.value == self.target
    }

    #[inline]
    pub fn next(&mut self, coeff: f32) -> f32 {
        let diff = self.target - self.value;
        let next = self.value + diff * coeff as f64;
        // A step too small to change the value counts as arrival.
        self.value = if diff.abs() <= self.snap || next == self.value {
            self.target
        } else {
            next
        };
        self.value as f32
    }
}

/// Linear gain ramp. Every new target restarts the ramp from the current
/// value, so gain stays continuous however often it is retargeted.
#[derive(Debug, Clone, Copy)]
pub struct GainRamp {
    start: f32,
    end: f32,
    progress: u64,
    duration: f64,
    value: f32,
}

impl GainRamp {
    pub fn new(value: f32) -> Self {
        let value = value.clamp(0.0, 1.0);
        Self {
            start: value,
            end: value,
            progress: 0,
            duration: 0.0,
            value,
        }
    }

    /// Start a ramp towards `target` lasting `duration_samples`.
    pub fn retarget(&mut self, target: f32, duration_samples: f64) {
        self.start = self.value;
        self.end = target.clamp(0.0, 1.0);
        self.progress = 0;
        self.duration = if duration_samples.is_nan() {
            0.0
        } else {
            duration_samples.max(0.0)
        };
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.end
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.progress as f64 >= self.duration
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        if !self.is_complete() {
            self.progress += 1;
        }
        // Sub-sample durations land on the target on the first sample.
        self.value = if self.is_complete() {
            self.end
        } else {
            let t = self.progress as f64 / self.duration;
            self.start + (self.end - self.start) * t as f32
        };
        self.value = self.value.clamp(0.0, 1.0);
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoother_within_one_percent_after_five_times_smoothing() {
        let sr = 48_000.0;
        for &seconds in &[0.01f32, 0.05, 0.2] {
            let coeff = smoothing_coeff(sr, seconds);
            let mut s = Smoothed::new(100.0, 0.0);
            s.set_target(400.0);
            let n = (5.0 * seconds * sr) as usize;
            for _ in 0..n {
                s.next(coeff);
            }
            assert!((s.value() - 400.0).abs() <= 4.0, "seconds {seconds}");
        }
    }

    #[test]
    fn smoother_reaches_ninety_nine_percent_near_smoothing_time() {
        let sr = 44_100.0;
        let coeff = smoothing_coeff(sr, 0.1);
        let mut s = Smoothed::new(0.0, 0.0);
        s.set_target(1.0);
        for _ in 0..(0.1 * sr) as usize {
            s.next(coeff);
        }
        assert!((0.98..=0.995).contains(&s.value()), "{}", s.value());
    }

    #[test]
    fn smoother_never_overshoots() {
        let coeff = smoothing_coeff(48_000.0, 0.001);
        let mut s = Smoothed::new(0.0, 1e-6);
        s.set_target(10.0);
        for _ in 0..10_000 {
            assert!(s.next(coeff) <= 10.0);
        }
    }

    #[test]
    fn smoother_snaps_onto_target() {
        let coeff = slow_coeff(8_000.0);
        let mut s = Smoothed::new(0.0, 1e-3);
        s.set_target(40.0);
        for _ in 0..16_000 {
            s.next(coeff);
        }
        assert!(s.is_settled());
        assert_eq!(s.value(), 40.0);
    }

    #[test]
    fn slow_glide_to_long_delay_settles_exactly() {
        for &sr in &[44_100.0f32, 48_000.0] {
            let target = sr * 0.1;
            let coeff = slow_coeff(sr);
            let mut s = Smoothed::new(0.0, 1e-3);
            s.set_target(target);
            for _ in 0..(3.0 * sr) as usize {
                s.next(coeff);
            }
            assert!(s.is_settled(), "sr {sr}: {}", s.value());
            assert_eq!(s.value(), target);
        }
    }

    #[test]
    fn small_mix_glide_settles_exactly() {
        let coeff = slow_coeff(8_000.0);
        let mut s = Smoothed::new(0.0, 1e-6);
        s.set_target(0.4);
        for _ in 0..24_000 {
            s.next(coeff);
        }
        assert_eq!(s.value(), 0.4);
    }

    #[test]
    fn tiny_smoothing_time_is_floored() {
        let sr = 48_000.0;
        assert_eq!(smoothing_coeff(sr, 0.0), smoothing_coeff(sr, MIN_SMOOTH_SECONDS));
    }

    #[test]
    fn gain_ramp_is_linear_and_exact_at_end() {
        let mut ramp = GainRamp::new(0.1);
        ramp.retarget(0.7, 100.0);
        let mut prev = ramp.value();
        let step = (0.7 - 0.1) / 100.0;
        for k in 1..=100 {
            let v = ramp.next();
            assert!((v - prev - step).abs() < 1e-5, "k {k}");
            prev = v;
        }
        assert_eq!(ramp.value(), 0.7);
        assert!(ramp.is_complete());
        assert_eq!(ramp.next(), 0.7);
    }

    #[test]
    fn gain_ramp_restarts_from_current_value() {
        let mut ramp = GainRamp::new(0.0);
        ramp.retarget(1.0, 10.0);
        for _ in 0..5 {
            ramp.next();
        }
        let mid = ramp.value();
        assert!((mid - 0.5).abs() < 1e-6);
        ramp.retarget(0.0, 10.0);
        let first = ramp.next();
        assert!((first - (mid - mid / 10.0)).abs() < 1e-6);
    }

    #[test]
    fn zero_duration_snaps_immediately() {
        let mut ramp = GainRamp::new(0.2);
        ramp.retarget(0.6, 0.0);
        assert_eq!(ramp.next(), 0.6);
        ramp.retarget(0.3, 0.4);
        assert_eq!(ramp.next(), 0.3);
    }

    #[test]
    fn gain_ramp_clamps_target() {
        let mut ramp = GainRamp::new(0.0);
        ramp.retarget(3.0, 0.0);
        assert_eq!(ramp.next(), 1.0);
        ramp.retarget(-1.0, 0.0);
        assert_eq!(ramp.next(), 0.0);
    }

    #[test]
    fn long_ramp_still_completes() {
        let mut ramp = GainRamp::new(0.0);
        let duration = 400.0 * 48_000.0;
        ramp.retarget(0.8, duration);
        for _ in 0..duration as u64 - 1 {
            ramp.next();
        }
        assert!(!ramp.is_complete());
        assert!(ramp.value() > 0.79 && ramp.value() <= 0.8);
        assert_eq!(ramp.next(), 0.8);
        assert!(ramp.is_complete());
    }
}
