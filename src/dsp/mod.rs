pub mod delay;
pub mod smoothing;
pub mod wavetable;

pub use delay::{InterleaveDelay, MAX_DELAY_MS};
pub use smoothing::{slow_coeff, smoothing_coeff, GainRamp, Smoothed};
pub use wavetable::SineTable;

/// Raised-cosine pulse: 0 at phase 0, 1 at phase π.
#[inline]
pub fn isochronic_envelope(table: &SineTable, phase: f64) -> f32 {
    0.5 * (1.0 - table.cos(phase))
}

/// Scale a band sum so its peak never exceeds a single band's peak.
/// `weight_total` is the summed mix weight of the active secondary bands.
#[inline]
pub fn clip_guard(left: f32, right: f32, weight_total: f32) -> (f32, f32) {
    if weight_total > 0.0 {
        let norm = 1.0 / (1.0 + weight_total);
        (left * norm, right * norm)
    } else {
        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn envelope_is_zero_at_start_and_peaks_at_pi() {
        let table = SineTable::new(2048).unwrap();
        assert!(isochronic_envelope(&table, 0.0).abs() < 1e-6);
        assert!((isochronic_envelope(&table, PI) - 1.0).abs() < 1e-6);
        assert!((isochronic_envelope(&table, PI / 2.0) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn clip_guard_keeps_in_phase_peak_at_unity() {
        for step in 0..=100 {
            let mix = step as f32 / 100.0;
            let (l, r) = clip_guard(1.0 + mix, 1.0 + mix, mix);
            assert!(l <= 1.0 + 1e-6 && r <= 1.0 + 1e-6, "mix {mix}");
            let (l, _) = clip_guard(-1.0 - mix, 0.0, mix);
            assert!(l >= -1.0 - 1e-6);
        }
    }

    #[test]
    fn clip_guard_is_identity_without_secondary_weight() {
        assert_eq!(clip_guard(0.4, -0.3, 0.0), (0.4, -0.3));
    }
}
