use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

const INITIAL_PH: f64 = 2.35;
const INITIAL_NOISE: f64 = 0.2;
const SATURATION_START_ML: f64 = 35.0;
const SATURATION_BASE_PH: f64 = 11.45;
const SATURATION_SLOPE: f64 = 0.03;
const SATURATION_CAP_PH: f64 = 12.0;

/// One linear piece of the glycine curve: `base + slope * (v - start)` plus `U(0, noise)`.
#[derive(Debug, Clone, Copy)]
struct Segment {
    start: f64,
    base: f64,
    slope: f64,
    noise: f64,
}

const fn segment(start: f64, base: f64, slope: f64, noise: f64) -> Segment {
    Segment {
        start,
        base,
        slope,
        noise,
    }
}

// Ordered by `start`; each piece runs until the next one begins.
const SEGMENTS: [Segment; 7] = [
    segment(0.0, 2.35, 0.15, 0.05),  // first buffering plateau (COOH)
    segment(5.0, 3.1, 0.6, 0.08),    // steep rise to the first equivalence point
    segment(10.0, 6.1, 0.12, 0.05),  // zwitterion region
    segment(15.0, 6.7, 0.10, 0.04),  // zwitterion region, flatter
    segment(20.0, 7.2, 0.30, 0.06),  // approach to the second buffer
    segment(25.0, 8.7, 0.40, 0.08),  // second buffering plateau (NH3+)
    segment(30.0, 10.7, 0.15, 0.05), // past the second equivalence point
];

fn segment_for(volume: f64) -> Option<&'static Segment> {
    SEGMENTS.iter().rev().find(|s| volume >= s.start)
}

/// Noise-free pH of the glycine curve at a cumulative NaOH volume (mL).
///
/// Volumes at or below zero are treated as the untitrated sample.
pub fn baseline_ph(volume: f64) -> f64 {
    if volume <= 0.0 {
        return INITIAL_PH;
    }
    if volume >= SATURATION_START_ML {
        return (SATURATION_BASE_PH + SATURATION_SLOPE * (volume - SATURATION_START_ML))
            .min(SATURATION_CAP_PH);
    }
    match segment_for(volume) {
        Some(s) => s.base + s.slope * (volume - s.start),
        None => INITIAL_PH,
    }
}

/// Upper bound of the uniform measurement noise added at `volume`.
pub fn noise_amplitude(volume: f64) -> f64 {
    if volume <= 0.0 {
        return INITIAL_NOISE;
    }
    if volume >= SATURATION_START_ML {
        return 0.0;
    }
    segment_for(volume).map_or(0.0, |s| s.noise)
}

pub(crate) fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A source of simulated pH meter readings.
pub trait TitrationCurve: Send {
    fn ph_at(&mut self, volume: f64) -> f64;
}

/// The piecewise glycine/NaOH titration curve with uniform measurement noise.
///
/// Every call draws fresh noise from the owned random source, so two readings at the same
/// volume generally differ. Seed the source for reproducible runs.
#[derive(Debug, Clone)]
pub struct GlycineCurve<R = StdRng> {
    rng: R,
    noise_scale: f64,
}

impl GlycineCurve<StdRng> {
    /// Creates a curve whose noise is reproducible for a given `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Creates a curve seeded from operating-system entropy.
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl<R: Rng> GlycineCurve<R> {
    /// Wraps an existing random source. Noise starts at full scale.
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            noise_scale: 1.0,
        }
    }

    /// Scales every noise amplitude; `0.0` yields the bare baseline curve.
    pub fn with_noise_scale(mut self, noise_scale: f64) -> Self {
        self.noise_scale = noise_scale.max(0.0);
        self
    }

    /// Current noise multiplier in `[0.0, ..)`.
    pub fn noise_scale(&self) -> f64 {
        self.noise_scale
    }

    fn draw_noise(&mut self, amplitude: f64) -> f64 {
        if amplitude <= 0.0 {
            return 0.0;
        }
        self.rng.gen_range(0.0..amplitude)
    }
}

impl<R: Rng + Send> TitrationCurve for GlycineCurve<R> {
    fn ph_at(&mut self, volume: f64) -> f64 {
        let amplitude = noise_amplitude(volume) * self.noise_scale;
        let noise = self.draw_noise(amplitude);
        let ph = round_to_hundredths(baseline_ph(volume) + noise);
        trace!(volume, ph, "Evaluated glycine curve.");
        ph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BREAKPOINTS: [f64; 9] = [0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 45.0];

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn baseline_reproduces_breakpoint_values() {
        assert_close(baseline_ph(0.0), 2.35);
        assert_close(baseline_ph(2.0), 2.65);
        assert_close(baseline_ph(5.0), 3.1);
        assert_close(baseline_ph(7.5), 4.6);
        assert_close(baseline_ph(10.0), 6.1);
        assert_close(baseline_ph(15.0), 6.7);
        assert_close(baseline_ph(20.0), 7.2);
        assert_close(baseline_ph(25.0), 8.7);
        assert_close(baseline_ph(30.0), 10.7);
        assert_close(baseline_ph(35.0), 11.45);
        assert_close(baseline_ph(40.0), 11.6);
    }

    #[test]
    fn baseline_saturates_at_twelve() {
        assert_close(baseline_ph(60.0), 12.0);
        assert_close(baseline_ph(500.0), 12.0);
    }

    #[test]
    fn baseline_is_non_decreasing_across_breakpoints() {
        let mut previous = baseline_ph(0.0);
        let mut v = 0.0;
        while v <= 60.0 {
            let current = baseline_ph(v);
            assert!(current + 1e-9 >= previous, "curve drops at {v} mL");
            previous = current;
            v += 0.05;
        }
        for pair in BREAKPOINTS.windows(2) {
            assert!(baseline_ph(pair[1]) >= baseline_ph(pair[0]));
        }
    }

    #[test]
    fn noise_amplitude_follows_segment_table() {
        assert_close(noise_amplitude(0.0), 0.2);
        assert_close(noise_amplitude(4.9), 0.05);
        assert_close(noise_amplitude(5.0), 0.08);
        assert_close(noise_amplitude(17.0), 0.04);
        assert_close(noise_amplitude(35.0), 0.0);
    }

    #[test]
    fn noisy_readings_stay_within_documented_bounds() {
        let mut curve = GlycineCurve::seeded(7);
        let mut v = 0.0;
        while v <= 60.0 {
            for _ in 0..20 {
                let ph = curve.ph_at(v);
                assert!((2.35..=12.0).contains(&ph), "pH {ph} out of range at {v}");
                let lower = round_to_hundredths(baseline_ph(v));
                let upper = round_to_hundredths(baseline_ph(v) + noise_amplitude(v));
                assert!(ph >= lower && ph <= upper, "pH {ph} outside [{lower}, {upper}] at {v}");
            }
            v += 0.1;
        }
    }

    #[test]
    fn initial_reading_is_between_2_35_and_2_55() {
        let mut curve = GlycineCurve::seeded(42);
        for _ in 0..200 {
            let ph = curve.ph_at(0.0);
            assert!((2.35..=2.55).contains(&ph));
        }
    }

    #[test]
    fn readings_are_rounded_to_two_decimals() {
        let mut curve = GlycineCurve::seeded(3);
        for i in 0..100 {
            let ph = curve.ph_at(f64::from(i) * 0.37);
            assert_close(ph, round_to_hundredths(ph));
        }
    }

    #[test]
    fn same_seed_reproduces_the_same_sequence() {
        let mut a = GlycineCurve::seeded(11);
        let mut b = GlycineCurve::seeded(11);
        for i in 0..50 {
            let v = f64::from(i) * 0.5;
            assert_eq!(a.ph_at(v), b.ph_at(v));
        }
    }

    #[test]
    fn zero_noise_scale_returns_rounded_baseline() {
        let mut curve = GlycineCurve::seeded(1).with_noise_scale(0.0);
        assert_close(curve.ph_at(0.0), 2.35);
        assert_close(curve.ph_at(7.5), 4.6);
        assert_close(curve.ph_at(27.5), 9.7);
    }

    #[test]
    fn negative_noise_scale_is_clamped_to_zero() {
        let curve = GlycineCurve::seeded(1).with_noise_scale(-2.0);
        assert_eq!(curve.noise_scale(), 0.0);
    }
}
