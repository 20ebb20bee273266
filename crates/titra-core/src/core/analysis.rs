use super::models::reading::Reading;
use serde::Serialize;
use std::ops::RangeInclusive;
use tracing::{debug, instrument};

/// Minimum number of readings required before an estimate is attempted.
pub const MIN_READINGS: usize = 5;

pub const PKA1_BAND: RangeInclusive<f64> = 2.2..=3.0;
pub const PKA2_BAND: RangeInclusive<f64> = 9.0..=10.2;

/// Literature values used when no reading falls inside the corresponding band.
pub const PKA1_FALLBACK: f64 = 2.34;
pub const PKA2_FALLBACK: f64 = 9.60;

/// pKa and isoelectric point estimates derived from one titration run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub pka1: f64,
    pub pka2: f64,
    pub isoelectric_point: f64,
    /// Readings averaged for `pka1`; zero means the fallback value was used.
    pub pka1_samples: usize,
    /// Readings averaged for `pka2`; zero means the fallback value was used.
    pub pka2_samples: usize,
}

impl AnalysisResult {
    pub fn used_pka1_fallback(&self) -> bool {
        self.pka1_samples == 0
    }

    pub fn used_pka2_fallback(&self) -> bool {
        self.pka2_samples == 0
    }
}

fn band_mean(readings: &[Reading], band: &RangeInclusive<f64>) -> Option<(f64, usize)> {
    let (sum, count) = readings
        .iter()
        .filter(|r| band.contains(&r.ph))
        .fold((0.0, 0usize), |(sum, count), r| (sum + r.ph, count + 1));
    (count > 0).then(|| (sum / count as f64, count))
}

/// Estimates pKa1, pKa2 and the isoelectric point by averaging the pH of readings that fall
/// inside fixed buffering bands.
///
/// This is a deliberately simple banded average, not an inflection-point search. Returns
/// `None` when fewer than [`MIN_READINGS`] readings are available.
#[instrument(level = "debug", skip_all, fields(readings = readings.len()))]
pub fn analyze(readings: &[Reading]) -> Option<AnalysisResult> {
    if readings.len() < MIN_READINGS {
        debug!("Not enough readings for analysis.");
        return None;
    }

    let (pka1, pka1_samples) = band_mean(readings, &PKA1_BAND).unwrap_or((PKA1_FALLBACK, 0));
    let (pka2, pka2_samples) = band_mean(readings, &PKA2_BAND).unwrap_or((PKA2_FALLBACK, 0));
    let isoelectric_point = (pka1 + pka2) / 2.0;

    debug!(
        pka1,
        pka2, isoelectric_point, pka1_samples, pka2_samples, "Analysis complete."
    );
    Some(AnalysisResult {
        pka1,
        pka2,
        isoelectric_point,
        pka1_samples,
        pka2_samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(phs: &[f64]) -> Vec<Reading> {
        phs.iter()
            .enumerate()
            .map(|(i, &ph)| Reading::new(i as f64 * 0.5, ph))
            .collect()
    }

    #[test]
    fn returns_none_with_fewer_than_five_readings() {
        assert!(analyze(&[]).is_none());
        assert!(analyze(&readings(&[2.4, 2.5, 2.6, 2.7])).is_none());
    }

    #[test]
    fn averages_readings_inside_each_band() {
        let result = analyze(&readings(&[2.4, 2.6, 5.0, 9.2, 9.8, 11.2])).unwrap();
        assert!((result.pka1 - 2.5).abs() < 1e-9);
        assert!((result.pka2 - 9.5).abs() < 1e-9);
        assert!((result.isoelectric_point - 6.0).abs() < 1e-9);
        assert_eq!(result.pka1_samples, 2);
        assert_eq!(result.pka2_samples, 2);
    }

    #[test]
    fn band_edges_are_inclusive() {
        let result = analyze(&readings(&[2.2, 3.0, 9.0, 10.2, 7.0])).unwrap();
        assert!((result.pka1 - 2.6).abs() < 1e-9);
        assert!((result.pka2 - 9.6).abs() < 1e-9);
    }

    #[test]
    fn uses_exact_fallbacks_when_bands_are_empty() {
        let result = analyze(&readings(&[4.0, 5.0, 6.0, 7.0, 8.0])).unwrap();
        assert_eq!(result.pka1, 2.34);
        assert_eq!(result.pka2, 9.60);
        assert!((result.isoelectric_point - 5.97).abs() < 1e-9);
        assert!(result.used_pka1_fallback());
        assert!(result.used_pka2_fallback());
    }

    #[test]
    fn falls_back_independently_per_band() {
        let result = analyze(&readings(&[2.5, 2.7, 4.0, 6.0, 8.0])).unwrap();
        assert!((result.pka1 - 2.6).abs() < 1e-9);
        assert_eq!(result.pka2, 9.60);
        assert!(!result.used_pka1_fallback());
        assert!(result.used_pka2_fallback());
    }
}
