use serde::Serialize;

/// A single pH meter reading taken after a cumulative volume of titrant was added.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    /// Cumulative NaOH volume in mL.
    #[serde(rename = "volume_ml")]
    pub volume: f64,
    /// Measured pH, rounded to two decimals.
    pub ph: f64,
}

impl Reading {
    /// Creates a reading from a cumulative volume and its pH.
    pub fn new(volume: f64, ph: f64) -> Self {
        Self { volume, ph }
    }

    /// Slope of the curve between `previous` and `self`, in pH units per mL.
    ///
    /// Returns `None` when the two readings share a volume.
    pub fn slope_from(&self, previous: &Reading) -> Option<f64> {
        let dv = self.volume - previous.volume;
        if dv.abs() < f64::EPSILON {
            return None;
        }
        Some((self.ph - previous.ph) / dv)
    }
}
