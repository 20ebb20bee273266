use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Parameter '{name}' must be positive and finite (got {value})")]
    NotPositive { name: &'static str, value: f64 },

    #[error("Parameter '{name}' must lie within [{min}, {max}] (got {value})")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Fine increment ({fine} mL) must be smaller than the coarse increment ({coarse} mL)")]
    IncrementOrder { fine: f64, coarse: f64 },
}

/// Burette and increment settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TitrantConfig {
    pub capacity_ml: f64,
    pub coarse_increment_ml: f64,
    pub fine_increment_ml: f64,
}

/// Conditions that end a titration automatically.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminationConfig {
    pub stop_ph: f64,
    pub stop_volume_ml: f64,
}

/// Delays before the visible follow-up of a state change.
///
/// The state change itself is always immediate; only the continuation waits.
#[derive(Debug, Clone, PartialEq)]
pub struct SettleConfig {
    pub stage_delay: Duration,
    pub analysis_delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabConfig {
    pub titrant: TitrantConfig,
    pub termination: TerminationConfig,
    pub settle: SettleConfig,
    pub noise_scale: f64,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            titrant: TitrantConfig {
                capacity_ml: 50.0,
                coarse_increment_ml: 0.5,
                fine_increment_ml: 0.1,
            },
            termination: TerminationConfig {
                stop_ph: 11.0,
                stop_volume_ml: 45.0,
            },
            settle: SettleConfig {
                stage_delay: Duration::from_millis(1200),
                analysis_delay: Duration::from_millis(500),
            },
            noise_scale: 1.0,
        }
    }
}

/// Builds a validated [`LabConfig`]. Unset parameters keep their default values.
#[derive(Default)]
pub struct LabConfigBuilder {
    capacity_ml: Option<f64>,
    coarse_increment_ml: Option<f64>,
    fine_increment_ml: Option<f64>,
    stop_ph: Option<f64>,
    stop_volume_ml: Option<f64>,
    stage_delay: Option<Duration>,
    analysis_delay: Option<Duration>,
    noise_scale: Option<f64>,
}

impl LabConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity_ml(mut self, capacity: f64) -> Self {
        self.capacity_ml = Some(capacity);
        self
    }
    pub fn coarse_increment_ml(mut self, volume: f64) -> Self {
        self.coarse_increment_ml = Some(volume);
        self
    }
    pub fn fine_increment_ml(mut self, volume: f64) -> Self {
        self.fine_increment_ml = Some(volume);
        self
    }
    pub fn stop_ph(mut self, ph: f64) -> Self {
        self.stop_ph = Some(ph);
        self
    }
    pub fn stop_volume_ml(mut self, volume: f64) -> Self {
        self.stop_volume_ml = Some(volume);
        self
    }
    pub fn stage_delay(mut self, delay: Duration) -> Self {
        self.stage_delay = Some(delay);
        self
    }
    pub fn analysis_delay(mut self, delay: Duration) -> Self {
        self.analysis_delay = Some(delay);
        self
    }
    pub fn noise_scale(mut self, scale: f64) -> Self {
        self.noise_scale = Some(scale);
        self
    }

    pub fn build(self) -> Result<LabConfig, ConfigError> {
        let defaults = LabConfig::default();

        let titrant = TitrantConfig {
            capacity_ml: positive(
                "capacity_ml",
                self.capacity_ml.unwrap_or(defaults.titrant.capacity_ml),
            )?,
            coarse_increment_ml: positive(
                "coarse_increment_ml",
                self.coarse_increment_ml
                    .unwrap_or(defaults.titrant.coarse_increment_ml),
            )?,
            fine_increment_ml: positive(
                "fine_increment_ml",
                self.fine_increment_ml
                    .unwrap_or(defaults.titrant.fine_increment_ml),
            )?,
        };
        if titrant.fine_increment_ml >= titrant.coarse_increment_ml {
            return Err(ConfigError::IncrementOrder {
                fine: titrant.fine_increment_ml,
                coarse: titrant.coarse_increment_ml,
            });
        }

        let termination = TerminationConfig {
            stop_ph: within(
                "stop_ph",
                self.stop_ph.unwrap_or(defaults.termination.stop_ph),
                0.0,
                14.0,
            )?,
            stop_volume_ml: positive(
                "stop_volume_ml",
                self.stop_volume_ml
                    .unwrap_or(defaults.termination.stop_volume_ml),
            )?,
        };

        Ok(LabConfig {
            titrant,
            termination,
            settle: SettleConfig {
                stage_delay: self.stage_delay.unwrap_or(defaults.settle.stage_delay),
                analysis_delay: self
                    .analysis_delay
                    .unwrap_or(defaults.settle.analysis_delay),
            },
            noise_scale: within(
                "noise_scale",
                self.noise_scale.unwrap_or(defaults.noise_scale),
                0.0,
                1.0,
            )?,
        })
    }
}

fn positive(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

fn within(name: &'static str, value: f64, min: f64, max: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}
