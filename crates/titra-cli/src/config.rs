use crate::cli::LabArgs;
use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use titrasim::engine::config::{LabConfig, LabConfigBuilder};
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialTitrantConfig {
    #[serde(rename = "capacity-ml")]
    capacity_ml: Option<f64>,
    #[serde(rename = "coarse-increment-ml")]
    coarse_increment_ml: Option<f64>,
    #[serde(rename = "fine-increment-ml")]
    fine_increment_ml: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialTerminationConfig {
    #[serde(rename = "stop-ph")]
    stop_ph: Option<f64>,
    #[serde(rename = "stop-volume-ml")]
    stop_volume_ml: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialSettleConfig {
    #[serde(rename = "stage-delay-ms")]
    stage_delay_ms: Option<u64>,
    #[serde(rename = "analysis-delay-ms")]
    analysis_delay_ms: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialLabConfig {
    titrant: Option<PartialTitrantConfig>,
    termination: Option<PartialTerminationConfig>,
    settle: Option<PartialSettleConfig>,
    #[serde(rename = "noise-scale")]
    noise_scale: Option<f64>,
}

impl PartialLabConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reads the file named by `--config`, or starts from an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Layers CLI flags and then `--set` values over the file contents. Anything still
    /// unset keeps the [`LabConfig::default`] value.
    pub fn merge_with_cli(mut self, args: &LabArgs) -> Result<LabConfig> {
        self.apply_flags(args);
        self.apply_set_values(&args.set_values)?;

        let titrant = self.titrant.take().unwrap_or_default();
        let termination = self.termination.take().unwrap_or_default();
        let settle = self.settle.take().unwrap_or_default();

        let mut builder = LabConfigBuilder::new();
        if let Some(capacity) = titrant.capacity_ml {
            builder = builder.capacity_ml(capacity);
        }
        if let Some(volume) = titrant.coarse_increment_ml {
            builder = builder.coarse_increment_ml(volume);
        }
        if let Some(volume) = titrant.fine_increment_ml {
            builder = builder.fine_increment_ml(volume);
        }
        if let Some(ph) = termination.stop_ph {
            builder = builder.stop_ph(ph);
        }
        if let Some(volume) = termination.stop_volume_ml {
            builder = builder.stop_volume_ml(volume);
        }
        if let Some(ms) = settle.stage_delay_ms {
            builder = builder.stage_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = settle.analysis_delay_ms {
            builder = builder.analysis_delay(Duration::from_millis(ms));
        }
        if let Some(scale) = self.noise_scale {
            builder = builder.noise_scale(scale);
        }

        builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    fn apply_flags(&mut self, args: &LabArgs) {
        if let Some(stop_ph) = args.stop_ph {
            self.termination
                .get_or_insert_with(Default::default)
                .stop_ph = Some(stop_ph);
        }
        if let Some(stop_volume) = args.stop_volume {
            self.termination
                .get_or_insert_with(Default::default)
                .stop_volume_ml = Some(stop_volume);
        }
        if args.no_noise {
            self.noise_scale = Some(0.0);
        }
        if args.no_delay {
            let settle = self.settle.get_or_insert_with(Default::default);
            settle.stage_delay_ms = Some(0);
            settle.analysis_delay_ms = Some(0);
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "titrant.capacity-ml" => {
                    self.titrant
                        .get_or_insert_with(Default::default)
                        .capacity_ml = Some(parse_value(key, value_str)?);
                }
                "titrant.coarse-increment-ml" => {
                    self.titrant
                        .get_or_insert_with(Default::default)
                        .coarse_increment_ml = Some(parse_value(key, value_str)?);
                }
                "titrant.fine-increment-ml" => {
                    self.titrant
                        .get_or_insert_with(Default::default)
                        .fine_increment_ml = Some(parse_value(key, value_str)?);
                }
                "termination.stop-ph" => {
                    self.termination
                        .get_or_insert_with(Default::default)
                        .stop_ph = Some(parse_value(key, value_str)?);
                }
                "termination.stop-volume-ml" => {
                    self.termination
                        .get_or_insert_with(Default::default)
                        .stop_volume_ml = Some(parse_value(key, value_str)?);
                }
                "settle.stage-delay-ms" => {
                    self.settle
                        .get_or_insert_with(Default::default)
                        .stage_delay_ms = Some(parse_value(key, value_str)?);
                }
                "settle.analysis-delay-ms" => {
                    self.settle
                        .get_or_insert_with(Default::default)
                        .analysis_delay_ms = Some(parse_value(key, value_str)?);
                }
                "noise-scale" => {
                    self.noise_scale = Some(parse_value(key, value_str)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value_str: &str) -> Result<T> {
    value_str.trim().parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid {} value for {}: {}",
            std::any::type_name::<T>(),
            key,
            value_str
        ))
    })
}
