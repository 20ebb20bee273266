use crate::cli::CurveArgs;
use crate::error::{CliError, Result};
use titrasim::core::curve::{GlycineCurve, TitrationCurve, baseline_ph};
use tracing::info;

// Keeps tabulated volumes on the same 1e-4 mL grid the titration engine uses.
const VOLUME_STEPS_PER_ML: f64 = 10_000.0;
const MAX_ROWS: usize = 100_000;

pub async fn run(args: CurveArgs) -> Result<()> {
    let volumes = sample_volumes(args.step, args.max_volume)?;
    let curve = match args.seed {
        Some(seed) => GlycineCurve::seeded(seed),
        None => GlycineCurve::from_entropy(),
    };
    let mut curve = curve.with_noise_scale(if args.no_noise { 0.0 } else { 1.0 });

    info!(
        "Tabulating {} point(s) from 0 to {} mL.",
        volumes.len(),
        args.max_volume
    );

    println!("{:>11}  {:>8}  {:>6}", "volume_ml", "baseline", "ph");
    for volume in volumes {
        println!(
            "{:>11.2}  {:>8.2}  {:>6.2}",
            volume,
            baseline_ph(volume),
            curve.ph_at(volume)
        );
    }
    Ok(())
}

fn sample_volumes(step: f64, max_volume: f64) -> Result<Vec<f64>> {
    if !step.is_finite() || step <= 0.0 {
        return Err(CliError::Argument(format!(
            "--step must be a positive number (got {})",
            step
        )));
    }
    if !max_volume.is_finite() || max_volume < 0.0 {
        return Err(CliError::Argument(format!(
            "--max-volume must be zero or positive (got {})",
            max_volume
        )));
    }

    let count = (max_volume / step + 1e-9).floor();
    if count >= MAX_ROWS as f64 {
        return Err(CliError::Argument(format!(
            "--step {} over {} mL would print more than {} rows",
            step, max_volume, MAX_ROWS
        )));
    }
    let count = count as usize;
    Ok((0..=count)
        .map(|i| (i as f64 * step * VOLUME_STEPS_PER_ML).round() / VOLUME_STEPS_PER_ML)
        .collect())
}
