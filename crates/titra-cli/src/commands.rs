pub mod curve;
pub mod interactive;
pub mod run;

use titrasim::engine::config::LabConfig;
use titrasim::engine::events::EventReporter;
use titrasim::workflows::lab::LabSession;
use tracing::info;

fn open_session<'a>(
    config: LabConfig,
    seed: Option<u64>,
    reporter: EventReporter<'a>,
) -> LabSession<'a> {
    match seed {
        Some(seed) => {
            info!("Using pH meter noise seed {}.", seed);
            LabSession::seeded(config, seed, reporter)
        }
        None => LabSession::from_entropy(config, reporter),
    }
}
