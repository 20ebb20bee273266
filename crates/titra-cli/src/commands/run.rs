use super::open_session;
use crate::cli::RunArgs;
use crate::config::PartialLabConfig;
use crate::error::Result;
use crate::ui::{CliEventHandler, UiEvent};
use titrasim::core::io::csv;
use titrasim::engine::events::EventReporter;
use titrasim::workflows::experiment;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn run(args: RunArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    let partial_config = PartialLabConfig::load(args.lab.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args.lab)?;

    let event_handler = CliEventHandler::new(ui_sender.clone());
    let reporter = EventReporter::with_callback(event_handler.get_callback());
    let mut session = open_session(config, args.lab.seed, reporter);

    info!("Invoking the experiment workflow...");
    let result = tokio::task::block_in_place(|| {
        experiment::run(&mut session, args.strategy.into(), std::thread::sleep)
    })?;

    info!(
        "Workflow finished with {} reading(s).",
        result.readings.len()
    );

    if result.analysis.is_none() {
        warn!("Titration ended without enough readings for an analysis.");
    }

    if let Some(path) = &args.output {
        csv::write_readings_to_path(&result.readings, path)?;
        notify(
            &ui_sender,
            format!("✓ Readings written to: {}", path.display()),
        )
        .await;
    }

    if let Some(path) = &args.summary {
        match &result.analysis {
            Some(analysis) => {
                csv::write_summary_to_path(analysis, path)?;
                notify(
                    &ui_sender,
                    format!("✓ Analysis written to: {}", path.display()),
                )
                .await;
            }
            None => warn!(
                "No analysis available; skipping summary export to {:?}.",
                path
            ),
        }
    }

    Ok(())
}

pub(crate) async fn notify(ui_sender: &mpsc::Sender<UiEvent>, message: String) {
    if let Err(e) = ui_sender.send(UiEvent::Message(message)).await {
        warn!("UI channel closed; printing directly.");
        if let UiEvent::Message(message) = e.0 {
            println!("{}", message);
        }
    }
}
