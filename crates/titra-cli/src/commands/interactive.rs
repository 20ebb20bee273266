use super::open_session;
use super::run::notify;
use crate::cli::InteractiveArgs;
use crate::config::PartialLabConfig;
use crate::error::Result;
use crate::ui::{CliEventHandler, UiEvent, format_row};
use crate::utils::parser::{self, BenchCommand, HELP_TEXT};
use std::path::Path;
use titrasim::core::io::csv;
use titrasim::engine::events::EventReporter;
use titrasim::engine::titration::IncrementSize;
use titrasim::workflows::lab::{LabSession, StopOutcome};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

pub async fn run(args: InteractiveArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    let partial_config = PartialLabConfig::load(args.lab.config.as_deref())?;
    let config = partial_config.merge_with_cli(&args.lab)?;

    let event_handler = CliEventHandler::new(ui_sender.clone());
    let reporter = EventReporter::with_callback(event_handler.get_callback());
    let mut session = open_session(config, args.lab.seed, reporter);

    notify(
        &ui_sender,
        "Glycine titration bench. Type 'start' to begin or 'help' for commands.".to_string(),
    )
    .await;

    let mut exported = false;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parser::parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                notify(&ui_sender, format!("  {}", e)).await;
                continue;
            }
        };
        debug!(?command, "Bench command received.");

        match command {
            BenchCommand::Start => {
                if !session.start() {
                    notify(&ui_sender, "  The experiment is already running.".into()).await;
                }
            }
            BenchCommand::Place(item) => {
                session.placement_attempt(item);
            }
            BenchCommand::Add(size) => {
                if session.increment_pressed(size)?.is_none() {
                    notify(&ui_sender, explain_ignored_increment(&session, size).into()).await;
                }
            }
            BenchCommand::Stop => {
                if session.stop_pressed() == StopOutcome::Stopped {
                    info!("Titration stopped by the user.");
                }
            }
            BenchCommand::Reset => session.reset_requested(),
            BenchCommand::Status => {
                for line in status_lines(&session) {
                    notify(&ui_sender, line).await;
                }
            }
            BenchCommand::Help => notify(&ui_sender, HELP_TEXT.to_string()).await,
            BenchCommand::Quit => break,
        }

        if let Some(pending) = session.pending() {
            tokio::time::sleep(pending.delay).await;
            session.settle();
        }

        let completed = session
            .titration()
            .is_some_and(|t| t.completion().is_some());
        if !completed {
            exported = false;
        } else if !exported {
            if let Some(path) = args.output.as_deref() {
                export_readings(&session, path, &ui_sender).await?;
            }
            exported = true;
        }
    }

    info!("Leaving the bench.");
    Ok(())
}

async fn export_readings(
    session: &LabSession<'_>,
    path: &Path,
    ui_sender: &mpsc::Sender<UiEvent>,
) -> Result<()> {
    let readings = session.titration().map(|t| t.readings()).unwrap_or_default();
    csv::write_readings_to_path(readings, path)?;
    notify(
        ui_sender,
        format!("✓ Readings written to: {}", path.display()),
    )
    .await;
    Ok(())
}

fn explain_ignored_increment(session: &LabSession<'_>, size: IncrementSize) -> &'static str {
    if !session.is_titrating() {
        "  There is nothing to titrate right now."
    } else if size == IncrementSize::Fine {
        "  The fine increment unlocks once the pH starts rising steeply."
    } else {
        "  The increment was not applied."
    }
}

fn status_lines(session: &LabSession<'_>) -> Vec<String> {
    let stage = session.stage();
    let mut lines = vec![format!("  {}: {}", stage, stage.instruction())];

    let placed: Vec<&str> = session
        .setup_state()
        .placed_items()
        .map(|item| item.label())
        .collect();
    if !placed.is_empty() {
        lines.push(format!("  On the bench: {}", placed.join(", ")));
    }

    if let Some(titration) = session.titration() {
        lines.push(format!(
            "  {} reading(s), {:.1} mL added, {:.1} mL left in the burette",
            titration.readings().len(),
            titration.cumulative_volume(),
            titration.remaining_titrant()
        ));
        if let Some(last) = titration.readings().last() {
            lines.push(format!("  Last reading:{}", format_row(last)));
        }
        if session.fine_increment_unlocked() {
            lines.push("  Fine increment available.".to_string());
        }
    }

    if let Some(analysis) = session.analysis() {
        lines.push(format!(
            "  pKa1 {:.2}, pKa2 {:.2}, pI {:.2}",
            analysis.pka1, analysis.pka2, analysis.isoelectric_point
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use titrasim::core::models::apparatus::SETUP_SEQUENCE;
    use titrasim::engine::config::LabConfig;

    fn session() -> LabSession<'static> {
        LabSession::seeded(LabConfig::default(), 3, EventReporter::new())
    }

    #[test]
    fn status_of_idle_session_shows_only_the_stage() {
        let lab = session();
        let lines = status_lines(&lab);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("  Step 0"));
    }

    #[test]
    fn status_lists_placed_items_and_readings() {
        let mut lab = session();
        lab.start();
        for item in SETUP_SEQUENCE {
            lab.placement_attempt(item);
        }
        lab.settle();
        lab.increment_pressed(IncrementSize::Coarse).unwrap();

        let lines = status_lines(&lab);
        assert!(lines[0].starts_with("  Step 8"));
        assert!(lines[1].contains("Burette stand") && lines[1].contains("0.1 M NaOH"));
        assert!(lines[2].contains("2 reading(s), 0.5 mL added, 49.5 mL left"));
    }

    #[test]
    fn ignored_increment_explanations() {
        let mut lab = session();
        assert_eq!(
            explain_ignored_increment(&lab, IncrementSize::Coarse),
            "  There is nothing to titrate right now."
        );

        lab.start();
        for item in SETUP_SEQUENCE {
            lab.placement_attempt(item);
        }
        lab.settle();
        assert!(
            explain_ignored_increment(&lab, IncrementSize::Fine).contains("fine increment unlocks")
        );
    }

    #[tokio::test]
    async fn export_writes_completed_readings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.csv");
        let (sender, mut receiver) = mpsc::channel(4);

        let mut lab = session();
        lab.start();
        for item in SETUP_SEQUENCE {
            lab.placement_attempt(item);
        }
        lab.settle();
        lab.increment_pressed(IncrementSize::Coarse).unwrap();
        lab.stop_pressed();

        export_readings(&lab, &path, &sender).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("volume_ml,ph"));
        assert_eq!(content.lines().count(), 3);
        assert!(matches!(receiver.recv().await, Some(UiEvent::Message(_))));
    }
}
