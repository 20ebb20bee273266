use super::lab::LabSession;
use crate::core::analysis::AnalysisResult;
use crate::core::models::apparatus::SETUP_SEQUENCE;
use crate::core::models::reading::Reading;
use crate::engine::error::EngineError;
use crate::engine::titration::{CompletionReason, IncrementSize};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// How a scripted run chooses between the coarse and the fine increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Always press the coarse increment.
    #[default]
    CoarseOnly,
    /// Switch to the fine increment whenever it is available.
    Adaptive,
}

impl Strategy {
    fn choose(self, fine_unlocked: bool) -> IncrementSize {
        match self {
            Strategy::Adaptive if fine_unlocked => IncrementSize::Fine,
            _ => IncrementSize::Coarse,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentResult {
    pub readings: Vec<Reading>,
    pub completion: Option<CompletionReason>,
    pub analysis: Option<AnalysisResult>,
}

/// Walks a fresh session through the whole experiment: start, assemble the apparatus in
/// order, titrate until the session terminates and wait for the analysis.
///
/// `wait` is called with each settle delay before the pending follow-up is run, so callers
/// decide whether delays are slept through or skipped.
#[instrument(skip_all, name = "experiment_workflow", fields(strategy = ?strategy))]
pub fn run(
    session: &mut LabSession<'_>,
    strategy: Strategy,
    mut wait: impl FnMut(Duration),
) -> Result<ExperimentResult, EngineError> {
    if !session.start() {
        warn!("Session was already started; resetting before the scripted run.");
        session.reset_requested();
        session.start();
    }

    for item in SETUP_SEQUENCE {
        if !session.placement_attempt(item).is_accepted() {
            return Err(EngineError::Internal(format!(
                "Scripted placement of '{item}' was rejected"
            )));
        }
    }
    info!("Apparatus assembled.");
    settle_pending(session, &mut wait);

    while session.is_titrating() {
        let size = strategy.choose(session.fine_increment_unlocked());
        if session.increment_pressed(size)?.is_none() {
            return Err(EngineError::Internal(
                "Active titration ignored an increment".into(),
            ));
        }
    }
    settle_pending(session, &mut wait);

    let titration = session.titration();
    let result = ExperimentResult {
        readings: titration.map(|t| t.readings().to_vec()).unwrap_or_default(),
        completion: titration.and_then(|t| t.completion()),
        analysis: session.analysis().copied(),
    };
    info!(
        readings = result.readings.len(),
        completion = ?result.completion,
        "Experiment finished."
    );
    Ok(result)
}

fn settle_pending(session: &mut LabSession<'_>, wait: &mut impl FnMut(Duration)) {
    if let Some(pending) = session.pending() {
        wait(pending.delay);
        session.settle();
    }
}
