use crate::core::analysis::{self, AnalysisResult};
use crate::core::curve::{GlycineCurve, TitrationCurve};
use crate::core::models::apparatus::ApparatusItem;
use crate::core::models::stage::Stage;
use crate::engine::config::LabConfig;
use crate::engine::error::EngineError;
use crate::engine::events::{EventReporter, LabEvent};
use crate::engine::setup::{PlacementOutcome, SetupGate, SetupState};
use crate::engine::titration::{
    CompletionReason, IncrementReport, IncrementSize, TitrationEngine, TitrationSession,
};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// A follow-up the session wants to run once its settle delay has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Move from the initial-reading stage to the active titration.
    BeginTitration,
    /// Estimate pKa values from the completed run.
    Analyze,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    pub action: PendingAction,
    pub delay: Duration,
}

/// What the stop control did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// An active titration was ended early.
    Stopped,
    /// Nothing was running, so the whole session was reset.
    Reset,
}

/// One run of the titration experiment, from the idle stage to the analysis.
///
/// The session is the only owner of the stage, the setup gate, the titration engine and
/// the analysis result. Every input method runs to completion synchronously. Follow-ups
/// that should only become visible after a delay are parked as a [`Pending`] action and
/// executed by [`LabSession::settle`].
pub struct LabSession<'a> {
    config: LabConfig,
    stage: Stage,
    setup: SetupGate,
    titration: TitrationEngine,
    analysis: Option<AnalysisResult>,
    pending: Option<Pending>,
    reporter: EventReporter<'a>,
}

impl<'a> LabSession<'a> {
    pub fn new(
        config: LabConfig,
        curve: Box<dyn TitrationCurve>,
        reporter: EventReporter<'a>,
    ) -> Self {
        let titration = TitrationEngine::new(curve, &config);
        Self {
            config,
            stage: Stage::IDLE,
            setup: SetupGate::new(),
            titration,
            analysis: None,
            pending: None,
            reporter,
        }
    }

    /// A session driven by the glycine curve with a reproducible random source.
    pub fn seeded(config: LabConfig, seed: u64, reporter: EventReporter<'a>) -> Self {
        let curve = GlycineCurve::seeded(seed).with_noise_scale(config.noise_scale);
        Self::new(config, Box::new(curve), reporter)
    }

    /// A session driven by the glycine curve seeded from system entropy.
    pub fn from_entropy(config: LabConfig, reporter: EventReporter<'a>) -> Self {
        let curve = GlycineCurve::from_entropy().with_noise_scale(config.noise_scale);
        Self::new(config, Box::new(curve), reporter)
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn setup_state(&self) -> &SetupState {
        self.setup.state()
    }

    pub fn titration(&self) -> Option<&TitrationSession> {
        self.titration.session()
    }

    pub fn is_titrating(&self) -> bool {
        self.titration.is_active()
    }

    pub fn fine_increment_unlocked(&self) -> bool {
        self.titration.fine_increment_unlocked()
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn pending(&self) -> Option<Pending> {
        self.pending
    }

    /// Leaves the idle stage. Returns `false` if the experiment was already started.
    pub fn start(&mut self) -> bool {
        if self.stage != Stage::IDLE {
            debug!(stage = self.stage.value(), "Start ignored: already started.");
            return false;
        }
        info!("Experiment started.");
        self.advance_stage();
        true
    }

    pub fn placement_attempt(&mut self, item: ApparatusItem) -> PlacementOutcome {
        let outcome = self.setup.attempt_place(item, self.stage);
        match outcome {
            PlacementOutcome::Accepted => {
                self.reporter.report(LabEvent::PlacementAccepted { item });
                self.advance_stage();
            }
            PlacementOutcome::Rejected(reason) => {
                debug!(item = %item, ?reason, "Placement rejected.");
                self.reporter
                    .report(LabEvent::PlacementRejected { item, reason });
            }
        }
        outcome
    }

    /// Adds one coarse or fine increment of titrant.
    ///
    /// A fine press while the fine increment is locked is ignored, as is any press while
    /// the titration is not active.
    pub fn increment_pressed(
        &mut self,
        size: IncrementSize,
    ) -> Result<Option<IncrementReport>, EngineError> {
        if size == IncrementSize::Fine && !self.titration.fine_increment_unlocked() {
            debug!("Fine increment ignored: not unlocked.");
            return Ok(None);
        }
        let delta = self.titration.increment_volume(size);
        let Some(report) = self.titration.add_increment(delta)? else {
            return Ok(None);
        };

        self.reporter.report(LabEvent::ReadingAdded {
            reading: report.reading,
            remaining_titrant_ml: report.remaining_titrant_ml,
        });
        if let Some(available) = report.fine_increment_changed {
            self.reporter
                .report(LabEvent::FineIncrementAvailability(available));
        }
        if let Some(reason) = report.completion {
            self.on_completed(reason);
        }
        Ok(Some(report))
    }

    /// Ends an active titration early; otherwise resets the session.
    pub fn stop_pressed(&mut self) -> StopOutcome {
        match self.titration.force_stop() {
            Some(termination) => {
                if termination.fine_increment_revoked {
                    self.reporter
                        .report(LabEvent::FineIncrementAvailability(false));
                }
                self.on_completed(termination.reason);
                StopOutcome::Stopped
            }
            None => {
                self.reset_requested();
                StopOutcome::Reset
            }
        }
    }

    /// Returns every component to its initial state and drops any pending follow-up.
    pub fn reset_requested(&mut self) {
        self.stage = Stage::IDLE;
        self.setup.reset();
        self.titration.reset();
        self.analysis = None;
        self.pending = None;
        info!("Session reset.");
        self.reporter.report(LabEvent::ResetCompleted);
    }

    /// Runs the pending follow-up, if any, and returns which one ran.
    #[instrument(level = "debug", skip_all)]
    pub fn settle(&mut self) -> Option<PendingAction> {
        let pending = self.pending.take()?;
        match pending.action {
            PendingAction::BeginTitration => {
                self.advance_stage();
            }
            PendingAction::Analyze => {
                if let Some(result) = analysis::analyze(self.titration.readings()) {
                    info!(
                        pka1 = result.pka1,
                        pka2 = result.pka2,
                        pi = result.isoelectric_point,
                        "Analysis ready."
                    );
                    self.analysis = Some(result);
                    self.reporter.report(LabEvent::AnalysisReady(result));
                }
            }
        }
        Some(pending.action)
    }

    fn advance_stage(&mut self) {
        let Some(next) = self.stage.next() else {
            return;
        };
        self.stage = next;
        info!(stage = next.value(), "Stage advanced.");
        self.reporter.report(LabEvent::StageAdvanced {
            stage: next,
            instruction: next.instruction(),
        });

        if next == Stage::INITIAL_READING {
            if let Some(reading) = self.titration.record_initial() {
                self.reporter.report(LabEvent::ReadingAdded {
                    reading,
                    remaining_titrant_ml: self.config.titrant.capacity_ml,
                });
            }
            self.schedule(PendingAction::BeginTitration, self.config.settle.stage_delay);
        } else if next == Stage::TITRATION {
            self.titration.activate();
        }
    }

    fn on_completed(&mut self, reason: CompletionReason) {
        self.reporter.report(LabEvent::TitrationCompleted {
            readings: self.titration.readings().to_vec(),
            reason,
        });
        self.schedule(PendingAction::Analyze, self.config.settle.analysis_delay);
    }

    fn schedule(&mut self, action: PendingAction, delay: Duration) {
        debug!(?action, ?delay, "Follow-up scheduled.");
        self.pending = Some(Pending { action, delay });
    }
}
