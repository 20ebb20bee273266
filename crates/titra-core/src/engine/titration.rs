use super::config::{LabConfig, TerminationConfig, TitrantConfig};
use super::error::EngineError;
use crate::core::curve::TitrationCurve;
use crate::core::models::reading::Reading;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Slope (pH per mL) above which the fine increment becomes available.
pub const FINE_UNLOCK_SLOPE: f64 = 0.3;
/// pH at or above which the fine increment is withdrawn again.
pub const FINE_LOCK_PH: f64 = 8.0;

// Cumulative volumes are kept to 1e-4 mL.
const VOLUME_STEPS_PER_ML: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncrementSize {
    Coarse,
    Fine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionReason {
    PhLimit,
    VolumeLimit,
    UserStopped,
}

/// The reading history and burette state of one titration run.
#[derive(Debug, Clone, PartialEq)]
pub struct TitrationSession {
    readings: Vec<Reading>,
    cumulative_volume: f64,
    remaining_titrant: f64,
    active: bool,
    fine_increment_unlocked: bool,
    completion: Option<CompletionReason>,
    overrun_reported: bool,
}

impl TitrationSession {
    fn new(capacity_ml: f64, initial: Reading) -> Self {
        Self {
            readings: vec![initial],
            cumulative_volume: 0.0,
            remaining_titrant: capacity_ml,
            active: false,
            fine_increment_unlocked: false,
            completion: None,
            overrun_reported: false,
        }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn cumulative_volume(&self) -> f64 {
        self.cumulative_volume
    }

    /// Titrant left in the burette. Not clamped: it goes negative past capacity.
    pub fn remaining_titrant(&self) -> f64 {
        self.remaining_titrant
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn fine_increment_unlocked(&self) -> bool {
        self.fine_increment_unlocked
    }

    pub fn completion(&self) -> Option<CompletionReason> {
        self.completion
    }

    fn terminate(&mut self, reason: CompletionReason) -> Termination {
        let fine_increment_revoked = self.fine_increment_unlocked;
        self.active = false;
        self.fine_increment_unlocked = false;
        self.completion = Some(reason);
        info!(
            ?reason,
            volume = self.cumulative_volume,
            readings = self.readings.len(),
            "Titration complete."
        );
        Termination {
            reason,
            fine_increment_revoked,
        }
    }
}

/// What ending a titration changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Termination {
    pub reason: CompletionReason,
    /// The fine increment was available and has now been withdrawn.
    pub fine_increment_revoked: bool,
}

/// What a single accepted increment changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncrementReport {
    pub reading: Reading,
    pub remaining_titrant_ml: f64,
    /// New availability of the fine increment, if it changed.
    pub fine_increment_changed: Option<bool>,
    pub completion: Option<CompletionReason>,
}

/// Decides fine-increment availability after a new reading.
///
/// A steep slope below pH 8 unlocks the fine increment, any reading at pH 8 or above locks
/// it, and everything else leaves it as it was.
pub fn evaluate_fine_gate(previous: &Reading, latest: &Reading, unlocked: bool) -> bool {
    let steep = latest
        .slope_from(previous)
        .is_some_and(|slope| slope > FINE_UNLOCK_SLOPE);
    if steep && latest.ph < FINE_LOCK_PH {
        true
    } else if latest.ph >= FINE_LOCK_PH {
        false
    } else {
        unlocked
    }
}

fn quantize_volume(volume: f64) -> f64 {
    (volume * VOLUME_STEPS_PER_ML).round() / VOLUME_STEPS_PER_ML
}

/// Owns the titration session and applies titrant increments to it.
pub struct TitrationEngine {
    curve: Box<dyn TitrationCurve>,
    titrant: TitrantConfig,
    termination: TerminationConfig,
    session: Option<TitrationSession>,
}

impl TitrationEngine {
    pub fn new(curve: Box<dyn TitrationCurve>, config: &LabConfig) -> Self {
        Self {
            curve,
            titrant: config.titrant.clone(),
            termination: config.termination.clone(),
            session: None,
        }
    }

    pub fn session(&self) -> Option<&TitrationSession> {
        self.session.as_ref()
    }

    pub fn readings(&self) -> &[Reading] {
        self.session
            .as_ref()
            .map(|s| s.readings())
            .unwrap_or_default()
    }

    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.active)
    }

    pub fn fine_increment_unlocked(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.fine_increment_unlocked)
    }

    pub fn increment_volume(&self, size: IncrementSize) -> f64 {
        match size {
            IncrementSize::Coarse => self.titrant.coarse_increment_ml,
            IncrementSize::Fine => self.titrant.fine_increment_ml,
        }
    }

    /// Opens the session with the reading of the untitrated sample.
    ///
    /// Only the first call per session records anything; later calls return `None`.
    pub fn record_initial(&mut self) -> Option<Reading> {
        if self.session.is_some() {
            debug!("Initial reading already recorded; ignoring.");
            return None;
        }
        let reading = Reading::new(0.0, self.curve.ph_at(0.0));
        info!(ph = reading.ph, "Recorded initial pH.");
        self.session = Some(TitrationSession::new(self.titrant.capacity_ml, reading));
        Some(reading)
    }

    /// Starts accepting increments. Returns `false` if there is no open session or the
    /// session has already been completed.
    pub fn activate(&mut self) -> bool {
        match self.session.as_mut() {
            Some(session) if session.completion.is_none() => {
                session.active = true;
                true
            }
            _ => false,
        }
    }

    /// Adds `delta` mL of titrant and records the resulting reading.
    ///
    /// Returns `Ok(None)` without touching anything while the titration is not active.
    pub fn add_increment(&mut self, delta: f64) -> Result<Option<IncrementReport>, EngineError> {
        if !delta.is_finite() || delta <= 0.0 {
            return Err(EngineError::InvalidIncrement { delta });
        }
        let Some(session) = self.session.as_mut().filter(|s| s.active) else {
            debug!(delta, "Increment ignored: titration is not active.");
            return Ok(None);
        };

        let previous = session
            .readings
            .last()
            .copied()
            .ok_or_else(|| EngineError::Internal("Active session has no readings".into()))?;

        session.cumulative_volume = quantize_volume(session.cumulative_volume + delta);
        session.remaining_titrant = quantize_volume(session.remaining_titrant - delta);
        if session.remaining_titrant < 0.0 && !session.overrun_reported {
            warn!(
                remaining = session.remaining_titrant,
                "Burette capacity exceeded; continuing with a negative titrant level."
            );
            session.overrun_reported = true;
        }

        let reading = Reading::new(
            session.cumulative_volume,
            self.curve.ph_at(session.cumulative_volume),
        );
        session.readings.push(reading);
        debug!(volume = reading.volume, ph = reading.ph, "Reading added.");

        let was_unlocked = session.fine_increment_unlocked;
        session.fine_increment_unlocked =
            evaluate_fine_gate(&previous, &reading, session.fine_increment_unlocked);

        let completion = if reading.ph >= self.termination.stop_ph {
            Some(session.terminate(CompletionReason::PhLimit).reason)
        } else if reading.volume >= self.termination.stop_volume_ml {
            Some(session.terminate(CompletionReason::VolumeLimit).reason)
        } else {
            None
        };

        let fine_increment_changed = (session.fine_increment_unlocked != was_unlocked)
            .then_some(session.fine_increment_unlocked);

        Ok(Some(IncrementReport {
            reading,
            remaining_titrant_ml: session.remaining_titrant,
            fine_increment_changed,
            completion,
        }))
    }

    /// Ends an active titration at the user's request, whatever the current pH or volume.
    pub fn force_stop(&mut self) -> Option<Termination> {
        let session = self.session.as_mut().filter(|s| s.active)?;
        Some(session.terminate(CompletionReason::UserStopped))
    }

    pub fn reset(&mut self) {
        self.session = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::curve::GlycineCurve;
    use crate::engine::config::LabConfigBuilder;
    use std::collections::VecDeque;

    /// Replays a fixed list of pH values, one per call.
    struct ScriptedCurve(VecDeque<f64>);

    impl TitrationCurve for ScriptedCurve {
        fn ph_at(&mut self, _volume: f64) -> f64 {
            self.0.pop_front().unwrap_or(7.0)
        }
    }

    fn scripted(phs: &[f64]) -> TitrationEngine {
        let curve = ScriptedCurve(phs.iter().copied().collect());
        let mut engine = TitrationEngine::new(Box::new(curve), &LabConfig::default());
        engine.record_initial().unwrap();
        assert!(engine.activate());
        engine
    }

    fn glycine(seed: u64) -> TitrationEngine {
        TitrationEngine::new(Box::new(GlycineCurve::seeded(seed)), &LabConfig::default())
    }

    #[test]
    fn record_initial_opens_session_once() {
        let mut engine = glycine(1);
        let first = engine.record_initial().unwrap();
        assert_eq!(first.volume, 0.0);
        assert!((2.35..=2.55).contains(&first.ph));
        assert!(engine.record_initial().is_none());
        assert_eq!(engine.readings().len(), 1);
        assert!(!engine.is_active());
    }

    #[test]
    fn increments_are_ignored_until_activated() {
        let mut engine = glycine(1);
        assert_eq!(engine.add_increment(0.5), Ok(None));
        engine.record_initial();
        assert_eq!(engine.add_increment(0.5), Ok(None));
        assert_eq!(engine.readings().len(), 1);
    }

    #[test]
    fn rejects_non_positive_and_non_finite_increments() {
        let mut engine = scripted(&[2.4]);
        assert_eq!(
            engine.add_increment(0.0),
            Err(EngineError::InvalidIncrement { delta: 0.0 })
        );
        assert!(engine.add_increment(-0.5).is_err());
        assert!(engine.add_increment(f64::NAN).is_err());
        assert_eq!(engine.readings().len(), 1);
    }

    #[test]
    fn coarse_increments_accumulate_volume_and_drain_burette() {
        let mut engine = glycine(5);
        engine.record_initial();
        engine.activate();
        for _ in 0..10 {
            engine.add_increment(0.5).unwrap().unwrap();
        }
        let session = engine.session().unwrap();
        assert_eq!(session.cumulative_volume(), 5.0);
        assert_eq!(session.remaining_titrant(), 45.0);
        assert_eq!(session.readings().len(), 11);
        assert!(
            session
                .readings()
                .windows(2)
                .all(|w| w[0].volume < w[1].volume)
        );
    }

    #[test]
    fn fine_increments_land_exactly_on_breakpoints() {
        let mut engine = glycine(9);
        engine.record_initial();
        engine.activate();
        for _ in 0..50 {
            engine.add_increment(0.1).unwrap();
        }
        assert_eq!(engine.session().unwrap().cumulative_volume(), 5.0);
    }

    #[test]
    fn steep_slope_below_ph_8_unlocks_fine_increment() {
        // initial 3.0, then +0.5 mL to 3.4: slope 0.8
        let mut engine = scripted(&[3.0, 3.4]);
        let report = engine.add_increment(0.5).unwrap().unwrap();
        assert_eq!(report.fine_increment_changed, Some(true));
        assert!(engine.fine_increment_unlocked());
    }

    #[test]
    fn shallow_slope_leaves_gate_unchanged() {
        let mut engine = scripted(&[3.0, 3.4, 3.45]);
        engine.add_increment(0.5).unwrap();
        let report = engine.add_increment(0.5).unwrap().unwrap();
        assert_eq!(report.fine_increment_changed, None);
        assert!(engine.fine_increment_unlocked());
    }

    #[test]
    fn reaching_ph_8_locks_fine_increment_regardless_of_slope() {
        let mut engine = scripted(&[3.0, 3.4, 8.0]);
        engine.add_increment(0.5).unwrap();
        let report = engine.add_increment(0.5).unwrap().unwrap();
        assert_eq!(report.fine_increment_changed, Some(false));
        assert!(!engine.fine_increment_unlocked());
    }

    #[test]
    fn evaluate_fine_gate_truth_table() {
        let prev = Reading::new(10.0, 6.0);
        assert!(evaluate_fine_gate(&prev, &Reading::new(10.5, 6.5), false));
        assert!(!evaluate_fine_gate(&prev, &Reading::new(10.5, 6.1), false));
        assert!(evaluate_fine_gate(&prev, &Reading::new(10.5, 6.1), true));
        assert!(!evaluate_fine_gate(&prev, &Reading::new(10.5, 9.0), true));
        assert!(!evaluate_fine_gate(&prev, &Reading::new(10.5, 8.0), true));
    }

    #[test]
    fn ph_limit_terminates_exactly_once() {
        let mut engine = scripted(&[3.0, 10.9, 11.0]);
        assert_eq!(engine.add_increment(0.5).unwrap().unwrap().completion, None);
        let report = engine.add_increment(0.5).unwrap().unwrap();
        assert_eq!(report.completion, Some(CompletionReason::PhLimit));
        assert!(!engine.is_active());

        assert_eq!(engine.add_increment(0.5), Ok(None));
        assert_eq!(engine.readings().len(), 3);
        assert!(!engine.activate());
    }

    #[test]
    fn volume_limit_terminates_titration() {
        let config = LabConfigBuilder::new().stop_volume_ml(1.0).build().unwrap();
        let curve = ScriptedCurve(VecDeque::from(vec![3.0, 3.1, 3.2]));
        let mut engine = TitrationEngine::new(Box::new(curve), &config);
        engine.record_initial();
        engine.activate();
        engine.add_increment(0.5).unwrap();
        let report = engine.add_increment(0.5).unwrap().unwrap();
        assert_eq!(report.completion, Some(CompletionReason::VolumeLimit));
        assert_eq!(
            engine.session().unwrap().completion(),
            Some(CompletionReason::VolumeLimit)
        );
    }

    #[test]
    fn termination_withdraws_fine_increment() {
        let mut engine = scripted(&[3.0, 3.4, 11.5]);
        engine.add_increment(0.5).unwrap();
        assert!(engine.fine_increment_unlocked());
        let report = engine.add_increment(0.5).unwrap().unwrap();
        assert_eq!(report.fine_increment_changed, Some(false));
        assert!(!engine.fine_increment_unlocked());
    }

    #[test]
    fn force_stop_ends_active_titration_only() {
        let mut engine = scripted(&[3.0, 3.4]);
        engine.add_increment(0.5).unwrap();
        let termination = engine.force_stop().unwrap();
        assert_eq!(termination.reason, CompletionReason::UserStopped);
        assert!(termination.fine_increment_revoked);
        assert!(engine.force_stop().is_none());
        assert_eq!(engine.add_increment(0.5), Ok(None));
    }

    #[test]
    fn remaining_titrant_may_go_negative() {
        let config = LabConfigBuilder::new()
            .capacity_ml(1.0)
            .stop_volume_ml(5.0)
            .build()
            .unwrap();
        let mut engine = TitrationEngine::new(Box::new(ScriptedCurve(VecDeque::new())), &config);
        engine.record_initial();
        engine.activate();
        for _ in 0..3 {
            engine.add_increment(0.5).unwrap();
        }
        assert_eq!(engine.session().unwrap().remaining_titrant(), -0.5);
        assert!(engine.is_active());
    }

    #[test]
    fn reset_discards_session() {
        let mut engine = scripted(&[3.0, 3.4]);
        engine.add_increment(0.5).unwrap();
        engine.reset();
        assert!(engine.session().is_none());
        assert!(engine.readings().is_empty());
        assert!(!engine.is_active());
        assert!(engine.record_initial().is_some());
    }
}
