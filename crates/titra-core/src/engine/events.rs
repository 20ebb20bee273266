use super::setup::RejectReason;
use super::titration::CompletionReason;
use crate::core::analysis::AnalysisResult;
use crate::core::models::apparatus::ApparatusItem;
use crate::core::models::reading::Reading;
use crate::core::models::stage::Stage;

/// Notifications sent from a lab session to its presentation adapter.
///
/// Events describe what already happened; the adapter renders them but never has to
/// answer them.
#[derive(Debug, Clone, PartialEq)]
pub enum LabEvent {
    StageAdvanced {
        stage: Stage,
        instruction: &'static str,
    },
    PlacementAccepted {
        item: ApparatusItem,
    },
    PlacementRejected {
        item: ApparatusItem,
        reason: RejectReason,
    },
    ReadingAdded {
        reading: Reading,
        remaining_titrant_ml: f64,
    },
    FineIncrementAvailability(bool),
    TitrationCompleted {
        readings: Vec<Reading>,
        reason: CompletionReason,
    },
    AnalysisReady(AnalysisResult),
    ResetCompleted,
}

pub type EventCallback<'a> = Box<dyn Fn(LabEvent) + Send + Sync + 'a>;

#[derive(Default)]
pub struct EventReporter<'a> {
    callback: Option<EventCallback<'a>>,
}

impl<'a> EventReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: EventCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: LabEvent) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
