use crate::core::models::apparatus::{ApparatusItem, SETUP_SEQUENCE};
use crate::core::models::stage::Stage;
use serde::Serialize;
use tracing::debug;

/// Why a placement attempt was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RejectReason {
    /// The session is not in one of the six setup stages.
    NotInSetupPhase,
    /// The current stage waits for a different item.
    OutOfOrder { expected: ApparatusItem },
    /// The item is already in place.
    AlreadyPlaced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    Accepted,
    Rejected(RejectReason),
}

impl PlacementOutcome {
    pub fn is_accepted(self) -> bool {
        matches!(self, PlacementOutcome::Accepted)
    }
}

/// Which apparatus items have been placed, indexed by position in [`SETUP_SEQUENCE`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupState {
    placed: [bool; SETUP_SEQUENCE.len()],
}

impl SetupState {
    pub fn is_placed(&self, item: ApparatusItem) -> bool {
        self.placed[item.sequence_index()]
    }

    pub fn placed_items(&self) -> impl Iterator<Item = ApparatusItem> + '_ {
        SETUP_SEQUENCE
            .iter()
            .copied()
            .filter(move |item| self.is_placed(*item))
    }

    pub fn placed_count(&self) -> usize {
        self.placed.iter().filter(|&&p| p).count()
    }

    pub fn is_complete(&self) -> bool {
        self.placed.iter().all(|&p| p)
    }

    fn mark(&mut self, item: ApparatusItem) {
        self.placed[item.sequence_index()] = true;
    }
}

/// Enforces the fixed apparatus placement order.
///
/// A placement is accepted only when the stage is a setup stage, the item is the one that
/// stage waits for, and it has not been placed yet. Rejections leave the state untouched.
#[derive(Debug, Clone, Default)]
pub struct SetupGate {
    state: SetupState,
}

impl SetupGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SetupState {
        &self.state
    }

    pub fn attempt_place(&mut self, item: ApparatusItem, current_stage: Stage) -> PlacementOutcome {
        let Some(expected) = current_stage.required_item() else {
            return PlacementOutcome::Rejected(RejectReason::NotInSetupPhase);
        };
        if item != expected {
            return PlacementOutcome::Rejected(RejectReason::OutOfOrder { expected });
        }
        if self.state.is_placed(item) {
            return PlacementOutcome::Rejected(RejectReason::AlreadyPlaced);
        }

        self.state.mark(item);
        debug!(item = %item, stage = current_stage.value(), "Apparatus item placed.");
        PlacementOutcome::Accepted
    }

    pub fn reset(&mut self) {
        self.state = SetupState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(n: u8) -> Stage {
        Stage::new(n).unwrap()
    }

    #[test]
    fn accepts_the_item_required_by_the_current_stage() {
        let mut gate = SetupGate::new();
        let outcome = gate.attempt_place(ApparatusItem::Stand, stage(1));
        assert_eq!(outcome, PlacementOutcome::Accepted);
        assert!(gate.state().is_placed(ApparatusItem::Stand));
        assert_eq!(gate.state().placed_count(), 1);
    }

    #[test]
    fn rejects_out_of_order_placement_without_state_change() {
        let mut gate = SetupGate::new();
        let outcome = gate.attempt_place(ApparatusItem::Beaker, stage(1));
        assert_eq!(
            outcome,
            PlacementOutcome::Rejected(RejectReason::OutOfOrder {
                expected: ApparatusItem::Stand
            })
        );
        assert_eq!(gate.state(), &SetupState::default());
    }

    #[test]
    fn rejects_placement_outside_setup_stages() {
        let mut gate = SetupGate::new();
        for n in [0, 7, 8] {
            let outcome = gate.attempt_place(ApparatusItem::Stand, stage(n));
            assert_eq!(
                outcome,
                PlacementOutcome::Rejected(RejectReason::NotInSetupPhase)
            );
        }
        assert_eq!(gate.state().placed_count(), 0);
    }

    #[test]
    fn rejects_duplicate_placement() {
        let mut gate = SetupGate::new();
        assert!(gate.attempt_place(ApparatusItem::Stand, stage(1)).is_accepted());
        assert_eq!(
            gate.attempt_place(ApparatusItem::Stand, stage(1)),
            PlacementOutcome::Rejected(RejectReason::AlreadyPlaced)
        );
    }

    #[test]
    fn full_sequence_completes_setup() {
        let mut gate = SetupGate::new();
        for (i, item) in SETUP_SEQUENCE.iter().enumerate() {
            assert!(!gate.state().is_complete());
            assert!(gate.attempt_place(*item, stage(i as u8 + 1)).is_accepted());
        }
        assert!(gate.state().is_complete());
        assert_eq!(
            gate.state().placed_items().collect::<Vec<_>>(),
            SETUP_SEQUENCE.to_vec()
        );
    }

    #[test]
    fn reset_clears_every_flag() {
        let mut gate = SetupGate::new();
        gate.attempt_place(ApparatusItem::Stand, stage(1));
        gate.attempt_place(ApparatusItem::Burette, stage(2));
        gate.reset();
        assert_eq!(gate.state().placed_count(), 0);
    }
}
