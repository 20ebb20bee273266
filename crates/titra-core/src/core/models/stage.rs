use super::apparatus::{ApparatusItem, SETUP_SEQUENCE};
use serde::Serialize;
use std::fmt;

/// Number of instructional stages, including the idle stage 0.
pub const N_STEPS: u8 = 9;

static INSTRUCTIONS: [&str; N_STEPS as usize] = [
    "Welcome! Click 'Start Experiment' to begin the titration setup.",
    "Drag the burette stand to its position to set up the apparatus.",
    "Now mount the burette onto the stand.",
    "Place the beaker below the burette to collect the titrant.",
    "Attach the pH meter probe into the beaker.",
    "Add the glycine solution (25 mL) to the beaker.",
    "Fill the burette with 0.1M NaOH solution.",
    "Setup complete! Record the initial pH and begin titration.",
    "Add NaOH in increments. Use 0.5 mL for regular additions, 0.1 mL near equivalence point.",
];

/// The current instructional step of a lab session.
///
/// Stage 0 is idle, stages 1-6 each wait for one apparatus item, stage 7 captures the
/// initial reading and stage 8 is the active titration. A stage only ever moves forward
/// one step at a time; going back to 0 requires an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Stage(u8);

impl Stage {
    pub const IDLE: Stage = Stage(0);
    pub const INITIAL_READING: Stage = Stage(7);
    pub const TITRATION: Stage = Stage(8);

    pub fn new(value: u8) -> Option<Self> {
        (value < N_STEPS).then_some(Stage(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// The following stage, or `None` once the titration stage has been reached.
    pub fn next(self) -> Option<Stage> {
        Stage::new(self.0 + 1)
    }

    pub fn is_setup(self) -> bool {
        (1..=6).contains(&self.0)
    }

    /// The apparatus item this stage waits for, if it is a setup stage.
    pub fn required_item(self) -> Option<ApparatusItem> {
        if self.is_setup() {
            Some(SETUP_SEQUENCE[usize::from(self.0) - 1])
        } else {
            None
        }
    }

    pub fn instruction(self) -> &'static str {
        INSTRUCTIONS[usize::from(self.0)]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {}", self.0)
    }
}
