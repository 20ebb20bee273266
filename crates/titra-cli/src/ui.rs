use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::sync::Arc;
use titrasim::core::analysis::AnalysisResult;
use titrasim::core::models::apparatus::ApparatusItem;
use titrasim::core::models::reading::Reading;
use titrasim::engine::events::{EventCallback, LabEvent};
use titrasim::engine::setup::RejectReason;
use titrasim::engine::titration::CompletionReason;
use tokio::sync::{mpsc, watch};
use tracing::warn;

// Gauge resolution: one tick per 0.01 mL.
const GAUGE_TICKS_PER_ML: f64 = 100.0;

const PLOT_WIDTH: usize = 56;
const PLOT_MAX_PH: usize = 14;

type PlainWriter = Box<dyn Write + Send>;

#[derive(Debug)]
pub enum UiEvent {
    Lab(LabEvent),
    Log(String),
    Message(String),
}

pub struct UiManager {
    mp: Arc<MultiProgress>,
    state: BenchState,
    stdout: PlainWriter,
    stderr: PlainWriter,
    event_receiver: mpsc::Receiver<UiEvent>,
    shutdown_receiver: watch::Receiver<bool>,
    _sentinel_bar: ProgressBar,
}

#[derive(Default)]
struct BenchState {
    gauge: Option<ProgressBar>,
    capacity_ml: f64,
    table_started: bool,
}

impl UiManager {
    pub fn new() -> (Self, mpsc::Sender<UiEvent>, watch::Sender<bool>) {
        Self::with_writers(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// `stdout` and `stderr` receive bench output and log lines whenever the progress
    /// display is hidden, e.g. when stderr is redirected.
    fn with_writers(
        stdout: PlainWriter,
        stderr: PlainWriter,
    ) -> (Self, mpsc::Sender<UiEvent>, watch::Sender<bool>) {
        let (event_sender, event_receiver) = mpsc::channel(1024);
        let (shutdown_sender, shutdown_receiver) = watch::channel(false);
        let mp = Arc::new(MultiProgress::new());
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(12));
        let _sentinel_bar = mp.add(ProgressBar::hidden());
        let manager = Self {
            mp,
            state: BenchState::default(),
            stdout,
            stderr,
            event_receiver,
            shutdown_receiver,
            _sentinel_bar,
        };

        (manager, event_sender, shutdown_sender)
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(event) = self.event_receiver.recv() => {
                    self.handle_event(event);
                }
                result = self.shutdown_receiver.changed() => {
                    if result.is_err() || *self.shutdown_receiver.borrow() {
                        break;
                    }
                }
            }
        }
        // Flush whatever was queued before the shutdown signal.
        while let Ok(event) = self.event_receiver.try_recv() {
            self.handle_event(event);
        }
        if let Some(gauge) = self.state.gauge.take() {
            gauge.finish_and_clear();
        }
        self._sentinel_bar.finish_and_clear();
        self.stdout.flush().ok();
    }

    fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Log(msg) => self.print_log(&msg),
            UiEvent::Message(msg) => self.print(&msg),
            UiEvent::Lab(event) => self.handle_lab_event(event),
        }
    }

    fn handle_lab_event(&mut self, event: LabEvent) {
        match event {
            LabEvent::StageAdvanced { stage, instruction } => {
                self.print(&format!("▶ {} · {}", stage, instruction));
            }
            LabEvent::PlacementAccepted { item } => {
                self.print(&format!("  ✓ {}", item.placed_label()));
            }
            LabEvent::PlacementRejected { item, reason } => {
                self.print(&format!("  ✗ {}", describe_rejection(item, reason)));
            }
            LabEvent::ReadingAdded {
                reading,
                remaining_titrant_ml,
            } => {
                if !self.state.table_started {
                    self.print("  Volume (mL)   pH");
                    self.state.table_started = true;
                }
                self.print(&format_row(&reading));
                self.update_gauge(remaining_titrant_ml);
            }
            LabEvent::FineIncrementAvailability(available) => {
                let text = if available {
                    "  ◆ Steep region: the fine increment is now available."
                } else {
                    "  ◇ The fine increment is no longer available."
                };
                self.print(text);
            }
            LabEvent::TitrationCompleted { readings, reason } => {
                // Freeze the burette at its final level.
                if let Some(gauge) = self.state.gauge.as_ref() {
                    gauge.abandon();
                }
                self.print(&format!(
                    "■ Titration complete ({}): {} readings recorded.",
                    describe_completion(reason),
                    readings.len()
                ));
                if readings.len() > 1 {
                    for line in curve_plot(&readings) {
                        self.print(&line);
                    }
                }
            }
            LabEvent::AnalysisReady(result) => {
                for line in results_panel(&result) {
                    self.print(&line);
                }
            }
            LabEvent::ResetCompleted => {
                if let Some(gauge) = self.state.gauge.take() {
                    gauge.finish_and_clear();
                }
                self.state = BenchState::default();
                self.print("↺ The bench has been cleared.");
            }
        }
    }

    /// Bench output: above the progress bars on a terminal, plain stdout otherwise.
    fn print(&mut self, line: &str) {
        if self.mp.is_hidden() {
            writeln!(self.stdout, "{}", line).ok();
        } else {
            self.mp.println(line).ok();
        }
    }

    fn print_log(&mut self, line: &str) {
        if self.mp.is_hidden() {
            writeln!(self.stderr, "{}", line).ok();
        } else {
            self.mp.println(line).ok();
        }
    }

    fn update_gauge(&mut self, remaining_ml: f64) {
        if self.state.gauge.is_none() {
            self.state.capacity_ml = remaining_ml.max(0.0);
            let pb = self
                .mp
                .add(ProgressBar::new(to_ticks(self.state.capacity_ml)));
            pb.set_style(Self::gauge_style());
            self.state.gauge = Some(pb);
        }
        if let Some(gauge) = self.state.gauge.as_ref() {
            gauge.set_position(to_ticks(remaining_ml));
            gauge.set_message(format!(
                "NaOH {:>5.1} / {:.1} mL",
                remaining_ml, self.state.capacity_ml
            ));
        }
    }

    fn gauge_style() -> ProgressStyle {
        ProgressStyle::with_template("  Burette [{bar:40.cyan/blue}] {msg}")
            .expect("Invalid template")
            .progress_chars("█▓░")
    }
}

fn to_ticks(ml: f64) -> u64 {
    (ml.max(0.0) * GAUGE_TICKS_PER_ML).round() as u64
}

pub fn format_row(reading: &Reading) -> String {
    format!("  {:>11.1}   {:.2}", reading.volume, reading.ph)
}

pub fn describe_rejection(item: ApparatusItem, reason: RejectReason) -> String {
    match reason {
        RejectReason::NotInSetupPhase => {
            format!("{} cannot be placed right now.", item.label())
        }
        RejectReason::OutOfOrder { expected } => format!(
            "{} is out of order; place the {} first.",
            item.label(),
            expected.label()
        ),
        RejectReason::AlreadyPlaced => format!("{} is already in place.", item.label()),
    }
}

fn describe_completion(reason: CompletionReason) -> &'static str {
    match reason {
        CompletionReason::PhLimit => "pH limit reached",
        CompletionReason::VolumeLimit => "volume limit reached",
        CompletionReason::UserStopped => "stopped",
    }
}

pub fn results_panel(result: &AnalysisResult) -> Vec<String> {
    let source = |samples: usize| {
        if samples == 0 {
            "literature value".to_string()
        } else {
            format!("mean of {} readings", samples)
        }
    };
    vec![
        "Results".to_string(),
        format!("  pKa1 ≈ {:.2}  ({})", result.pka1, source(result.pka1_samples)),
        format!("  pKa2 ≈ {:.2}  ({})", result.pka2, source(result.pka2_samples)),
        format!("  pI   ≈ {:.2}", result.isoelectric_point),
    ]
}

/// Scatter plot of pH against volume, one row per pH unit from 14 down to 0.
pub fn curve_plot(readings: &[Reading]) -> Vec<String> {
    let max_volume = readings
        .iter()
        .map(|r| r.volume)
        .fold(0.0_f64, f64::max)
        .max(f64::EPSILON);

    let mut grid = vec![vec![' '; PLOT_WIDTH]; PLOT_MAX_PH + 1];
    for reading in readings {
        let column = (reading.volume.max(0.0) / max_volume * (PLOT_WIDTH - 1) as f64).round();
        let level = reading.ph.clamp(0.0, PLOT_MAX_PH as f64).round() as usize;
        grid[PLOT_MAX_PH - level][(column as usize).min(PLOT_WIDTH - 1)] = '•';
    }

    let mut lines = vec!["   pH".to_string()];
    for (i, row) in grid.iter().enumerate() {
        let points: String = row.iter().collect();
        lines.push(
            format!("  {:>2} ┤{}", PLOT_MAX_PH - i, points)
                .trim_end()
                .to_string(),
        );
    }
    lines.push(format!("     └{}", "─".repeat(PLOT_WIDTH)));
    lines.push(format!(
        "      0{:>width$.1} mL",
        max_volume,
        width = PLOT_WIDTH - 1
    ));
    lines
}

#[derive(Clone)]
pub struct CliEventHandler {
    sender: mpsc::Sender<UiEvent>,
}

impl CliEventHandler {
    pub fn new(sender: mpsc::Sender<UiEvent>) -> Self {
        Self { sender }
    }

    pub fn get_callback(&self) -> EventCallback<'static> {
        let sender = self.sender.clone();
        Box::new(move |event: LabEvent| {
            if let Err(e) = sender.try_send(UiEvent::Lab(event)) {
                warn!("Failed to send lab event to UI channel: {}", e);
            }
        })
    }
}
