use std::{
    ops::ControlFlow,
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{Result, anyhow};
use crossbeam_channel::Sender;
use thiserror::Error;

use crate::{
    calculator::{self, CalculationResult, OperationKind},
    fingers::FingerCounter,
    hands::{self, Operands},
    selection::{SelectionMachine, SelectionOutcome, SelectionState},
    types::{DetectedHand, Frame, HandObservation},
};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open camera: {0}")]
    Open(String),
    #[error("camera frame read failed: {0}")]
    ReadFailed(String),
}

pub trait FrameSource {
    /// Blocks until the next frame is available. An error ends the run.
    fn read_frame(&mut self) -> Result<Frame>;
}

pub trait HandDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedHand>>;
}

pub trait Display {
    fn present(&mut self, frame: Frame, report: &FrameReport) -> Result<()>;

    /// Polled once per frame, after `present`.
    fn poll_command(&mut self) -> Option<Command>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Selecting,
    Calculating { operation: OperationKind },
}

#[derive(Clone, Debug, PartialEq)]
pub enum PhaseView {
    Selecting(SelectionOutcome),
    Calculating {
        operation: OperationKind,
        operands: Operands,
        result: CalculationResult,
    },
}

impl PhaseView {
    /// Status lines shown next to the video. `hold` is the confirmation dwell.
    pub fn lines(&self, hold: Duration) -> Vec<String> {
        match self {
            PhaseView::Selecting(outcome) => {
                let mut lines = vec!["Select an operation:".to_string()];
                lines.extend(OperationKind::ALL.iter().map(|op| {
                    format!(
                        "{} = {} {}",
                        op.trigger_count(),
                        op.display_name(),
                        op.symbol()
                    )
                }));
                lines.push(hold_hint(hold));
                match outcome {
                    SelectionOutcome::Idle(advisory) => lines.push(advisory.message().to_string()),
                    SelectionOutcome::Holding {
                        operation,
                        progress,
                    } => lines.push(format!(
                        "Detecting: {} {}%",
                        operation.display_name(),
                        (progress * 100.0) as u32
                    )),
                    SelectionOutcome::Confirmed(operation) => {
                        lines.push(format!("Selected: {}", operation.display_name()))
                    }
                }
                lines
            }
            PhaseView::Calculating {
                operation,
                operands,
                result,
            } => vec![
                format!("LEFT: {}", operands.left),
                format!("RIGHT: {}", operands.right),
                format!("Operation: {}", operation.display_name()),
                format!(
                    "{} {} {} = {}",
                    operands.left,
                    operation.symbol(),
                    operands.right,
                    calculator::format_result(result)
                ),
                "[R] Reset [Q] Quit".to_string(),
            ],
        }
    }
}

fn hold_hint(hold: Duration) -> String {
    let seconds = hold.as_secs_f32();
    if seconds == 1.0 {
        "Hold for 1 second".to_string()
    } else {
        format!("Hold for {seconds} seconds")
    }
}

/// Everything a renderer needs for one frame.
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub hands: Vec<HandObservation>,
    pub view: PhaseView,
    pub hold: Duration,
}

impl FrameReport {
    pub fn lines(&self) -> Vec<String> {
        self.view.lines(self.hold)
    }
}

/// Owned calculator state, threaded through the frame loop.
#[derive(Clone, Debug)]
pub struct Session {
    phase: Phase,
    selection: SelectionMachine,
    counter: FingerCounter,
}

impl Session {
    pub fn new(counter: FingerCounter, hold: Duration) -> Self {
        Self {
            phase: Phase::Selecting,
            selection: SelectionMachine::new(hold),
            counter,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn selection_state(&self) -> SelectionState {
        self.selection.state()
    }

    /// Runs one frame's worth of state updates. `frame` must already be
    /// mirrored; its timestamp is the clock for the dwell timer.
    pub fn process(&mut self, frame: &Frame, detections: Vec<DetectedHand>) -> FrameReport {
        let hands = hands::observe(detections, &self.counter, frame.width, frame.height);

        let view = match self.phase {
            Phase::Selecting => {
                // Only the detector's first hand drives selection.
                let count = hands.first().map(HandObservation::finger_count);
                let outcome = self.selection.update(count, frame.timestamp);
                if let SelectionOutcome::Confirmed(operation) = outcome {
                    log::info!("operation selected: {}", operation.display_name());
                    self.phase = Phase::Calculating { operation };
                }
                PhaseView::Selecting(outcome)
            }
            Phase::Calculating { operation } => {
                let operands = hands::aggregate(&hands, frame.width);
                let result = calculator::compute(operands.left, operands.right, operation);
                PhaseView::Calculating {
                    operation,
                    operands,
                    result,
                }
            }
        };

        FrameReport {
            hands,
            view,
            hold: self.selection.hold(),
        }
    }

    pub fn apply(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Quit => {
                log::info!("exiting");
                ControlFlow::Break(())
            }
            Command::Reset => {
                log::info!("resetting, select a new operation");
                self.phase = Phase::Selecting;
                self.selection.reset();
                ControlFlow::Continue(())
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(FingerCounter::default(), crate::selection::CONFIRMATION_HOLD)
    }
}

/// Sequential frame loop: capture, mirror, detect, update, present, then poll
/// for a command. Returns on quit; a capture error is returned as-is.
pub fn run<S, D, R>(
    session: &mut Session,
    source: &mut S,
    detector: &mut D,
    display: &mut R,
) -> Result<()>
where
    S: FrameSource,
    D: HandDetector,
    R: Display,
{
    loop {
        let mut frame = source.read_frame()?;
        frame.mirror_horizontal();

        let detections = detector.detect(&frame).unwrap_or_else(|err| {
            log::warn!("hand detection failed: {err:?}");
            Vec::new()
        });

        let report = session.process(&frame, detections);
        display.present(frame, &report)?;

        if let Some(command) = display.poll_command() {
            if session.apply(command).is_break() {
                return Ok(());
            }
        }
    }
}

/// A frame loop on its own thread. The source is opened and dropped on that
/// thread, so the camera is released before `shutdown` returns.
pub struct LoopThread {
    handle: JoinHandle<Result<()>>,
    commands: Sender<Command>,
}

/// Starts `run` on a worker thread. `commands` must feed the same channel the
/// display polls, so `shutdown` can deliver a quit.
pub fn spawn_loop<F, S, D, R>(
    open_source: F,
    mut session: Session,
    mut detector: D,
    mut display: R,
    commands: Sender<Command>,
) -> LoopThread
where
    F: FnOnce() -> Result<S> + Send + 'static,
    S: FrameSource,
    D: HandDetector + Send + 'static,
    R: Display + Send + 'static,
{
    let handle = thread::spawn(move || {
        let mut source = open_source()?;
        let result = run(&mut session, &mut source, &mut detector, &mut display);
        drop(source);
        log::debug!("frame source released");
        result
    });

    LoopThread { handle, commands }
}

impl LoopThread {
    /// Asks the loop to quit and waits for it. Returns the loop's own error if
    /// it had already stopped on one.
    pub fn shutdown(self) -> Result<()> {
        if self.commands.send(Command::Quit).is_err() {
            log::debug!("frame loop already stopped");
        }
        self.handle
            .join()
            .map_err(|_| anyhow!("frame loop thread panicked"))?
    }
}
