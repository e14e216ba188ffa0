use std::time::{Duration, Instant};

use crate::calculator::OperationKind;

pub const CONFIRMATION_HOLD: Duration = Duration::from_secs(2);

/// Why the machine is not progressing this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advisory {
    NoHand,
    NoFingers,
    TooManyFingers,
}

impl Advisory {
    pub fn message(&self) -> &'static str {
        match self {
            Advisory::NoHand => "Show your hand",
            Advisory::NoFingers => "Raise 1-4 fingers",
            Advisory::TooManyFingers => "Maximum 4 fingers",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SelectionOutcome {
    Idle(Advisory),
    /// A candidate is being held; `progress` is in [0, 1].
    Holding {
        operation: OperationKind,
        progress: f32,
    },
    Confirmed(OperationKind),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub candidate: Option<u32>,
    pub hold_start: Option<Instant>,
}

/// Dwell-time selector: a finger count in the operation range must be held
/// unchanged for the full hold duration. Any change restarts the timer.
#[derive(Clone, Debug)]
pub struct SelectionMachine {
    state: SelectionState,
    hold: Duration,
}

impl SelectionMachine {
    pub fn new(hold: Duration) -> Self {
        Self {
            state: SelectionState::default(),
            hold,
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn hold(&self) -> Duration {
        self.hold
    }

    pub fn reset(&mut self) {
        self.state = SelectionState::default();
    }

    /// Advances the machine with the first hand's finger count for this frame,
    /// or `None` when no hand was detected.
    pub fn update(&mut self, count: Option<u32>, now: Instant) -> SelectionOutcome {
        let Some(count) = count else {
            self.reset();
            return SelectionOutcome::Idle(Advisory::NoHand);
        };

        let Some(operation) = OperationKind::from_finger_count(count) else {
            self.reset();
            let advisory = if count == 0 {
                Advisory::NoFingers
            } else {
                Advisory::TooManyFingers
            };
            return SelectionOutcome::Idle(advisory);
        };

        if self.state.candidate != Some(count) {
            self.state = SelectionState {
                candidate: Some(count),
                hold_start: Some(now),
            };
            return SelectionOutcome::Holding {
                operation,
                progress: 0.0,
            };
        }

        let Some(start) = self.state.hold_start else {
            self.state.hold_start = Some(now);
            return SelectionOutcome::Holding {
                operation,
                progress: 0.0,
            };
        };

        let elapsed = now.saturating_duration_since(start);
        if elapsed >= self.hold {
            log::debug!("held {count} fingers for {elapsed:?}");
            self.reset();
            SelectionOutcome::Confirmed(operation)
        } else {
            SelectionOutcome::Holding {
                operation,
                progress: progress_ratio(elapsed, self.hold),
            }
        }
    }
}

impl Default for SelectionMachine {
    fn default() -> Self {
        Self::new(CONFIRMATION_HOLD)
    }
}

fn progress_ratio(elapsed: Duration, hold: Duration) -> f32 {
    if hold.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f32() / hold.as_secs_f32()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(start: Instant, ms: u64) -> Instant {
        start + Duration::from_millis(ms)
    }

    fn feed(
        machine: &mut SelectionMachine,
        start: Instant,
        count: u32,
        from_ms: u64,
        to_ms: u64,
    ) -> Vec<SelectionOutcome> {
        (from_ms..=to_ms)
            .step_by(100)
            .map(|ms| machine.update(Some(count), at(start, ms)))
            .collect()
    }

    #[test]
    fn steady_count_confirms_exactly_once() {
        let mut machine = SelectionMachine::default();
        let start = Instant::now();

        let outcomes = feed(&mut machine, start, 3, 0, 2_000);
        let confirmations: Vec<_> = outcomes
            .iter()
            .filter(|o| matches!(o, SelectionOutcome::Confirmed(_)))
            .collect();

        assert_eq!(
            confirmations,
            vec![&SelectionOutcome::Confirmed(OperationKind::Multiply)]
        );
        assert_eq!(
            outcomes.last(),
            Some(&SelectionOutcome::Confirmed(OperationKind::Multiply))
        );
        assert_eq!(machine.state(), SelectionState::default());
    }

    #[test]
    fn changing_count_restarts_the_timer() {
        let mut machine = SelectionMachine::default();
        let start = Instant::now();

        let mut outcomes = feed(&mut machine, start, 3, 0, 1_000);
        outcomes.extend(feed(&mut machine, start, 2, 1_100, 2_100));

        assert!(
            outcomes
                .iter()
                .all(|o| !matches!(o, SelectionOutcome::Confirmed(_))),
            "{outcomes:?}"
        );
        assert_eq!(machine.state().candidate, Some(2));
        assert_eq!(machine.state().hold_start, Some(at(start, 1_100)));
    }

    #[test]
    fn progress_grows_while_holding() {
        let mut machine = SelectionMachine::default();
        let start = Instant::now();

        assert_eq!(
            machine.update(Some(1), start),
            SelectionOutcome::Holding {
                operation: OperationKind::Add,
                progress: 0.0
            }
        );
        match machine.update(Some(1), at(start, 1_000)) {
            SelectionOutcome::Holding {
                operation,
                progress,
            } => {
                assert_eq!(operation, OperationKind::Add);
                assert!((progress - 0.5).abs() < 1e-3, "progress = {progress}");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn out_of_range_counts_reset_with_advisory() {
        let mut machine = SelectionMachine::default();
        let start = Instant::now();

        machine.update(Some(4), start);
        assert_eq!(
            machine.update(Some(5), at(start, 500)),
            SelectionOutcome::Idle(Advisory::TooManyFingers)
        );
        assert_eq!(machine.state(), SelectionState::default());

        machine.update(Some(4), at(start, 600));
        assert_eq!(
            machine.update(Some(0), at(start, 700)),
            SelectionOutcome::Idle(Advisory::NoFingers)
        );
        assert_eq!(machine.state(), SelectionState::default());

        machine.update(Some(4), at(start, 800));
        assert_eq!(
            machine.update(None, at(start, 900)),
            SelectionOutcome::Idle(Advisory::NoHand)
        );
        assert_eq!(machine.state(), SelectionState::default());
    }

    #[test]
    fn interruption_does_not_carry_partial_credit() {
        let mut machine = SelectionMachine::default();
        let start = Instant::now();

        feed(&mut machine, start, 4, 0, 1_500);
        machine.update(None, at(start, 1_600));
        let outcomes = feed(&mut machine, start, 4, 1_700, 3_600);

        assert!(
            outcomes
                .iter()
                .all(|o| !matches!(o, SelectionOutcome::Confirmed(_)))
        );
        assert_eq!(
            machine.update(Some(4), at(start, 3_700)),
            SelectionOutcome::Confirmed(OperationKind::Divide)
        );
    }
}
