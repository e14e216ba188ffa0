//! Window-less display: state changes go to the log, commands come from stdin.

use std::{
    io::{self, BufRead},
    thread,
};

use anyhow::Result;
use crossbeam_channel::{Receiver, TryRecvError};

use crate::{
    selection::SelectionOutcome,
    session::{Command, Display, FrameReport, PhaseView},
    types::Frame,
};

pub struct LogDisplay {
    command_rx: Receiver<Command>,
    last_headline: Option<String>,
}

impl LogDisplay {
    pub fn new(command_rx: Receiver<Command>) -> Self {
        Self {
            command_rx,
            last_headline: None,
        }
    }

    /// Reads `q` / `r` lines from stdin on a helper thread.
    pub fn from_stdin() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if let Some(command) = parse_command(&line) {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
            }
        });
        Self::new(rx)
    }
}

pub fn parse_command(input: &str) -> Option<Command> {
    match input.trim() {
        "q" | "Q" => Some(Command::Quit),
        "r" | "R" => Some(Command::Reset),
        _ => None,
    }
}

/// One-line summary without the parts that change every frame.
fn headline(report: &FrameReport) -> String {
    match &report.view {
        PhaseView::Selecting(SelectionOutcome::Idle(advisory)) => advisory.message().to_string(),
        PhaseView::Selecting(SelectionOutcome::Holding { operation, .. }) => {
            format!("detecting {}", operation.display_name())
        }
        PhaseView::Selecting(SelectionOutcome::Confirmed(operation)) => {
            format!("selected {}", operation.display_name())
        }
        PhaseView::Calculating { .. } => report.lines()[3].clone(),
    }
}

impl Display for LogDisplay {
    fn present(&mut self, _frame: Frame, report: &FrameReport) -> Result<()> {
        let headline = headline(report);
        if self.last_headline.as_deref() != Some(headline.as_str()) {
            log::info!("{headline}");
            self.last_headline = Some(headline);
        }
        log::trace!("{} hand(s): {:?}", report.hands.len(), report.view);
        Ok(())
    }

    fn poll_command(&mut self) -> Option<Command> {
        match self.command_rx.try_recv() {
            Ok(command) => Some(command),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Command::Quit),
        }
    }
}
