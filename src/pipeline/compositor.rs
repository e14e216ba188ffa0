use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};

use crate::{
    pipeline::overlay,
    session::{Command, Display, FrameReport},
    types::Frame,
};

#[derive(Clone, Debug)]
pub struct CompositedFrame {
    pub frame: Frame,
    pub report: FrameReport,
}

/// Display that composites overlays into the frame and hands it to the UI
/// thread. Commands typed in the UI come back on a second channel.
pub struct ChannelDisplay {
    composited_tx: Sender<CompositedFrame>,
    command_rx: Receiver<Command>,
    closed: bool,
}

/// Returns the loop-side display plus the UI's ends of both channels.
pub fn display_channels() -> (ChannelDisplay, Receiver<CompositedFrame>, Sender<Command>) {
    let (composited_tx, composited_rx) = crossbeam_channel::bounded(1);
    let (command_tx, command_rx) = crossbeam_channel::unbounded();
    (
        ChannelDisplay {
            composited_tx,
            command_rx,
            closed: false,
        },
        composited_rx,
        command_tx,
    )
}

impl Display for ChannelDisplay {
    fn present(&mut self, mut frame: Frame, report: &FrameReport) -> Result<()> {
        overlay::draw_report(&mut frame.rgba, frame.width, frame.height, report);

        let packet = CompositedFrame {
            frame,
            report: report.clone(),
        };
        match self.composited_tx.try_send(packet) {
            Ok(()) => {}
            // The UI keeps only the newest frame; skipping one here is harmless.
            Err(TrySendError::Full(_)) => log::trace!("ui busy, composited frame skipped"),
            Err(TrySendError::Disconnected(_)) => {
                log::debug!("ui closed");
                self.closed = true;
            }
        }
        Ok(())
    }

    fn poll_command(&mut self) -> Option<Command> {
        if self.closed {
            return Some(Command::Quit);
        }
        match self.command_rx.try_recv() {
            Ok(command) => Some(command),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Command::Quit),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::{
        selection::{Advisory, CONFIRMATION_HOLD, SelectionOutcome},
        session::PhaseView,
        test_support::frame_at,
    };

    fn report() -> FrameReport {
        FrameReport {
            hands: Vec::new(),
            view: PhaseView::Selecting(SelectionOutcome::Idle(Advisory::NoHand)),
            hold: CONFIRMATION_HOLD,
        }
    }

    #[test]
    fn forwards_frames_and_commands() {
        let (mut display, frames, commands) = display_channels();

        display.present(frame_at(Instant::now(), 0), &report()).unwrap();
        assert!(frames.try_recv().is_ok());
        assert_eq!(display.poll_command(), None);

        commands.send(Command::Reset).unwrap();
        assert_eq!(display.poll_command(), Some(Command::Reset));
    }

    #[test]
    fn busy_ui_does_not_block_the_loop() {
        let (mut display, frames, _commands) = display_channels();
        let start = Instant::now();

        for ms in 0..5 {
            display.present(frame_at(start, ms), &report()).unwrap();
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(display.poll_command(), None);
    }

    #[test]
    fn closed_ui_means_quit() {
        let (mut display, frames, commands) = display_channels();
        drop(frames);
        drop(commands);

        display.present(frame_at(Instant::now(), 0), &report()).unwrap();
        assert_eq!(display.poll_command(), Some(Command::Quit));
    }
}
