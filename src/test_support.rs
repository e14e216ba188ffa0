//! Synthetic hands for exercising the core without a camera or model.

use std::time::{Duration, Instant};

use crate::types::{DetectedHand, Frame, Handedness, LANDMARK_COUNT, Landmark, landmarks};

pub const FRAME_WIDTH: u32 = 1280;
pub const FRAME_HEIGHT: u32 = 720;

/// Builds a plausible upright hand in pixel space whose middle-finger base
/// (landmark 9) sits at `center`.
#[derive(Clone, Debug)]
pub struct HandBuilder {
    handedness: Handedness,
    center: (f32, f32),
    raised: [bool; 5],
}

impl HandBuilder {
    pub fn new(handedness: Handedness, center: (f32, f32)) -> Self {
        Self {
            handedness,
            center,
            raised: [false; 5],
        }
    }

    pub fn raised(mut self, raised: [bool; 5]) -> Self {
        self.raised = raised;
        self
    }

    /// Raises the first `count` fingers, thumb first.
    pub fn with_count(mut self, count: u32) -> Self {
        for (i, flag) in self.raised.iter_mut().enumerate() {
            *flag = (i as u32) < count;
        }
        self
    }

    pub fn build(&self) -> DetectedHand {
        let s = match self.handedness {
            Handedness::Right => 1.0,
            Handedness::Left => -1.0,
        };
        let wrist = (self.center.0, self.center.1 + 100.0);
        let mut px = [(0.0f32, 0.0f32); LANDMARK_COUNT];

        px[landmarks::WRIST] = (0.0, 0.0);
        px[landmarks::THUMB_CMC] = (s * 30.0, -20.0);
        px[landmarks::THUMB_MCP] = (s * 50.0, -45.0);
        px[landmarks::THUMB_IP] = (s * 65.0, -70.0);
        px[landmarks::THUMB_TIP] = if self.raised[0] {
            (s * 100.0, -85.0)
        } else {
            (s * 50.0, -75.0)
        };

        let fingers = [
            (landmarks::INDEX_MCP, s * 35.0),
            (landmarks::MIDDLE_MCP, 0.0),
            (landmarks::RING_MCP, -s * 20.0),
            (landmarks::PINKY_MCP, -s * 40.0),
        ];
        for (finger, &(mcp, x)) in fingers.iter().enumerate() {
            let up = self.raised[finger + 1];
            px[mcp] = (x, -100.0);
            px[mcp + 1] = (x, -140.0);
            px[mcp + 2] = (x, if up { -170.0 } else { -125.0 });
            px[mcp + 3] = (x, if up { -200.0 } else { -110.0 });
        }

        let points = px.map(|(dx, dy)| {
            Landmark::new(
                (wrist.0 + dx) / FRAME_WIDTH as f32,
                (wrist.1 + dy) / FRAME_HEIGHT as f32,
                0.0,
            )
        });

        DetectedHand {
            landmarks: points,
            handedness: self.handedness,
            score: 0.95,
        }
    }
}

pub fn hand(count: u32, center: (f32, f32)) -> DetectedHand {
    HandBuilder::new(Handedness::Right, center)
        .with_count(count)
        .build()
}

pub fn frame_at(start: Instant, offset_ms: u64) -> Frame {
    Frame {
        rgba: Vec::new(),
        width: FRAME_WIDTH,
        height: FRAME_HEIGHT,
        timestamp: start + Duration::from_millis(offset_ms),
    }
}
