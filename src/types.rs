use std::time::Instant;

use rayon::prelude::*;

pub const LANDMARK_COUNT: usize = 21;

/// Hand landmark indices (MediaPipe hand landmark model convention).
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_PIP: usize = 14;
    pub const RING_DIP: usize = 15;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;

    pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

    pub const CONNECTIONS: [(usize, usize); 23] = [
        (WRIST, THUMB_CMC),
        (THUMB_CMC, THUMB_MCP),
        (THUMB_MCP, THUMB_IP),
        (THUMB_IP, THUMB_TIP),
        (WRIST, INDEX_MCP),
        (INDEX_MCP, INDEX_PIP),
        (INDEX_PIP, INDEX_DIP),
        (INDEX_DIP, INDEX_TIP),
        (WRIST, MIDDLE_MCP),
        (MIDDLE_MCP, MIDDLE_PIP),
        (MIDDLE_PIP, MIDDLE_DIP),
        (MIDDLE_DIP, MIDDLE_TIP),
        (WRIST, RING_MCP),
        (RING_MCP, RING_PIP),
        (RING_PIP, RING_DIP),
        (RING_DIP, RING_TIP),
        (WRIST, PINKY_MCP),
        (PINKY_MCP, PINKY_PIP),
        (PINKY_PIP, PINKY_DIP),
        (PINKY_DIP, PINKY_TIP),
        (INDEX_MCP, MIDDLE_MCP),
        (MIDDLE_MCP, RING_MCP),
        (RING_MCP, PINKY_MCP),
    ];
}

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl Frame {
    /// Flips the frame around its vertical axis, in place.
    pub fn mirror_horizontal(&mut self) {
        let row_bytes = self.width as usize * 4;
        if row_bytes == 0 || self.rgba.len() < row_bytes {
            return;
        }

        self.rgba.par_chunks_exact_mut(row_bytes).for_each(|row| {
            let pixels = row.len() / 4;
            for i in 0..pixels / 2 {
                let j = pixels - 1 - i;
                for c in 0..4 {
                    row.swap(i * 4 + c, j * 4 + c);
                }
            }
        });
    }
}

/// Normalized landmark position: x and y in [0, 1] relative to the frame, z is
/// relative depth.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_pixels(&self, width: u32, height: u32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}

/// Detector-assigned hand label. Labels are produced on the mirrored frame, so
/// they are inverted relative to the subject's anatomical hands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn from_score(score: f32) -> Self {
        if score >= 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Handedness::Left => "Left",
            Handedness::Right => "Right",
        }
    }

    #[cfg(test)]
    pub fn flipped(&self) -> Self {
        match self {
            Handedness::Left => Handedness::Right,
            Handedness::Right => Handedness::Left,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FingerState {
    Extended,
    Folded,
}

impl FingerState {
    pub fn from_extended(extended: bool) -> Self {
        if extended {
            FingerState::Extended
        } else {
            FingerState::Folded
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, FingerState::Extended)
    }
}

/// One hand as reported by the detector for a single frame.
#[derive(Clone, Debug)]
pub struct DetectedHand {
    pub landmarks: [Landmark; LANDMARK_COUNT],
    pub handedness: Handedness,
    pub score: f32,
}

/// A detected hand enriched with its pixel-space center and finger states.
/// Lives for one frame only.
#[derive(Clone, Debug)]
pub struct HandObservation {
    pub landmarks: [Landmark; LANDMARK_COUNT],
    pub handedness: Handedness,
    pub center: (f32, f32),
    pub finger_states: [FingerState; 5],
}

impl HandObservation {
    pub fn finger_count(&self) -> u32 {
        self.finger_states.iter().filter(|s| s.is_extended()).count() as u32
    }

    pub fn pixel_landmarks(&self, width: u32, height: u32) -> Vec<(f32, f32)> {
        self.landmarks
            .iter()
            .map(|lm| lm.to_pixels(width, height))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_reverses_each_row() {
        let mut frame = Frame {
            rgba: vec![
                1, 1, 1, 255, 2, 2, 2, 255, 3, 3, 3, 255, //
                4, 4, 4, 255, 5, 5, 5, 255, 6, 6, 6, 255,
            ],
            width: 3,
            height: 2,
            timestamp: Instant::now(),
        };

        frame.mirror_horizontal();

        let firsts: Vec<u8> = frame.rgba.chunks_exact(4).map(|px| px[0]).collect();
        assert_eq!(firsts, vec![3, 2, 1, 6, 5, 4]);
        assert!(frame.rgba.chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn handedness_threshold_matches_model_convention() {
        assert_eq!(Handedness::from_score(0.9), Handedness::Right);
        assert_eq!(Handedness::from_score(0.5), Handedness::Right);
        assert_eq!(Handedness::from_score(0.1), Handedness::Left);
    }

    #[test]
    fn skeleton_reaches_every_landmark() {
        let mut seen = [false; LANDMARK_COUNT];
        for (a, b) in landmarks::CONNECTIONS {
            seen[a] = true;
            seen[b] = true;
        }
        assert!(seen.iter().all(|s| *s));
        assert!(landmarks::FINGERTIPS.iter().all(|&tip| tip < LANDMARK_COUNT));
    }
}
