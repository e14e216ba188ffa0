use crate::types::{FingerState, Handedness, LANDMARK_COUNT, Landmark, landmarks};

/// Horizontal margin the thumb tip must clear past its IP joint, in pixels.
/// Tuned at 1280x720 and deliberately not normalized by resolution.
pub const THUMB_MARGIN_PX: f32 = 20.0;
pub const MIN_FINGER_THRESHOLD_PX: f32 = 15.0;
pub const FINGER_THRESHOLD_RATIO: f32 = 0.3;

// (tip, pip, mcp) for index, middle, ring and little fingers.
const FINGER_JOINTS: [(usize, usize, usize); 4] = [
    (landmarks::INDEX_TIP, landmarks::INDEX_PIP, landmarks::INDEX_MCP),
    (landmarks::MIDDLE_TIP, landmarks::MIDDLE_PIP, landmarks::MIDDLE_MCP),
    (landmarks::RING_TIP, landmarks::RING_PIP, landmarks::RING_MCP),
    (landmarks::PINKY_TIP, landmarks::PINKY_PIP, landmarks::PINKY_MCP),
];

/// Geometric extended-finger counter working in pixel space.
#[derive(Clone, Copy, Debug)]
pub struct FingerCounter {
    pub thumb_margin_px: f32,
    pub min_threshold_px: f32,
    pub threshold_ratio: f32,
}

impl Default for FingerCounter {
    fn default() -> Self {
        Self {
            thumb_margin_px: THUMB_MARGIN_PX,
            min_threshold_px: MIN_FINGER_THRESHOLD_PX,
            threshold_ratio: FINGER_THRESHOLD_RATIO,
        }
    }
}

impl FingerCounter {
    /// Per-finger states in thumb, index, middle, ring, little order.
    pub fn finger_states(
        &self,
        points: &[Landmark; LANDMARK_COUNT],
        handedness: Handedness,
        width: u32,
        height: u32,
    ) -> [FingerState; 5] {
        let px = |idx: usize| points[idx].to_pixels(width, height);

        let thumb = self.thumb_extended(
            px(landmarks::THUMB_TIP).0,
            px(landmarks::THUMB_IP).0,
            handedness,
        );

        let mut states = [FingerState::from_extended(thumb); 5];
        for (slot, &(tip, pip, mcp)) in states[1..].iter_mut().zip(FINGER_JOINTS.iter()) {
            *slot = FingerState::from_extended(self.finger_extended(
                px(tip).1,
                px(pip).1,
                px(mcp).1,
            ));
        }
        states
    }

    pub fn count(
        &self,
        points: &[Landmark; LANDMARK_COUNT],
        handedness: Handedness,
        width: u32,
        height: u32,
    ) -> u32 {
        self.finger_states(points, handedness, width, height)
            .iter()
            .filter(|s| s.is_extended())
            .count() as u32
    }

    fn thumb_extended(&self, tip_x: f32, ip_x: f32, handedness: Handedness) -> bool {
        match handedness {
            Handedness::Right => tip_x > ip_x + self.thumb_margin_px,
            Handedness::Left => tip_x < ip_x - self.thumb_margin_px,
        }
    }

    // Image y grows downward, so "above" means a smaller y.
    fn finger_extended(&self, tip_y: f32, pip_y: f32, mcp_y: f32) -> bool {
        let reference = (pip_y - mcp_y).abs();
        let threshold = (reference * self.threshold_ratio).max(self.min_threshold_px);
        tip_y < pip_y - threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FRAME_HEIGHT, FRAME_WIDTH, HandBuilder};

    fn count(hand: &HandBuilder) -> u32 {
        let detected = hand.build();
        FingerCounter::default().count(
            &detected.landmarks,
            detected.handedness,
            FRAME_WIDTH,
            FRAME_HEIGHT,
        )
    }

    #[test]
    fn open_hand_counts_five() {
        for handedness in [Handedness::Left, Handedness::Right] {
            let hand = HandBuilder::new(handedness, (640.0, 400.0)).raised([true; 5]);
            assert_eq!(count(&hand), 5, "{handedness:?}");
        }
    }

    #[test]
    fn fist_counts_zero() {
        for handedness in [Handedness::Left, Handedness::Right] {
            let hand = HandBuilder::new(handedness, (640.0, 400.0)).raised([false; 5]);
            assert_eq!(count(&hand), 0, "{handedness:?}");
        }
    }

    #[test]
    fn partial_hands_count_raised_fingers() {
        for n in 0..=5 {
            let hand = HandBuilder::new(Handedness::Right, (300.0, 400.0)).with_count(n);
            assert_eq!(count(&hand), n);
        }
    }

    #[test]
    fn thumb_direction_flips_with_handedness() {
        let counter = FingerCounter::default();

        // Tip well to the right of the joint.
        assert!(counter.thumb_extended(130.0, 100.0, Handedness::Right));
        assert!(!counter.thumb_extended(130.0, 100.0, Handedness::Left));

        // Tip well to the left of the joint.
        assert!(counter.thumb_extended(70.0, 100.0, Handedness::Left));
        assert!(!counter.thumb_extended(70.0, 100.0, Handedness::Right));
    }

    #[test]
    fn thumb_inside_margin_is_folded_for_both_labels() {
        let counter = FingerCounter::default();
        assert!(!counter.thumb_extended(119.0, 100.0, Handedness::Right));
        assert!(!counter.thumb_extended(81.0, 100.0, Handedness::Left));
    }

    #[test]
    fn swapping_label_on_same_landmarks_swaps_thumb_result() {
        let hand = HandBuilder::new(Handedness::Right, (640.0, 400.0)).raised([
            true, false, false, false, false,
        ]);
        let detected = hand.build();
        let counter = FingerCounter::default();

        let as_labelled = counter.finger_states(
            &detected.landmarks,
            detected.handedness,
            FRAME_WIDTH,
            FRAME_HEIGHT,
        );
        let as_flipped = counter.finger_states(
            &detected.landmarks,
            detected.handedness.flipped(),
            FRAME_WIDTH,
            FRAME_HEIGHT,
        );

        assert_eq!(as_labelled[0], FingerState::Extended);
        assert_eq!(as_flipped[0], FingerState::Folded);
        assert_eq!(as_labelled[1..], as_flipped[1..]);
    }

    #[test]
    fn short_fingers_use_pixel_floor() {
        let counter = FingerCounter::default();
        // 0.3 * 10px = 3px, so the 15px floor applies.
        assert!(!counter.finger_extended(88.0, 100.0, 110.0));
        assert!(counter.finger_extended(84.0, 100.0, 110.0));
    }

    #[test]
    fn long_fingers_use_proportional_threshold() {
        let counter = FingerCounter::default();
        // 0.3 * 100px = 30px.
        assert!(!counter.finger_extended(75.0, 100.0, 200.0));
        assert!(counter.finger_extended(69.0, 100.0, 200.0));
    }
}
