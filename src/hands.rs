use crate::{
    fingers::FingerCounter,
    types::{DetectedHand, HandObservation, landmarks},
};

/// Finger totals on each half of the screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Operands {
    pub left: u32,
    pub right: u32,
}

/// Turns detector output into per-frame observations, keeping detector order.
pub fn observe(
    detections: Vec<DetectedHand>,
    counter: &FingerCounter,
    width: u32,
    height: u32,
) -> Vec<HandObservation> {
    detections
        .into_iter()
        .map(|hand| {
            let finger_states =
                counter.finger_states(&hand.landmarks, hand.handedness, width, height);
            let center = hand.landmarks[landmarks::MIDDLE_MCP].to_pixels(width, height);
            log::trace!(
                "{} hand at ({:.0}, {:.0}) score {:.2} wrist z {:.3}",
                hand.handedness.label(),
                center.0,
                center.1,
                hand.score,
                hand.landmarks[landmarks::WRIST].z
            );
            HandObservation {
                landmarks: hand.landmarks,
                handedness: hand.handedness,
                center,
                finger_states,
            }
        })
        .collect()
}

/// Sums finger counts per side of the vertical midline. A hand whose center is
/// exactly on the midline belongs to the right side.
pub fn aggregate(hands: &[HandObservation], screen_width: u32) -> Operands {
    let midpoint = screen_width as f32 / 2.0;

    hands.iter().fold(Operands::default(), |mut totals, hand| {
        if hand.center.0 < midpoint {
            totals.left += hand.finger_count();
        } else {
            totals.right += hand.finger_count();
        }
        totals
    })
}
