use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::Tensor,
};

use super::{
    DetectorConfig,
    common::{self, CropTransform},
    palm::{PalmDetector, PalmDetectorConfig, crop_from_palm},
};
use crate::{
    session::HandDetector,
    types::{DetectedHand, Frame, Handedness, LANDMARK_COUNT, Landmark},
};

/// Palm detection followed by one landmark pass per palm.
pub struct OrtHandDetector {
    handpose: Session,
    palm_detector: PalmDetector,
    min_presence_confidence: f32,
}

struct Estimate {
    points: Vec<[f32; 3]>,
    confidence: f32,
    handedness: f32,
}

impl OrtHandDetector {
    pub fn new(
        handpose_model_path: &Path,
        palm_detector_model_path: &Path,
        config: &DetectorConfig,
    ) -> Result<Self> {
        let handpose = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(handpose_model_path)
            .with_context(|| {
                format!(
                    "failed to load ORT session from {}",
                    handpose_model_path.display()
                )
            })?;

        let palm_detector = PalmDetector::new(
            palm_detector_model_path,
            PalmDetectorConfig {
                score_threshold: config.min_detection_confidence,
                max_palms: config.max_hands,
                ..PalmDetectorConfig::default()
            },
        )?;

        log::info!(
            "handpose ORT backend ready using {} and palm detector {}",
            handpose_model_path.display(),
            palm_detector_model_path.display()
        );

        Ok(Self {
            handpose,
            palm_detector,
            min_presence_confidence: config.min_presence_confidence,
        })
    }

    fn estimate(&mut self, frame: &Frame, transform: &CropTransform) -> Result<Estimate> {
        let input = common::prepare_rotated_crop(frame, transform)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .handpose
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        if outputs.len() < 1 {
            return Err(anyhow!("model returned no outputs"));
        }

        let coords = outputs[0].try_extract_array::<f32>()?;
        let flattened: Vec<f32> = coords.iter().copied().collect();
        let landmarks = common::decode_landmarks(&flattened)?;

        let scalar = |idx: usize| -> f32 {
            if outputs.len() > idx {
                outputs[idx]
                    .try_extract_array::<f32>()
                    .ok()
                    .and_then(|arr| arr.iter().next().copied())
                    .unwrap_or(0.0)
            } else {
                0.0
            }
        };

        Ok(Estimate {
            points: common::project_landmarks_with_transform(&landmarks, transform),
            confidence: scalar(1).clamp(0.0, 1.0),
            handedness: scalar(2),
        })
    }
}

impl HandDetector for OrtHandDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedHand>> {
        let palms = self.palm_detector.detect(frame)?;
        let mut hands = Vec::with_capacity(palms.len());

        for palm in &palms {
            let transform = crop_from_palm(palm);
            let estimate = match self.estimate(frame, &transform) {
                Ok(estimate) => estimate,
                Err(err) => {
                    log::warn!("handpose inference failed: {err:?}");
                    continue;
                }
            };

            if estimate.confidence < self.min_presence_confidence {
                log::trace!(
                    "dropping hand with presence {:.2} (palm {:.2})",
                    estimate.confidence,
                    palm.score
                );
                continue;
            }

            if let Some(hand) = to_detected_hand(&estimate, frame) {
                hands.push(hand);
            }
        }

        Ok(hands)
    }
}

fn to_detected_hand(estimate: &Estimate, frame: &Frame) -> Option<DetectedHand> {
    if estimate.points.len() < LANDMARK_COUNT {
        return None;
    }

    let width = frame.width.max(1) as f32;
    let height = frame.height.max(1) as f32;
    let mut landmarks = [Landmark::default(); LANDMARK_COUNT];
    for (slot, [x, y, z]) in landmarks.iter_mut().zip(estimate.points.iter()) {
        *slot = Landmark::new(x / width, y / height, z / width);
    }

    Some(DetectedHand {
        landmarks,
        handedness: Handedness::from_score(estimate.handedness),
        score: estimate.confidence,
    })
}
