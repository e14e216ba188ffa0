use std::{f32::consts::PI, path::Path};

use anyhow::{Context, Result, anyhow};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::Tensor,
};

use super::common::{self, CropTransform, HANDPOSE_INPUT_SIZE, Letterbox, PALM_INPUT_SIZE};
use crate::types::Frame;

const BOX_VALUES: usize = 18;
const PALM_KEYPOINTS: usize = 7;
const PALM_WRIST: usize = 0;
const PALM_MIDDLE_BASE: usize = 2;

// Landmark crop geometry: shift toward the fingers, then enlarge.
const CROP_SHIFT_Y: f32 = -0.4;
const CROP_ENLARGE: f32 = 3.0;

#[derive(Clone, Debug)]
pub struct PalmDetectorConfig {
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub max_palms: usize,
}

impl Default for PalmDetectorConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            nms_threshold: 0.3,
            max_palms: 20,
        }
    }
}

/// A palm candidate in frame pixels.
#[derive(Clone, Debug)]
pub struct PalmRegion {
    /// x1, y1, x2, y2
    pub bbox: [f32; 4],
    pub landmarks: Vec<(f32, f32)>,
    pub score: f32,
}

pub struct PalmDetector {
    session: Session,
    anchors: Vec<(f32, f32)>,
    config: PalmDetectorConfig,
}

impl PalmDetector {
    pub fn new(model_path: &Path, config: PalmDetectorConfig) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("failed to load palm detector from {}", model_path.display())
            })?;

        Ok(Self {
            session,
            anchors: generate_anchors(),
            config,
        })
    }

    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<PalmRegion>> {
        let (input, letterbox) = common::prepare_letterbox(frame)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run palm detector")?;

        let mut boxes = None;
        let mut scores = None;
        for i in 0..outputs.len() {
            let array = outputs[i].try_extract_array::<f32>()?;
            let values: Vec<f32> = array.iter().copied().collect();
            match array.shape().last() {
                Some(&BOX_VALUES) => boxes = Some(values),
                Some(&1) => scores = Some(values),
                _ => {}
            }
        }
        let boxes = boxes.ok_or_else(|| anyhow!("palm detector returned no box output"))?;
        let scores = scores.ok_or_else(|| anyhow!("palm detector returned no score output"))?;

        let candidates = decode_palms(
            &boxes,
            &scores,
            &self.anchors,
            &letterbox,
            self.config.score_threshold,
        )?;
        Ok(non_max_suppression(
            candidates,
            self.config.nms_threshold,
            self.config.max_palms,
        ))
    }
}

/// SSD anchor centers for the 192px palm model: one 24x24 layer with two
/// anchors per cell, then three 12x12 layers merged into six per cell.
pub fn generate_anchors() -> Vec<(f32, f32)> {
    let mut anchors = Vec::with_capacity(2016);
    for (stride, per_cell) in [(8u32, 2usize), (16, 6)] {
        let grid = PALM_INPUT_SIZE / stride;
        for y in 0..grid {
            for x in 0..grid {
                let center = (
                    (x as f32 + 0.5) / grid as f32,
                    (y as f32 + 0.5) / grid as f32,
                );
                anchors.extend(std::iter::repeat_n(center, per_cell));
            }
        }
    }
    anchors
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x.clamp(-100.0, 100.0)).exp())
}

fn decode_palms(
    boxes: &[f32],
    scores: &[f32],
    anchors: &[(f32, f32)],
    letterbox: &Letterbox,
    threshold: f32,
) -> Result<Vec<PalmRegion>> {
    if boxes.len() < anchors.len() * BOX_VALUES || scores.len() < anchors.len() {
        return Err(anyhow!(
            "palm output size mismatch: {} boxes, {} scores for {} anchors",
            boxes.len(),
            scores.len(),
            anchors.len()
        ));
    }

    let size = PALM_INPUT_SIZE as f32;
    let mut regions = Vec::new();

    for (i, &(ax, ay)) in anchors.iter().enumerate() {
        let score = sigmoid(scores[i]);
        if score < threshold {
            continue;
        }

        let raw = &boxes[i * BOX_VALUES..(i + 1) * BOX_VALUES];
        let cx = raw[0] / size + ax;
        let cy = raw[1] / size + ay;
        let w = raw[2] / size;
        let h = raw[3] / size;

        let (x1, y1) = letterbox.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_frame(cx + w / 2.0, cy + h / 2.0);

        let landmarks = (0..PALM_KEYPOINTS)
            .map(|k| {
                let kx = raw[4 + k * 2] / size + ax;
                let ky = raw[5 + k * 2] / size + ay;
                letterbox.to_frame(kx, ky)
            })
            .collect();

        regions.push(PalmRegion {
            bbox: [x1, y1, x2, y2],
            landmarks,
            score,
        });
    }

    Ok(regions)
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let iy = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = ix * iy;
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

/// Greedy NMS, highest score first.
pub fn non_max_suppression(
    mut candidates: Vec<PalmRegion>,
    threshold: f32,
    limit: usize,
) -> Vec<PalmRegion> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<PalmRegion> = Vec::new();
    for candidate in candidates {
        if kept.len() >= limit {
            break;
        }
        if kept.iter().all(|k| iou(&k.bbox, &candidate.bbox) <= threshold) {
            kept.push(candidate);
        }
    }
    kept
}

/// Rotation that brings the wrist-to-middle-finger direction upright.
fn palm_angle(palm: &PalmRegion) -> f32 {
    let (Some(wrist), Some(middle)) = (
        palm.landmarks.get(PALM_WRIST),
        palm.landmarks.get(PALM_MIDDLE_BASE),
    ) else {
        return 0.0;
    };
    let vx = middle.0 - wrist.0;
    let vy = middle.1 - wrist.1;
    if vx.abs() < f32::EPSILON && vy.abs() < f32::EPSILON {
        return 0.0;
    }
    let angle = vx.atan2(-vy);
    angle - 2.0 * PI * ((angle + PI) / (2.0 * PI)).floor()
}

/// Square crop for the landmark estimator around a detected palm.
pub fn crop_from_palm(palm: &PalmRegion) -> CropTransform {
    let angle = palm_angle(palm);
    let origin = (
        (palm.bbox[0] + palm.bbox[2]) * 0.5,
        (palm.bbox[1] + palm.bbox[3]) * 0.5,
    );
    let (sin, cos) = angle.sin_cos();

    // Palm keypoints in hand-aligned coordinates around the box center.
    let aligned: Vec<(f32, f32)> = palm
        .landmarks
        .iter()
        .map(|&(x, y)| {
            let dx = x - origin.0;
            let dy = y - origin.1;
            (dx * cos + dy * sin, -dx * sin + dy * cos)
        })
        .collect();

    let (min_x, max_x, min_y, max_y) = if aligned.is_empty() {
        let hw = (palm.bbox[2] - palm.bbox[0]) * 0.5;
        let hh = (palm.bbox[3] - palm.bbox[1]) * 0.5;
        (-hw, hw, -hh, hh)
    } else {
        aligned
            .iter()
            .fold((f32::MAX, f32::MIN, f32::MAX, f32::MIN), |acc, (x, y)| {
                (acc.0.min(*x), acc.1.max(*x), acc.2.min(*y), acc.3.max(*y))
            })
    };

    let w = (max_x - min_x).max(1.0);
    let h = (max_y - min_y).max(1.0);
    let local = ((min_x + max_x) * 0.5, (min_y + max_y) * 0.5 + CROP_SHIFT_Y * h);

    let center = (
        origin.0 + local.0 * cos - local.1 * sin,
        origin.1 + local.0 * sin + local.1 * cos,
    );

    CropTransform {
        center,
        side: w.max(h) * CROP_ENLARGE,
        angle,
        size: HANDPOSE_INPUT_SIZE,
    }
}
