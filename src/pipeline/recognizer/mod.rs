mod common;
mod ort;
pub(crate) mod palm;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::model_download::{self, ModelAsset};

pub use self::ort::OrtHandDetector;

#[derive(Clone, Debug)]
pub struct DetectorConfig {
    pub max_hands: usize,
    pub min_detection_confidence: f32,
    pub min_presence_confidence: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_hands: 20,
            min_detection_confidence: 0.5,
            min_presence_confidence: 0.5,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RecognizerBackend {
    handpose_estimator_model_path: PathBuf,
    palm_detector_model_path: PathBuf,
}

impl RecognizerBackend {
    pub fn in_dir(model_dir: &Path) -> Self {
        Self {
            handpose_estimator_model_path: model_dir.join(ModelAsset::HandposeEstimator.file_name()),
            palm_detector_model_path: model_dir.join(ModelAsset::PalmDetector.file_name()),
        }
    }

    pub fn backend_label(&self) -> &'static str {
        "ort"
    }

    /// Makes sure both model files exist, fetching them when allowed.
    pub fn ensure_models(&self, allow_download: bool) -> Result<()> {
        model_download::ensure_model_ready(
            ModelAsset::HandposeEstimator,
            &self.handpose_estimator_model_path,
            allow_download,
        )?;
        model_download::ensure_model_ready(
            ModelAsset::PalmDetector,
            &self.palm_detector_model_path,
            allow_download,
        )
    }

    pub fn load(&self, config: &DetectorConfig) -> Result<OrtHandDetector> {
        log::info!("starting handpose backend: {}", self.backend_label());
        OrtHandDetector::new(
            &self.handpose_estimator_model_path,
            &self.palm_detector_model_path,
            config,
        )
    }
}
