use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::{
    fingers::{FINGER_THRESHOLD_RATIO, FingerCounter, MIN_FINGER_THRESHOLD_PX, THUMB_MARGIN_PX},
    pipeline::DetectorConfig,
    selection::CONFIRMATION_HOLD,
};

/// Gesture calculator: hold up 1-4 fingers to pick an operation, then show
/// numbers with hands on each side of the screen.
#[derive(Clone, Debug, Parser)]
#[command(name = "finger-calculator", version, about)]
pub struct Config {
    /// Camera index to open
    #[arg(long, default_value_t = 0)]
    pub camera: u32,

    /// Requested capture width (the camera may negotiate another)
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Requested capture height
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Maximum number of hands detected per frame
    #[arg(long, default_value_t = 20)]
    pub max_hands: usize,

    /// Minimum palm detection confidence
    #[arg(long, default_value_t = 0.5)]
    pub min_detection_confidence: f32,

    /// Minimum hand landmark presence confidence
    #[arg(long, default_value_t = 0.5)]
    pub min_presence_confidence: f32,

    /// Seconds a finger count must be held to select an operation
    #[arg(long, default_value_t = 2.0, value_parser = parse_hold_seconds)]
    pub hold_seconds: f32,

    /// Thumb tip margin past its joint, in pixels
    #[arg(long, default_value_t = THUMB_MARGIN_PX)]
    pub thumb_margin: f32,

    /// Minimum tip-above-joint distance for the other fingers, in pixels
    #[arg(long, default_value_t = MIN_FINGER_THRESHOLD_PX)]
    pub finger_min_threshold: f32,

    /// Fraction of the PIP-MCP distance used as the finger threshold
    #[arg(long, default_value_t = FINGER_THRESHOLD_RATIO)]
    pub finger_threshold_ratio: f32,

    /// Directory holding the ONNX model files
    #[arg(long, default_value = "models")]
    pub model_dir: PathBuf,

    /// Fail instead of downloading missing models
    #[arg(long)]
    pub no_download: bool,

    /// Run without a window; commands are read from stdin
    #[arg(long)]
    pub headless: bool,

    /// Print available cameras and exit
    #[arg(long)]
    pub list_cameras: bool,
}

fn parse_hold_seconds(value: &str) -> Result<f32, String> {
    let seconds: f32 = value.parse().map_err(|err| format!("{err}"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("expected a non-negative number of seconds, got {value}"));
    }
    Duration::try_from_secs_f32(seconds).map_err(|err| err.to_string())?;
    Ok(seconds)
}

impl Config {
    pub fn hold(&self) -> Duration {
        Duration::try_from_secs_f32(self.hold_seconds).unwrap_or(CONFIRMATION_HOLD)
    }

    pub fn finger_counter(&self) -> FingerCounter {
        FingerCounter {
            thumb_margin_px: self.thumb_margin,
            min_threshold_px: self.finger_min_threshold,
            threshold_ratio: self.finger_threshold_ratio,
        }
    }

    pub fn detector(&self) -> DetectorConfig {
        DetectorConfig {
            max_hands: self.max_hands.max(1),
            min_detection_confidence: self.min_detection_confidence,
            min_presence_confidence: self.min_presence_confidence,
        }
    }
}
