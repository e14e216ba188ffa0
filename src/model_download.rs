use std::{
    fs::{self, File},
    io::{self, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelAsset {
    PalmDetector,
    HandposeEstimator,
}

impl ModelAsset {
    pub fn file_name(&self) -> &'static str {
        match self {
            ModelAsset::PalmDetector => "palm_detection_mediapipe_2023feb.onnx",
            ModelAsset::HandposeEstimator => "handpose_estimation_mediapipe_2023feb.onnx",
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            ModelAsset::PalmDetector => {
                "https://media.githubusercontent.com/media/opencv/opencv_zoo/main/models/palm_detection_mediapipe/palm_detection_mediapipe_2023feb.onnx"
            }
            ModelAsset::HandposeEstimator => {
                "https://media.githubusercontent.com/media/opencv/opencv_zoo/main/models/handpose_estimation_mediapipe/handpose_estimation_mediapipe_2023feb.onnx"
            }
        }
    }
}

/// Returns once `path` holds the asset. Downloads it when missing and
/// `allow_download` is set; otherwise a missing file is an error.
pub fn ensure_model_ready(asset: ModelAsset, path: &Path, allow_download: bool) -> Result<()> {
    if path.is_file() {
        log::debug!("using model {}", path.display());
        return Ok(());
    }

    if !allow_download {
        bail!(
            "model {} not found and downloads are disabled (fetch it from {})",
            path.display(),
            asset.url()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    log::info!("downloading {} ...", asset.file_name());
    download(asset.url(), path)
        .with_context(|| format!("failed to download {} from {}", asset.file_name(), asset.url()))?;
    log::info!("model saved to {}", path.display());
    Ok(())
}

fn download(url: &str, dest: &Path) -> Result<()> {
    let mut response = reqwest::blocking::get(url)?.error_for_status()?;

    let progress = match response.content_length() {
        Some(len) => {
            let bar = ProgressBar::new(len);
            bar.set_style(
                ProgressStyle::with_template(
                    "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                )?
                .progress_chars("=> "),
            );
            bar
        }
        None => ProgressBar::new_spinner(),
    };
    progress.set_message(
        dest.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );

    // Write to a sibling file so an interrupted download never looks complete.
    let partial = dest.with_extension("part");
    let outcome = File::create(&partial)
        .with_context(|| format!("failed to create {}", partial.display()))
        .and_then(|file| copy_with_progress(&mut response, file, &progress))
        .and_then(|()| {
            fs::rename(&partial, dest)
                .with_context(|| format!("failed to move model into {}", dest.display()))
        });

    progress.finish_and_clear();
    if outcome.is_err() && partial.exists() {
        if let Err(err) = fs::remove_file(&partial) {
            log::warn!("failed to remove {}: {err}", partial.display());
        }
    }
    outcome
}

fn copy_with_progress<R: Read, W: Write>(
    reader: &mut R,
    mut writer: W,
    progress: &ProgressBar,
) -> Result<()> {
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err).context("download interrupted"),
        };
        writer.write_all(&buf[..read]).context("failed to write model data")?;
        progress.inc(read as u64);
    }
    writer.flush()?;
    Ok(())
}
