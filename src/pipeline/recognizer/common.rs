use anyhow::{Context, Result, anyhow};
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use ndarray::Array4;
use rayon::prelude::*;

use crate::types::{Frame, LANDMARK_COUNT};

pub const PALM_INPUT_SIZE: u32 = 192;
pub const HANDPOSE_INPUT_SIZE: u32 = 224;

/// Maps the palm detector's square input back to frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub ratio: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    /// `nx`, `ny` are normalized to the model input.
    pub fn to_frame(&self, nx: f32, ny: f32) -> (f32, f32) {
        let size = PALM_INPUT_SIZE as f32;
        (
            (nx * size - self.pad_x) / self.ratio,
            (ny * size - self.pad_y) / self.ratio,
        )
    }
}

/// Resizes the frame to fit the palm detector input, centered on black.
pub fn prepare_letterbox(frame: &Frame) -> Result<(Array4<f32>, Letterbox)> {
    if frame.width == 0 || frame.height == 0 {
        return Err(anyhow!("empty frame"));
    }

    let size = PALM_INPUT_SIZE;
    let ratio = (size as f32 / frame.width as f32).min(size as f32 / frame.height as f32);
    let scaled_w = ((frame.width as f32 * ratio) as u32).clamp(1, size);
    let scaled_h = ((frame.height as f32 * ratio) as u32).clamp(1, size);

    let src = ImageRef::new(frame.width, frame.height, &frame.rgba, PixelType::U8x4)
        .context("frame buffer does not match its dimensions")?;
    let mut dst = Image::new(scaled_w, scaled_h, PixelType::U8x4);
    Resizer::new()
        .resize(
            &src,
            &mut dst,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )
        .context("failed to resize frame for palm detection")?;

    let pad_x = (size - scaled_w) / 2;
    let pad_y = (size - scaled_h) / 2;
    let side = size as usize;
    let scaled = dst.buffer();

    let mut data = vec![0f32; side * side * 3];
    data.par_chunks_mut(side * 3)
        .enumerate()
        .for_each(|(y, row)| {
            let Some(sy) = (y as u32).checked_sub(pad_y).filter(|sy| *sy < scaled_h) else {
                return;
            };
            for sx in 0..scaled_w {
                let src_idx = ((sy * scaled_w + sx) * 4) as usize;
                let dst_idx = ((sx + pad_x) * 3) as usize;
                for c in 0..3 {
                    row[dst_idx + c] = scaled[src_idx + c] as f32 / 255.0;
                }
            }
        });

    let input = Array4::from_shape_vec((1, side, side, 3), data)?;
    Ok((
        input,
        Letterbox {
            ratio,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
        },
    ))
}

/// Square, rotated region of the frame fed to the landmark estimator.
/// `angle` rotates crop axes onto frame axes; 0 means fingers point up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropTransform {
    pub center: (f32, f32),
    pub side: f32,
    pub angle: f32,
    pub size: u32,
}

impl CropTransform {
    pub fn scale(&self) -> f32 {
        self.side / self.size as f32
    }

    /// Crop pixel coordinates to frame pixel coordinates.
    pub fn to_frame(&self, u: f32, v: f32) -> (f32, f32) {
        let half = self.size as f32 / 2.0;
        let lx = (u - half) * self.scale();
        let ly = (v - half) * self.scale();
        let (sin, cos) = self.angle.sin_cos();
        (
            self.center.0 + lx * cos - ly * sin,
            self.center.1 + lx * sin + ly * cos,
        )
    }
}

pub fn prepare_rotated_crop(frame: &Frame, transform: &CropTransform) -> Result<Array4<f32>> {
    let size = transform.size as usize;
    let mut data = vec![0f32; size * size * 3];

    data.par_chunks_mut(size * 3)
        .enumerate()
        .for_each(|(v, row)| {
            for u in 0..size {
                let (x, y) = transform.to_frame(u as f32 + 0.5, v as f32 + 0.5);
                let rgb = sample_bilinear(frame, x - 0.5, y - 0.5);
                for c in 0..3 {
                    row[u * 3 + c] = rgb[c] / 255.0;
                }
            }
        });

    Ok(Array4::from_shape_vec((1, size, size, 3), data)?)
}

// Out-of-frame samples read as black.
fn sample_bilinear(frame: &Frame, x: f32, y: f32) -> [f32; 3] {
    let w = frame.width as i64;
    let h = frame.height as i64;
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let pixel = |px: i64, py: i64| -> [f32; 3] {
        if px < 0 || py < 0 || px >= w || py >= h {
            return [0.0; 3];
        }
        let idx = ((py * w + px) * 4) as usize;
        match frame.rgba.get(idx..idx + 3) {
            Some(p) => [p[0] as f32, p[1] as f32, p[2] as f32],
            None => [0.0; 3],
        }
    };

    let p00 = pixel(x0, y0);
    let p10 = pixel(x0 + 1, y0);
    let p01 = pixel(x0, y0 + 1);
    let p11 = pixel(x0 + 1, y0 + 1);

    let mut out = [0.0; 3];
    for c in 0..3 {
        let top = p00[c] * (1.0 - fx) + p10[c] * fx;
        let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
        out[c] = top * (1.0 - fy) + bottom * fy;
    }
    out
}

/// Splits the estimator's flat output into (x, y, z) triples in crop pixels.
pub fn decode_landmarks(flat: &[f32]) -> Result<Vec<[f32; 3]>> {
    if flat.len() < LANDMARK_COUNT * 3 {
        return Err(anyhow!(
            "expected at least {} landmark values, got {}",
            LANDMARK_COUNT * 3,
            flat.len()
        ));
    }

    Ok(flat
        .chunks_exact(3)
        .take(LANDMARK_COUNT)
        .map(|c| [c[0], c[1], c[2]])
        .collect())
}

/// Projects crop-space landmarks into frame pixels; z is scaled alongside.
pub fn project_landmarks_with_transform(
    landmarks: &[[f32; 3]],
    transform: &CropTransform,
) -> Vec<[f32; 3]> {
    landmarks
        .iter()
        .map(|[u, v, z]| {
            let (x, y) = transform.to_frame(*u, *v);
            [x, y, z * transform.scale()]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let rgba = (0..width * height)
            .flat_map(|_| [rgb[0], rgb[1], rgb[2], 255])
            .collect();
        Frame {
            rgba,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn crop_center_maps_to_transform_center() {
        let transform = CropTransform {
            center: (400.0, 300.0),
            side: 200.0,
            angle: 0.7,
            size: HANDPOSE_INPUT_SIZE,
        };
        let (x, y) = transform.to_frame(112.0, 112.0);
        assert!((x - 400.0).abs() < 1e-3 && (y - 300.0).abs() < 1e-3);
    }

    #[test]
    fn quarter_turn_maps_crop_up_to_frame_right() {
        let transform = CropTransform {
            center: (0.0, 0.0),
            side: 224.0,
            angle: std::f32::consts::FRAC_PI_2,
            size: HANDPOSE_INPUT_SIZE,
        };
        // Top-center of the crop.
        let (x, y) = transform.to_frame(112.0, 0.0);
        assert!((x - 112.0).abs() < 1e-3, "x = {x}");
        assert!(y.abs() < 1e-3, "y = {y}");
    }

    #[test]
    fn letterbox_pads_vertically_for_wide_frames() {
        let frame = frame(1280, 720, [255, 0, 0]);
        let (input, letterbox) = prepare_letterbox(&frame).unwrap();

        assert_eq!(input.shape(), &[1, 192, 192, 3]);
        assert_eq!(letterbox.pad_x, 0.0);
        assert!(letterbox.pad_y > 0.0);
        // Padding is black, content is red.
        assert_eq!(input[[0, 0, 96, 0]], 0.0);
        assert!(input[[0, 96, 96, 0]] > 0.9);

        let (x, y) = letterbox.to_frame(0.5, 0.5);
        assert!((x - 640.0).abs() < 5.0, "x = {x}");
        assert!((y - 360.0).abs() < 5.0, "y = {y}");
    }

    #[test]
    fn rotated_crop_outside_frame_is_black() {
        let frame = frame(64, 64, [200, 200, 200]);
        let transform = CropTransform {
            center: (32.0, 32.0),
            side: 256.0,
            angle: 0.0,
            size: 32,
        };
        let input = prepare_rotated_crop(&frame, &transform).unwrap();
        assert_eq!(input[[0, 0, 0, 0]], 0.0);
        assert!((input[[0, 16, 16, 1]] - 200.0 / 255.0).abs() < 1e-3);
    }

    #[test]
    fn short_landmark_output_is_rejected() {
        assert!(decode_landmarks(&[0.0; 10]).is_err());
        assert_eq!(decode_landmarks(&[1.0; 63]).unwrap().len(), 21);
    }
}
