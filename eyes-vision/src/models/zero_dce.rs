//! Zero-DCE low-light enhancement model

use crate::error::VisionError;
use crate::models::onnx::{load_session, run_single};
use crate::models::LowLightEnhancer;
use crate::utils::image_to_hwc;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ort::session::Session;
use parking_lot::Mutex;
use std::path::Path;
use tracing::debug;

/// Model input edge
const INPUT_SIZE: u32 = 256;
/// Curve iterations encoded in a 24-channel output
const CURVE_ITERATIONS: usize = 8;

/// Zero-DCE enhancer: estimates light-enhancement curves and applies them
pub struct ZeroDceModel {
    session: Mutex<Session>,
}

impl ZeroDceModel {
    pub fn new(model_path: &Path) -> Result<Self, VisionError> {
        let session = load_session(model_path, "Zero-DCE")?;
        Ok(Self { session })
    }
}

impl LowLightEnhancer for ZeroDceModel {
    fn enhance(&self, frame: &RgbImage) -> Result<RgbImage, VisionError> {
        let input = imageops::resize(frame, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
        let tensor = image_to_hwc(&input);

        let side = INPUT_SIZE as usize;
        let (dims, data) = run_single(&self.session, [1, side, side, 3], tensor, "Zero-DCE")?;
        let enhanced = render_output(&input, &dims, &data)?;

        debug!("Zero-DCE enhanced {}x{} frame", frame.width(), frame.height());
        Ok(imageops::resize(&enhanced, frame.width(), frame.height(), FilterType::Lanczos3))
    }
}

/// Shape of a Zero-DCE output tensor
#[derive(Debug, Clone, Copy, PartialEq)]
struct OutputLayout {
    channels: usize,
    height: usize,
    width: usize,
    channels_last: bool,
}

impl OutputLayout {
    fn from_dims(dims: &[i64]) -> Result<Self, VisionError> {
        let bad = || VisionError::Inference(format!("Unexpected Zero-DCE output shape {:?}", dims));
        let is_channels = |d: i64| d == 3 || d == (3 * CURVE_ITERATIONS) as i64;

        let [1, a, b, c] = dims else {
            return Err(bad());
        };
        if [*a, *b, *c].iter().any(|&d| d <= 0) {
            return Err(bad());
        }

        if is_channels(*c) && !is_channels(*a) {
            Ok(Self { channels: *c as usize, height: *a as usize, width: *b as usize, channels_last: true })
        } else if is_channels(*a) {
            Ok(Self { channels: *a as usize, height: *b as usize, width: *c as usize, channels_last: false })
        } else {
            Err(bad())
        }
    }

    fn index(&self, channel: usize, y: usize, x: usize) -> usize {
        if self.channels_last {
            (y * self.width + x) * self.channels + channel
        } else {
            (channel * self.height + y) * self.width + x
        }
    }
}

/// Turn the raw model output into an 8-bit image.
///
/// 24 channels are curve parameters applied to `input` as
/// `x + a * x * (1 - x)` eight times; 3 channels are the enhanced image.
fn render_output(input: &RgbImage, dims: &[i64], data: &[f32]) -> Result<RgbImage, VisionError> {
    let layout = OutputLayout::from_dims(dims)?;
    if data.len() != layout.channels * layout.height * layout.width {
        return Err(VisionError::Inference(format!(
            "Zero-DCE output holds {} values, shape {:?}",
            data.len(),
            dims
        )));
    }

    let (width, height) = (layout.width as u32, layout.height as u32);
    let curves = layout.channels == 3 * CURVE_ITERATIONS;
    if curves && input.dimensions() != (width, height) {
        return Err(VisionError::Inference(format!(
            "Zero-DCE curve map {}x{} does not match input {}x{}",
            width,
            height,
            input.width(),
            input.height()
        )));
    }

    let mut output = RgbImage::new(width, height);
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        let (xi, yi) = (x as usize, y as usize);
        let mut rgb = [0u8; 3];
        for (c, slot) in rgb.iter_mut().enumerate() {
            let value = if curves {
                let mut v = input.get_pixel(x, y)[c] as f32 / 255.0;
                for i in 0..CURVE_ITERATIONS {
                    let a = data[layout.index(i * 3 + c, yi, xi)];
                    v += a * v * (1.0 - v);
                }
                v
            } else {
                data[layout.index(c, yi, xi)]
            };
            *slot = to_u8(value);
        }
        *pixel = Rgb(rgb);
    }

    Ok(output)
}

fn to_u8(value: f32) -> u8 {
    if value.is_finite() {
        (value.clamp(0.0, 1.0) * 255.0).round() as u8
    } else {
        0
    }
}
