//! Utility functions for vision processing

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Gray used by the YOLO exporters for letterbox padding
pub const LETTERBOX_FILL: u8 = 114;

/// Convert an RGB image into a planar `[3, H, W]` float tensor.
///
/// Pixels are scaled to [0, 1] and then normalized per channel with
/// `(x - mean) / std`.
pub fn image_to_chw(image: &RgbImage, mean: [f32; 3], std: [f32; 3]) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let plane = (width as usize) * (height as usize);
    let mut tensor = vec![0.0f32; plane * 3];

    for (x, y, pixel) in image.enumerate_pixels() {
        let offset = (y as usize) * (width as usize) + x as usize;
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            tensor[c * plane + offset] = (value - mean[c]) / std[c];
        }
    }

    tensor
}

/// Convert an RGB image into an interleaved `[H, W, 3]` tensor in [0, 1].
pub fn image_to_hwc(image: &RgbImage) -> Vec<f32> {
    image
        .as_raw()
        .iter()
        .map(|&v| v as f32 / 255.0)
        .collect()
}

/// Mapping between frame pixels and a letterboxed square model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    /// Map a point from model-input space back into frame space.
    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Resize `image` to fit a `size` x `size` square, preserving aspect ratio,
/// and pad the remainder with [`LETTERBOX_FILL`].
pub fn letterbox(image: &RgbImage, size: u32) -> (RgbImage, Letterbox) {
    let (width, height) = image.dimensions();
    let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
    let new_w = ((width as f32 * scale).round() as u32).clamp(1, size);
    let new_h = ((height as f32 * scale).round() as u32).clamp(1, size);

    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([LETTERBOX_FILL; 3]));
    let pad_x = (size - new_w) / 2;
    let pad_y = (size - new_h) / 2;
    imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);

    (
        canvas,
        Letterbox {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
        },
    )
}

/// Mean ITU-R BT.601 luma of the frame, normalized to [0, 1].
pub fn mean_luminance(image: &RgbImage) -> f32 {
    let pixels = image.pixels().len();
    if pixels == 0 {
        return 0.0;
    }

    let total: u64 = image
        .pixels()
        .map(|p| 299 * p[0] as u64 + 587 * p[1] as u64 + 114 * p[2] as u64)
        .sum();

    (total as f64 / (1000.0 * 255.0 * pixels as f64)) as f32
}

/// Median of the finite values; the two middle values are averaged for even
/// counts.
pub fn median(values: &[f32]) -> Option<f32> {
    let mut finite: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }

    finite.sort_by(|a, b| a.total_cmp(b));
    let mid = finite.len() / 2;
    if finite.len() % 2 == 0 {
        Some((finite[mid - 1] + finite[mid]) / 2.0)
    } else {
        Some(finite[mid])
    }
}

/// Round to `decimals` places, half away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_to_chw_layout() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, Rgb([255, 0, 0]));
        image.put_pixel(1, 0, Rgb([0, 255, 51]));

        let tensor = image_to_chw(&image, [0.0; 3], [1.0; 3]);
        assert_eq!(tensor.len(), 6);
        // R plane, G plane, B plane
        assert_eq!(&tensor[0..2], &[1.0, 0.0]);
        assert_eq!(&tensor[2..4], &[0.0, 1.0]);
        assert!((tensor[5] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_image_to_chw_normalizes() {
        let image = RgbImage::from_pixel(1, 1, Rgb([255, 255, 255]));
        let tensor = image_to_chw(&image, [0.5; 3], [0.5; 3]);
        assert!(tensor.iter().all(|v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_image_to_hwc_is_interleaved() {
        let image = RgbImage::from_pixel(2, 2, Rgb([0, 255, 0]));
        let tensor = image_to_hwc(&image);
        assert_eq!(tensor.len(), 12);
        assert_eq!(&tensor[0..3], &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_letterbox_wide_frame() {
        let image = RgbImage::from_pixel(1280, 640, Rgb([10, 20, 30]));
        let (boxed, lb) = letterbox(&image, 640);

        assert_eq!(boxed.dimensions(), (640, 640));
        assert_eq!(lb.scale, 0.5);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 160.0);
        assert_eq!(boxed.get_pixel(0, 0), &Rgb([LETTERBOX_FILL; 3]));
        assert_eq!(boxed.get_pixel(320, 320), &Rgb([10, 20, 30]));

        let (x, y) = lb.to_frame(320.0, 480.0);
        assert_eq!((x, y), (640.0, 640.0));
    }

    #[test]
    fn test_letterbox_identity_for_square_input() {
        let image = RgbImage::from_pixel(640, 640, Rgb([1, 2, 3]));
        let (_, lb) = letterbox(&image, 640);
        assert_eq!(lb, Letterbox { scale: 1.0, pad_x: 0.0, pad_y: 0.0 });
        assert_eq!(lb.to_frame(100.0, 200.0), (100.0, 200.0));
    }

    #[test]
    fn test_mean_luminance() {
        assert_eq!(mean_luminance(&RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]))), 0.0);
        let white = mean_luminance(&RgbImage::from_pixel(4, 4, Rgb([255, 255, 255])));
        assert!((white - 1.0).abs() < 1e-6);

        let gray = mean_luminance(&RgbImage::from_pixel(4, 4, Rgb([51, 51, 51])));
        assert!((gray - 0.2).abs() < 1e-6);

        // Green dominates perceived brightness
        let green = mean_luminance(&RgbImage::from_pixel(1, 1, Rgb([0, 255, 0])));
        let blue = mean_luminance(&RgbImage::from_pixel(1, 1, Rgb([0, 0, 255])));
        assert!(green > blue);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[f32::NAN, 5.0]), Some(5.0));
        assert_eq!(median(&[f32::NAN, f32::INFINITY]), None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(2.499_999, 2), 2.5);
        assert_eq!(round_to(0.123_456, 3), 0.123);
        assert_eq!(round_to(1.005_1, 1), 1.0);
    }
}
