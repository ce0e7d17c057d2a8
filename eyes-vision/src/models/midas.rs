//! MiDaS monocular depth model

use crate::depth::DepthMap;
use crate::error::VisionError;
use crate::models::onnx::{load_session, run_single};
use crate::models::DepthEstimator;
use crate::utils::image_to_chw;
use eyes_core::MidasVariant;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ort::session::Session;
use parking_lot::Mutex;
use std::path::Path;
use tracing::debug;

/// MiDaS depth estimator; emits relative inverse depth
pub struct MidasModel {
    session: Mutex<Session>,
    variant: MidasVariant,
}

impl MidasModel {
    pub fn new(model_path: &Path, variant: MidasVariant) -> Result<Self, VisionError> {
        let session = load_session(model_path, &format!("MiDaS ({})", variant))?;
        Ok(Self { session, variant })
    }
}

impl DepthEstimator for MidasModel {
    fn estimate(&self, frame: &RgbImage) -> Result<DepthMap, VisionError> {
        let size = self.variant.input_size();
        let (mean, std) = self.variant.normalization();

        let resized = imageops::resize(frame, size, size, FilterType::CatmullRom);
        let input = image_to_chw(&resized, mean, std);

        let side = size as usize;
        let (dims, data) = run_single(&self.session, [1, 3, side, side], input, "MiDaS")?;
        let (width, height) = depth_grid_shape(&dims)?;

        debug!("MiDaS depth grid {}x{}", width, height);
        DepthMap::new(width, height, data, frame.width(), frame.height())
    }
}

/// Accepts `[1, H, W]` and `[1, 1, H, W]`; returns `(W, H)`.
fn depth_grid_shape(dims: &[i64]) -> Result<(usize, usize), VisionError> {
    let spatial = match dims {
        [1, h, w] => (*w, *h),
        [1, 1, h, w] => (*w, *h),
        _ => {
            return Err(VisionError::Inference(format!(
                "Unexpected MiDaS output shape {:?}",
                dims
            )))
        }
    };

    if spatial.0 <= 0 || spatial.1 <= 0 {
        return Err(VisionError::Inference(format!("Empty MiDaS output {:?}", dims)));
    }

    Ok((spatial.0 as usize, spatial.1 as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_grid_shape() {
        assert_eq!(depth_grid_shape(&[1, 256, 256]).unwrap(), (256, 256));
        assert_eq!(depth_grid_shape(&[1, 1, 384, 384]).unwrap(), (384, 384));
        assert_eq!(depth_grid_shape(&[1, 192, 256]).unwrap(), (256, 192));
    }

    #[test]
    fn test_depth_grid_shape_rejects_unknown_layouts() {
        assert!(depth_grid_shape(&[2, 256, 256]).is_err());
        assert!(depth_grid_shape(&[1, 3, 256, 256]).is_err());
        assert!(depth_grid_shape(&[1, 0, 256]).is_err());
        assert!(depth_grid_shape(&[256, 256]).is_err());
    }

    #[test]
    fn test_missing_weights_are_unavailable() {
        let err = MidasModel::new(Path::new("/nonexistent/midas.onnx"), MidasVariant::Small)
            .err()
            .unwrap();
        assert!(matches!(err, VisionError::ModelUnavailable(_)));
    }
}
