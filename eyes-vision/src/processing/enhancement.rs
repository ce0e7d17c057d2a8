//! Low-light enhancement gate

use crate::models::LowLightEnhancer;
use crate::utils::mean_luminance;
use image::RgbImage;
use tracing::{debug, warn};

/// Frame that continues down the pipeline
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub frame: RgbImage,
    /// True only when the enhancer ran and its output was kept
    pub enhanced: bool,
    /// Mean normalized luminance of the input frame
    pub brightness: f32,
}

/// Run `enhancer` on frames darker than `threshold`.
///
/// Enhancer failures never abort the request: the original frame is passed
/// on with `enhanced = false`.
pub fn apply_gate(frame: RgbImage, enhancer: &dyn LowLightEnhancer, threshold: f32) -> GateOutcome {
    let brightness = mean_luminance(&frame);
    if brightness >= threshold {
        debug!("Frame brightness {:.3}, enhancement skipped", brightness);
        return GateOutcome {
            frame,
            enhanced: false,
            brightness,
        };
    }

    match enhancer.enhance(&frame) {
        Ok(enhanced) if enhanced.dimensions() == frame.dimensions() => {
            debug!("Frame brightness {:.3}, low-light enhancement applied", brightness);
            GateOutcome {
                frame: enhanced,
                enhanced: true,
                brightness,
            }
        }
        Ok(enhanced) => {
            warn!(
                "Enhancer returned {:?} for a {:?} frame, using original",
                enhanced.dimensions(),
                frame.dimensions()
            );
            GateOutcome {
                frame,
                enhanced: false,
                brightness,
            }
        }
        Err(e) => {
            warn!("Low-light enhancement failed, using original frame: {}", e);
            GateOutcome {
                frame,
                enhanced: false,
                brightness,
            }
        }
    }
}
