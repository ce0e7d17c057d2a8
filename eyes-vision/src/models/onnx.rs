//! Shared ONNX Runtime session handling

use crate::error::{ort_error, VisionError};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use parking_lot::Mutex;
use std::fmt::Display;
use std::path::Path;
use tracing::{debug, info};

/// Open an ONNX model from disk.
///
/// A missing or unreadable file is a [`VisionError::ModelUnavailable`].
pub(crate) fn load_session(model_path: &Path, name: &str) -> Result<Mutex<Session>, VisionError> {
    if !model_path.is_file() {
        return Err(VisionError::ModelUnavailable(format!(
            "{} weights not found at {}",
            name,
            model_path.display()
        )));
    }

    let session = Session::builder()
        .map_err(|e| unavailable(name, "create session builder", e))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| unavailable(name, "configure session", e))?
        .commit_from_file(model_path)
        .map_err(|e| unavailable(name, "load model", e))?;

    info!("{} model loaded from {:?}", name, model_path);
    Ok(Mutex::new(session))
}

fn unavailable(name: &str, step: &str, err: impl Display) -> VisionError {
    VisionError::ModelUnavailable(format!("{}: failed to {}: {}", name, step, err))
}

/// Run a single-input, single-output model and copy the first output out.
///
/// Returns the output shape and its values in row-major order.
pub(crate) fn run_single(
    session: &Mutex<Session>,
    shape: [usize; 4],
    data: Vec<f32>,
    name: &str,
) -> Result<(Vec<i64>, Vec<f32>), VisionError> {
    let input = Tensor::from_array((shape, data))
        .map_err(|e| ort_error(&format!("Failed to create {} input", name), e))?;

    let mut session = session.lock();
    let outputs = session
        .run(ort::inputs![input])
        .map_err(|e| ort_error(&format!("{} inference failed", name), e))?;

    if outputs.len() == 0 {
        return Err(VisionError::Inference(format!("{} produced no outputs", name)));
    }

    let (out_shape, values) = outputs[0]
        .try_extract_tensor::<f32>()
        .map_err(|e| ort_error(&format!("Failed to extract {} output", name), e))?;

    let dims: Vec<i64> = out_shape.iter().copied().collect();
    debug!("{} output shape: {:?}", name, dims);

    Ok((dims, values.to_vec()))
}
