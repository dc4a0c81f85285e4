use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{HandDetector, MIN_CONFIDENCE};
use crate::types::{Frame, HandDetection};

/// MediaPipe handpose estimation model behind ONNX Runtime. Outputs: landmark
/// coordinates, a hand-presence confidence, and a handedness score (the last
/// is unused here; the classifier applies its own geometric heuristic).
pub struct OrtHandDetector {
    session: Session,
}

impl OrtHandDetector {
    pub fn load(model_path: &Path) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ORT session from {}", model_path.display()))?;

        log::info!("handpose detector ready using {}", model_path.display());
        Ok(Self { session })
    }
}

impl HandDetector for OrtHandDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<HandDetection>> {
        let (input, letterbox) = super::prepare_frame(frame)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        if outputs.len() < 1 {
            return Err(anyhow!("model returned no outputs"));
        }

        let coords = outputs[0].try_extract_array::<f32>()?;
        let flattened: Vec<f32> = coords.iter().copied().collect();
        let landmarks = super::decode_landmarks(&flattened)?;

        let confidence = if outputs.len() > 1 {
            outputs[1]
                .try_extract_array::<f32>()
                .ok()
                .and_then(|arr| arr.iter().next().copied())
                .unwrap_or(0.0)
                .clamp(0.0, 1.0)
        } else {
            0.0
        };

        if confidence < MIN_CONFIDENCE {
            return Ok(None);
        }

        let projected = super::project_landmarks(&landmarks, &letterbox);

        Ok(Some(HandDetection {
            landmarks: super::normalize_landmarks(&landmarks),
            projected,
            confidence,
        }))
    }
}
