/// FER+ emotion classifier using ONNX Runtime via `ort`.
///
/// Takes a 64x64 grayscale face crop and emits logits over the 8-label
/// vocabulary in [`Emotion::ALL`] order.
use std::path::Path;

use crate::classification::domain::emotion::{Emotion, EmotionScores};
use crate::classification::domain::emotion_classifier::EmotionClassifier;
use crate::shared::execution_provider::build_session;
use crate::shared::frame::Frame;

/// Model input resolution.
const INPUT_SIZE: u32 = 64;

/// FER+ classifier backed by an ONNX Runtime session.
pub struct OnnxFerPlusClassifier {
    session: ort::session::Session,
}

impl OnnxFerPlusClassifier {
    /// Load a FER+ ONNX model.
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = build_session(model_path)?;
        Ok(Self { session })
    }
}

impl EmotionClassifier for OnnxFerPlusClassifier {
    fn classify(&mut self, face: &Frame) -> Result<EmotionScores, Box<dyn std::error::Error>> {
        // 1. Preprocess: resize to 64x64 grayscale, raw 0-255 values, NCHW
        let input_tensor = preprocess(face, INPUT_SIZE);

        // 2. Inference
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        if outputs.len() == 0 {
            return Err("emotion model produced no outputs".into());
        }

        // Output: [1, 8] raw logits in vocabulary order
        let raw = outputs[0].try_extract_array::<f32>()?;
        let logits = raw.as_slice().ok_or("Cannot get logit slice")?;
        let logits: &[f32; Emotion::ALL.len()] = logits.try_into().map_err(|_| {
            format!(
                "emotion model expected {} logits, got {}",
                Emotion::ALL.len(),
                logits.len()
            )
        })?;

        // 3. Softmax into probabilities
        Ok(EmotionScores::from_logits(logits))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize crop to `size x size` and convert to grayscale NCHW float32.
///
/// FER+ expects unnormalized intensity in 0-255, single channel.
/// Grayscale uses Rec.601 luma weights.
fn preprocess(face: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = face.as_ndarray();
    let src_h = face.height() as usize;
    let src_w = face.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 1, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            let r = src[[src_y, src_x, 0]] as f32;
            let g = src[[src_y, src_x, 1]] as f32;
            let b = src[[src_y, src_x, 2]] as f32;
            tensor[[0, 0, y, x]] = 0.299 * r + 0.587 * g + 0.114 * b;
        }
    }

    tensor
}
