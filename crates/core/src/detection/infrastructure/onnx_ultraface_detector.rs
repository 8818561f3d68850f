/// UltraFace face detector using ONNX Runtime via `ort`.
///
/// The RFB-320 variant: a small, CPU-friendly detector that emits
/// per-prior class scores and already-decoded corner boxes, so no
/// anchor bookkeeping is needed on this side.
use std::path::Path;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::execution_provider::build_session;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Model input resolution (width x height).
const INPUT_WIDTH: u32 = 320;
const INPUT_HEIGHT: u32 = 240;

/// Default confidence threshold.
pub const DEFAULT_CONFIDENCE: f32 = 0.7;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f32 = 0.3;

/// UltraFace detector backed by an ONNX Runtime session.
pub struct OnnxUltrafaceDetector {
    session: ort::session::Session,
    confidence: f32,
}

impl OnnxUltrafaceDetector {
    /// Load an UltraFace ONNX model.
    pub fn new(model_path: &Path, confidence: f32) -> Result<Self, Box<dyn std::error::Error>> {
        let session = build_session(model_path)?;
        Ok(Self {
            session,
            confidence,
        })
    }
}

impl FaceDetector for OnnxUltrafaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceRegion>, Box<dyn std::error::Error>> {
        let fw = frame.width();
        let fh = frame.height();

        // 1. Preprocess: resize to 320x240, normalize (x-127)/128, NCHW
        let input_tensor = preprocess(frame, INPUT_WIDTH, INPUT_HEIGHT);

        // 2. Inference
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // UltraFace outputs two tensors:
        // - scores: [1, N, 2] (background, face probabilities, already softmaxed)
        // - boxes:  [1, N, 4] (x1, y1, x2, y2, normalized to [0,1])
        if outputs.len() < 2 {
            return Err(
                format!("UltraFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }

        let scores = outputs[0].try_extract_array::<f32>()?;
        let boxes = outputs[1].try_extract_array::<f32>()?;
        let score_data = scores.as_slice().ok_or("Cannot get score slice")?;
        let box_data = boxes.as_slice().ok_or("Cannot get box slice")?;

        // 3. Threshold on face probability, scale to frame coordinates
        let mut raw_dets = decode(score_data, box_data, self.confidence, fw, fh);

        // 4. NMS, then build regions
        let kept = nms(&mut raw_dets, NMS_IOU_THRESH);
        Ok(kept.iter().map(|d| d.to_region(fw, fh)).collect())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize frame to `width x height` and normalize to (x-127)/128 NCHW float32.
fn preprocess(frame: &Frame, width: u32, height: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let w = width as usize;
    let h = height as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, h, w));

    for y in 0..h {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / h as f64) as usize).min(src_h - 1);
        for x in 0..w {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / w as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (src[[src_y, src_x, c]] as f32 - 127.0) / 128.0;
            }
        }
    }

    tensor
}

// ---------------------------------------------------------------------------
// Decoding + NMS
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDet {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
}

impl RawDet {
    fn to_region(&self, fw: u32, fh: u32) -> FaceRegion {
        // x1/y1 are already clamped to >= 0 during decoding
        let x = self.x1 as i32;
        let y = self.y1 as i32;
        let w = ((self.x2 - self.x1) as i32).min(fw as i32 - x);
        let h = ((self.y2 - self.y1) as i32).min(fh as i32 - y);
        FaceRegion::new(x, y, w, h, self.score)
    }
}

/// Turn model output slices into frame-coordinate detections above the
/// confidence threshold. Scores are `[background, face]` pairs per prior.
fn decode(score_data: &[f32], box_data: &[f32], confidence: f32, fw: u32, fh: u32) -> Vec<RawDet> {
    let num_priors = score_data.len() / 2;
    let mut dets = Vec::new();

    for i in 0..num_priors {
        let score = score_data[i * 2 + 1];
        if score < confidence {
            continue;
        }

        let off = i * 4;
        if off + 4 > box_data.len() {
            break;
        }

        let x1 = (box_data[off] * fw as f32).max(0.0);
        let y1 = (box_data[off + 1] * fh as f32).max(0.0);
        let x2 = (box_data[off + 2] * fw as f32).min(fw as f32);
        let y2 = (box_data[off + 3] * fh as f32).min(fh as f32);
        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        dets.push(RawDet {
            x1,
            y1,
            x2,
            y2,
            score,
        });
    }

    dets
}

fn nms(dets: &mut [RawDet], iou_thresh: f32) -> Vec<RawDet> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if suppressed[j] {
                continue;
            }
            if bbox_iou(&dets[i], &dets[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn bbox_iou(a: &RawDet, b: &RawDet) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
