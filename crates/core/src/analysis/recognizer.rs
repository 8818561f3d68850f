use crate::analysis::error::RecognizerError;
use crate::analysis::result::{FaceEmotion, FrameAnalysis};
use crate::classification::domain::emotion_classifier::EmotionClassifier;
use crate::classification::infrastructure::onnx_ferplus_classifier::OnnxFerPlusClassifier;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::onnx_ultraface_detector::{
    OnnxUltrafaceDetector, DEFAULT_CONFIDENCE,
};
use crate::shared::frame::Frame;
use crate::shared::model_resolver;
use crate::shared::region::FaceRegion;

/// Façade over face detection and emotion classification.
///
/// Two states: unconfigured and configured. [`configure`] resolves and
/// loads both models; until it succeeds, [`analyze`] fails with
/// [`RecognizerError::NotConfigured`]. Reconfiguring replaces the
/// previous engine, last write wins; the old model sessions are
/// released when the engine they belong to is dropped.
///
/// `analyze` takes `&mut self`, so for a single owner the borrow
/// checker already serializes analysis against reconfiguration. The
/// recognizer is `Send`; wrap it in a mutex to share across threads.
///
/// [`configure`]: EmotionRecognizer::configure
/// [`analyze`]: EmotionRecognizer::analyze
pub struct EmotionRecognizer {
    engine: Option<Engine>,
}

struct Engine {
    detector: Box<dyn FaceDetector>,
    classifier: Box<dyn EmotionClassifier>,
}

impl EmotionRecognizer {
    pub fn new() -> Self {
        Self { engine: None }
    }

    /// Load the ONNX engine from two model identifiers (file paths or
    /// known model names, see [`model_resolver::resolve`]).
    ///
    /// On failure the recognizer keeps whatever configuration it had
    /// before the call.
    pub fn configure(
        &mut self,
        face_model: &str,
        emotion_model: &str,
    ) -> Result<(), RecognizerError> {
        let face_path = model_resolver::resolve(face_model, None, None)
            .map_err(|e| RecognizerError::configuration(face_model, e))?;
        let emotion_path = model_resolver::resolve(emotion_model, None, None)
            .map_err(|e| RecognizerError::configuration(emotion_model, e))?;

        let detector = OnnxUltrafaceDetector::new(&face_path, DEFAULT_CONFIDENCE)
            .map_err(|e| RecognizerError::configuration(face_model, e))?;
        let classifier = OnnxFerPlusClassifier::new(&emotion_path)
            .map_err(|e| RecognizerError::configuration(emotion_model, e))?;

        log::info!("configured analyzer: face={face_model} emotion={emotion_model}");
        self.engine = Some(Engine {
            detector: Box::new(detector),
            classifier: Box::new(classifier),
        });
        Ok(())
    }

    /// Install an already-built detector/classifier pair.
    ///
    /// The seam for test doubles and alternative inference backends;
    /// state semantics are identical to [`configure`].
    ///
    /// [`configure`]: EmotionRecognizer::configure
    pub fn configure_with(
        &mut self,
        detector: Box<dyn FaceDetector>,
        classifier: Box<dyn EmotionClassifier>,
    ) {
        self.engine = Some(Engine {
            detector,
            classifier,
        });
    }

    pub fn is_configured(&self) -> bool {
        self.engine.is_some()
    }

    /// Detect faces in the frame and classify each one.
    ///
    /// Returns one [`FaceEmotion`] per detected face, largest face
    /// first, or an empty [`FrameAnalysis`] when no face is found.
    /// The frame is borrowed read-only and never retained.
    pub fn analyze(&mut self, frame: &Frame) -> Result<FrameAnalysis, RecognizerError> {
        let engine = self.engine.as_mut().ok_or(RecognizerError::NotConfigured)?;

        if frame.is_empty() {
            return Err(RecognizerError::analysis("frame has zero size"));
        }
        if frame.channels() != 3 {
            return Err(RecognizerError::analysis(format!(
                "expected 3-channel RGB frame, got {} channels",
                frame.channels()
            )));
        }

        let regions = engine
            .detector
            .detect(frame)
            .map_err(RecognizerError::analysis)?;

        let mut faces = Vec::with_capacity(regions.len());
        for region in regions {
            if region.area() == 0 {
                continue;
            }
            let crop = square_crop(frame, &region);
            let scores = engine
                .classifier
                .classify(&crop)
                .map_err(RecognizerError::analysis)?;
            faces.push(FaceEmotion { region, scores });
        }

        Ok(FrameAnalysis::new(faces))
    }
}

impl Default for EmotionRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts a square crop centered on the region, clamped to frame bounds.
///
/// The classifier works best on square inputs; the side is the larger
/// of the region's dimensions.
fn square_crop(frame: &Frame, region: &FaceRegion) -> Frame {
    let fw = frame.width() as i32;
    let fh = frame.height() as i32;

    let cx = region.x + region.width / 2;
    let cy = region.y + region.height / 2;
    let half = (region.width.max(region.height) / 2).max(1);

    let x1 = (cx - half).max(0) as usize;
    let y1 = (cy - half).max(0) as usize;
    let x2 = (cx + half).min(fw) as usize;
    let y2 = (cy + half).min(fh) as usize;

    let crop_w = x2 - x1;
    let crop_h = y2 - y1;
    let channels = frame.channels() as usize;

    let src = frame.as_ndarray();
    let mut data = Vec::with_capacity(crop_w * crop_h * channels);

    for row in y1..y2 {
        for col in x1..x2 {
            for c in 0..channels {
                data.push(src[[row, col, c]]);
            }
        }
    }

    Frame::new(data, crop_w as u32, crop_h as u32, channels as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::domain::emotion::{Emotion, EmotionScores};
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubDetector {
        regions: Vec<FaceRegion>,
        fail: bool,
    }

    impl StubDetector {
        fn returning(regions: Vec<FaceRegion>) -> Box<Self> {
            Box::new(Self {
                regions,
                fail: false,
            })
        }

        fn failing() -> Box<Self> {
            Box::new(Self {
                regions: vec![],
                fail: true,
            })
        }
    }

    impl FaceDetector for StubDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<FaceRegion>, Box<dyn std::error::Error>> {
            if self.fail {
                return Err("detector exploded".into());
            }
            Ok(self.regions.clone())
        }
    }

    struct StubClassifier {
        scores: [f32; 8],
        seen: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    impl StubClassifier {
        fn returning(scores: [f32; 8]) -> Box<Self> {
            Box::new(Self {
                scores,
                seen: Arc::new(Mutex::new(Vec::new())),
            })
        }
    }

    impl EmotionClassifier for StubClassifier {
        fn classify(&mut self, face: &Frame) -> Result<EmotionScores, Box<dyn std::error::Error>> {
            self.seen
                .lock()
                .unwrap()
                .push((face.width(), face.height()));
            Ok(EmotionScores::new(self.scores))
        }
    }

    // --- Helpers ---

    fn make_frame(w: u32, h: u32) -> Frame {
        Frame::new(vec![128; (w * h * 3) as usize], w, h, 3)
    }

    fn region(x: i32, y: i32, w: i32, h: i32) -> FaceRegion {
        FaceRegion::new(x, y, w, h, 0.9)
    }

    fn happy() -> [f32; 8] {
        [0.05, 0.7, 0.05, 0.05, 0.05, 0.04, 0.03, 0.03]
    }

    fn sad() -> [f32; 8] {
        [0.05, 0.05, 0.05, 0.7, 0.05, 0.04, 0.03, 0.03]
    }

    fn configured(regions: Vec<FaceRegion>, scores: [f32; 8]) -> EmotionRecognizer {
        let mut rec = EmotionRecognizer::new();
        rec.configure_with(
            StubDetector::returning(regions),
            StubClassifier::returning(scores),
        );
        rec
    }

    // --- State machine ---

    #[test]
    fn test_analyze_before_configure_fails() {
        let mut rec = EmotionRecognizer::new();
        let result = rec.analyze(&make_frame(100, 100));
        assert!(matches!(result, Err(RecognizerError::NotConfigured)));
    }

    #[test]
    fn test_new_recognizer_is_unconfigured() {
        assert!(!EmotionRecognizer::new().is_configured());
    }

    #[test]
    fn test_configure_with_transitions_to_configured() {
        let rec = configured(vec![], happy());
        assert!(rec.is_configured());
    }

    #[test]
    fn test_analyze_after_configure_never_not_configured() {
        let mut rec = configured(vec![], happy());
        for _ in 0..3 {
            let result = rec.analyze(&make_frame(50, 50));
            assert!(!matches!(result, Err(RecognizerError::NotConfigured)));
        }
    }

    #[test]
    fn test_reconfigure_replaces_engine() {
        let mut rec = configured(vec![region(10, 10, 20, 20)], happy());
        let first = rec.analyze(&make_frame(100, 100)).unwrap();
        assert_eq!(first.predominant().unwrap().0, Emotion::Happiness);

        // Last write wins: results must reflect only the new engine
        rec.configure_with(
            StubDetector::returning(vec![region(10, 10, 20, 20)]),
            StubClassifier::returning(sad()),
        );
        let second = rec.analyze(&make_frame(100, 100)).unwrap();
        assert_eq!(second.predominant().unwrap().0, Emotion::Sadness);
    }

    #[test]
    fn test_configure_empty_identifier_fails() {
        let mut rec = EmotionRecognizer::new();
        let result = rec.configure("", "emotion-ferplus-8.onnx");
        assert!(matches!(
            result,
            Err(RecognizerError::Configuration { ref name, .. }) if name.is_empty()
        ));
        assert!(!rec.is_configured());
    }

    #[test]
    fn test_configure_unresolvable_identifier_fails() {
        let mut rec = EmotionRecognizer::new();
        let result = rec.configure("/nonexistent/face.onnx", "/nonexistent/emotion.onnx");
        assert!(matches!(result, Err(RecognizerError::Configuration { .. })));
        assert!(!rec.is_configured());
    }

    #[test]
    fn test_configure_malformed_model_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let face = tmp.path().join("face.onnx");
        let emotion = tmp.path().join("emotion.onnx");
        std::fs::write(&face, b"this is not an onnx model").unwrap();
        std::fs::write(&emotion, b"neither is this").unwrap();

        let mut rec = EmotionRecognizer::new();
        let result = rec.configure(face.to_str().unwrap(), emotion.to_str().unwrap());
        assert!(matches!(result, Err(RecognizerError::Configuration { .. })));
        assert!(!rec.is_configured());
    }

    #[test]
    fn test_failed_configure_keeps_previous_engine() {
        let mut rec = configured(vec![region(10, 10, 20, 20)], happy());
        let result = rec.configure("", "");
        assert!(result.is_err());
        // The old engine still answers
        let analysis = rec.analyze(&make_frame(100, 100)).unwrap();
        assert_eq!(analysis.len(), 1);
    }

    // --- Analysis ---

    #[test]
    fn test_no_faces_returns_empty_not_error() {
        let mut rec = configured(vec![], happy());
        let analysis = rec.analyze(&make_frame(100, 100)).unwrap();
        assert!(analysis.is_empty());
    }

    #[test]
    fn test_one_face_yields_full_vocabulary() {
        let mut rec = configured(vec![region(10, 10, 30, 30)], happy());
        let analysis = rec.analyze(&make_frame(100, 100)).unwrap();
        assert_eq!(analysis.len(), 1);

        let scores = &analysis.faces()[0].scores;
        for (_, s) in scores.iter() {
            assert!((0.0..=1.0).contains(&s));
        }
        assert_eq!(scores.iter().count(), Emotion::ALL.len());
    }

    #[test]
    fn test_multiple_faces_largest_first() {
        let mut rec = configured(
            vec![region(0, 0, 10, 10), region(50, 50, 40, 40)],
            happy(),
        );
        let analysis = rec.analyze(&make_frame(100, 100)).unwrap();
        assert_eq!(analysis.len(), 2);
        assert_eq!(analysis.faces()[0].region.x, 50);
    }

    #[test]
    fn test_degenerate_regions_skipped() {
        let mut rec = configured(
            vec![region(10, 10, 0, 20), region(40, 40, 20, 20)],
            happy(),
        );
        let analysis = rec.analyze(&make_frame(100, 100)).unwrap();
        assert_eq!(analysis.len(), 1);
        assert_eq!(analysis.faces()[0].region.x, 40);
    }

    #[test]
    fn test_classifier_receives_square_crop() {
        let classifier = StubClassifier::returning(happy());
        let seen = classifier.seen.clone();

        let mut rec = EmotionRecognizer::new();
        rec.configure_with(StubDetector::returning(vec![region(30, 35, 10, 30)]), classifier);
        rec.analyze(&make_frame(100, 100)).unwrap();

        // cx=35, cy=50, half=15 → 30x30 crop
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], (30, 30));
    }

    #[test]
    fn test_empty_frame_is_analysis_error() {
        let mut rec = configured(vec![], happy());
        let result = rec.analyze(&Frame::new(vec![], 0, 0, 3));
        assert!(matches!(result, Err(RecognizerError::Analysis { .. })));
        // Configured state unaffected
        assert!(rec.is_configured());
    }

    #[test]
    fn test_non_rgb_frame_is_analysis_error() {
        let mut rec = configured(vec![], happy());
        let gray = Frame::new(vec![0u8; 16], 4, 4, 1);
        let result = rec.analyze(&gray);
        assert!(matches!(result, Err(RecognizerError::Analysis { .. })));
    }

    #[test]
    fn test_detector_failure_is_analysis_error() {
        let mut rec = EmotionRecognizer::new();
        rec.configure_with(StubDetector::failing(), StubClassifier::returning(happy()));
        let result = rec.analyze(&make_frame(100, 100));
        assert!(matches!(
            result,
            Err(RecognizerError::Analysis { ref reason }) if reason.contains("detector exploded")
        ));
        assert!(rec.is_configured());
    }

    #[test]
    fn test_analyze_does_not_mutate_frame() {
        let mut rec = configured(vec![region(10, 10, 30, 30)], happy());
        let frame = make_frame(100, 100);
        let before = frame.clone();
        rec.analyze(&frame).unwrap();
        assert_eq!(frame, before);
    }

    #[test]
    fn test_repeated_analyze_is_deterministic() {
        let mut rec = configured(vec![region(10, 10, 30, 30)], happy());
        let frame = make_frame(100, 100);
        let a = rec.analyze(&frame).unwrap();
        let b = rec.analyze(&frame).unwrap();
        assert_eq!(a, b);
    }

    // --- square_crop ---

    #[test]
    fn test_square_crop_basic() {
        // 10x10 frame, region at (2,2) size 4x4
        let frame = make_frame(10, 10);
        let r = region(2, 2, 4, 4);
        let crop = square_crop(&frame, &r);
        // cx=4, cy=4, half=2 → x1=2, y1=2, x2=6, y2=6 → 4x4
        assert_eq!(crop.width(), 4);
        assert_eq!(crop.height(), 4);
    }

    #[test]
    fn test_square_crop_clamps_to_frame() {
        let frame = make_frame(10, 10);
        let r = region(7, 7, 6, 6);
        let crop = square_crop(&frame, &r);
        // cx=10, cy=10, half=3 → x1=7, y1=7, x2=10, y2=10 → 3x3
        assert_eq!(crop.width(), 3);
        assert_eq!(crop.height(), 3);
    }

    #[test]
    fn test_square_crop_rectangular_region_uses_max_dim() {
        let frame = make_frame(100, 100);
        let r = region(40, 35, 10, 30);
        let crop = square_crop(&frame, &r);
        // cx=45, cy=50, half=15 → 30x30
        assert_eq!(crop.width(), 30);
        assert_eq!(crop.height(), 30);
    }

    #[test]
    fn test_square_crop_single_pixel_region() {
        let frame = make_frame(10, 10);
        let r = region(5, 5, 1, 1);
        let crop = square_crop(&frame, &r);
        assert!(crop.width() >= 1);
        assert!(crop.height() >= 1);
    }
}
