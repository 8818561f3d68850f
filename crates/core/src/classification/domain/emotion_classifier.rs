use crate::classification::domain::emotion::EmotionScores;
use crate::shared::frame::Frame;

/// Domain interface for emotion classification of a single face crop.
///
/// The crop is an RGB frame roughly centered on one face; grayscale
/// conversion and resizing are the implementation's concern.
pub trait EmotionClassifier: Send {
    fn classify(&mut self, face: &Frame) -> Result<EmotionScores, Box<dyn std::error::Error>>;
}
