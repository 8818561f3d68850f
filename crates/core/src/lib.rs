//! Face detection and emotion classification for photos.
//!
//! The public surface is [`analysis::recognizer::EmotionRecognizer`]:
//! configure it with a face-detection model and an emotion model, then
//! analyze decoded frames into per-face emotion scores.

pub mod analysis;
pub mod classification;
pub mod detection;
pub mod imaging;
pub mod shared;
