use crate::classification::domain::emotion::{Emotion, EmotionScores};
use crate::shared::region::FaceRegion;

/// One detected face and its emotion score distribution.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceEmotion {
    pub region: FaceRegion,
    pub scores: EmotionScores,
}

impl FaceEmotion {
    /// The face's highest-scoring emotion label.
    pub fn predominant(&self) -> (Emotion, f32) {
        self.scores.top()
    }
}

/// Complete result of analyzing one frame.
///
/// Faces are ordered by bounding-box area, largest first, so the
/// primary subject of a photo comes before background faces. An empty
/// result means no face was detected; that is not an error.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameAnalysis {
    faces: Vec<FaceEmotion>,
}

impl FrameAnalysis {
    pub(crate) fn new(mut faces: Vec<FaceEmotion>) -> Self {
        faces.sort_by(|a, b| b.region.area().cmp(&a.region.area()));
        Self { faces }
    }

    pub fn faces(&self) -> &[FaceEmotion] {
        &self.faces
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// The largest detected face, if any.
    pub fn primary(&self) -> Option<&FaceEmotion> {
        self.faces.first()
    }

    /// The predominant emotion of the primary face.
    pub fn predominant(&self) -> Option<(Emotion, f32)> {
        self.primary().map(FaceEmotion::predominant)
    }
}
