use std::fmt;

/// The emotion vocabulary of the classification model's output head.
///
/// The order matches the model's class indices and must not be
/// rearranged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Emotion {
    Neutral,
    Happiness,
    Surprise,
    Sadness,
    Anger,
    Disgust,
    Fear,
    Contempt,
}

impl Emotion {
    /// All labels in class-index order.
    pub const ALL: [Emotion; 8] = [
        Emotion::Neutral,
        Emotion::Happiness,
        Emotion::Surprise,
        Emotion::Sadness,
        Emotion::Anger,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Contempt,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happiness => "happiness",
            Emotion::Surprise => "surprise",
            Emotion::Sadness => "sadness",
            Emotion::Anger => "anger",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Contempt => "contempt",
        }
    }

    /// Class index in the model output.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-face probability for every label in the vocabulary.
///
/// Scores are softmax probabilities: each in [0,1], summing to ~1.
#[derive(Clone, Debug, PartialEq)]
pub struct EmotionScores {
    scores: [f32; Emotion::ALL.len()],
}

impl EmotionScores {
    pub fn new(scores: [f32; Emotion::ALL.len()]) -> Self {
        Self { scores }
    }

    /// Convert raw model logits into probabilities via a numerically
    /// stable softmax.
    pub fn from_logits(logits: &[f32; Emotion::ALL.len()]) -> Self {
        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut exps = [0.0f32; Emotion::ALL.len()];
        let mut sum = 0.0f32;
        for (i, &l) in logits.iter().enumerate() {
            let e = (l - max).exp();
            exps[i] = e;
            sum += e;
        }
        for e in &mut exps {
            *e /= sum;
        }
        Self { scores: exps }
    }

    pub fn score(&self, emotion: Emotion) -> f32 {
        self.scores[emotion.index()]
    }

    /// The highest-scoring label. Ties resolve to the earlier class
    /// index, deterministically.
    pub fn top(&self) -> (Emotion, f32) {
        let mut best = Emotion::ALL[0];
        let mut best_score = self.scores[0];
        for (i, &s) in self.scores.iter().enumerate().skip(1) {
            if s > best_score {
                best = Emotion::ALL[i];
                best_score = s;
            }
        }
        (best, best_score)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f32)> + '_ {
        Emotion::ALL.iter().map(|&e| (e, self.scores[e.index()]))
    }
}
