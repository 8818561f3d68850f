use std::fmt;

use thiserror::Error;

/// Error taxonomy of the [`EmotionRecognizer`] surface.
///
/// All variants are synchronous and surfaced to the immediate caller;
/// the recognizer recovers from none of them internally. A failed
/// analysis never yields a partial result.
///
/// [`EmotionRecognizer`]: crate::analysis::recognizer::EmotionRecognizer
#[derive(Error, Debug)]
pub enum RecognizerError {
    /// A model identifier was empty, unresolvable, or the resource
    /// failed to load as a model. The previous configuration, if any,
    /// is left in place.
    #[error("failed to configure model '{name}': {reason}")]
    Configuration { name: String, reason: String },

    /// `analyze` was called before any successful `configure`.
    #[error("analyzer is not configured; call configure first")]
    NotConfigured,

    /// The input frame was unusable or inference failed. The
    /// configured state is unaffected.
    #[error("analysis failed: {reason}")]
    Analysis { reason: String },
}

impl RecognizerError {
    pub(crate) fn configuration(name: &str, source: impl fmt::Display) -> Self {
        RecognizerError::Configuration {
            name: name.to_string(),
            reason: source.to_string(),
        }
    }

    pub(crate) fn analysis(source: impl fmt::Display) -> Self {
        RecognizerError::Analysis {
            reason: source.to_string(),
        }
    }
}
