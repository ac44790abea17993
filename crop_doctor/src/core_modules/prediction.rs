// THEORY:
// A `Prediction` is the "dumb" data container that flows between the classifiers
// and the response assembly. It knows nothing about advice or actions; it only
// carries the label a classifier settled on, how sure it was, and, when the
// engine had to fall back, the reason why.
//
// The score is kept at full precision for the lifetime of the request. Rounding
// is a presentation concern and happens only through `confidence()`.

pub mod prediction {
    pub type DiseaseLabel = String;
    pub type Score = f64;

    /// Label used whenever nothing more specific can be said.
    pub const GENERIC_LABEL: &str = "Generic";
    /// Score attached to predictions that had to be degraded after a failure.
    pub const DEGRADED_SCORE: Score = 0.5;

    /// The outcome of classifying a single request.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Prediction {
        /// The canonical label. May or may not be a knowledge base key.
        pub label: DiseaseLabel,
        /// Confidence in `[0, 1]`, unrounded.
        pub score: Score,
        /// Present only when this prediction replaces a failed classification.
        pub error: Option<String>,
    }

    impl Prediction {
        pub fn new(label: impl Into<DiseaseLabel>, score: Score) -> Self {
            Self {
                label: label.into(),
                score,
                error: None,
            }
        }

        /// The low-confidence Generic prediction substituted when decoding or
        /// inference fails.
        pub fn degraded(error: impl Into<String>) -> Self {
            Self {
                label: GENERIC_LABEL.to_string(),
                score: DEGRADED_SCORE,
                error: Some(error.into()),
            }
        }

        pub fn is_degraded(&self) -> bool {
            self.error.is_some()
        }

        /// The score rounded to three decimal places for display. Rounds the
        /// exact stored value, so 0.2675 (really 0.26749999...) gives 0.267.
        pub fn confidence(&self) -> f64 {
            format!("{:.3}", self.score).parse().unwrap_or(self.score)
        }
    }
}
