pub mod canonical;
pub mod pipeline;
pub mod preprocess;
pub mod profile;
pub mod recognizer;
pub mod runner;
pub mod select;
pub mod types;

pub use canonical::canonicalize;
pub use pipeline::{OcrOutput, PipelineError, ProblemImagePipeline};
pub use preprocess::{normalize, normalize_within};
pub use profile::default_catalog;
pub use recognizer::{MockRecognizer, OcrBackend, OcrError, Scripted, ScriptedRecognizer};
pub use runner::{recognize, RecognitionError};
pub use select::{is_good_enough, select_best, RunningBest};
pub use types::{
    BestResult, CanonicalText, NormalizeOutcome, NormalizedImage, PassThroughReason, RawImage,
    RecognitionAttempt,
};
