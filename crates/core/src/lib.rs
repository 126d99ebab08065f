pub mod config;
pub mod problem;
pub mod recognition;
pub mod variation;

pub use config::{AppConfig, ConfigError, OcrSettings, VariationSettings};
pub use problem::{GeneratedProblem, Sequence, SingleProblem};
pub use recognition::{PageSegMode, RecognitionProfile};
pub use variation::NumberVariation;
