pub mod export;
pub mod fallback;
pub mod gemini;
pub mod generator;
pub mod service;

pub use export::{export_file_name, render_txt, write_txt, ExportError};
pub use fallback::fallback_variation;
pub use gemini::GeminiClient;
pub use generator::VariationGenerator;
pub use service::{OfflineService, VariationError, VariationService};
