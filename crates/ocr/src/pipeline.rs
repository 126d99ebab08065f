use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use mathvar_core::{OcrSettings, RecognitionProfile};

use crate::preprocess::{self, DEFAULT_BUDGET};
use crate::profile::default_catalog;
use crate::recognizer::OcrBackend;
use crate::runner::{self, RecognitionError};
use crate::types::{CanonicalText, NormalizeOutcome, RawImage};

/// Uploads above this size are refused before any processing.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not an image file (supported: JPG, PNG, GIF, WebP, BMP)")]
    UnsupportedFormat,
    #[error("Image is {size} bytes, larger than the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
    #[error("OCR recognition failed: {0}")]
    Recognition(#[from] RecognitionError),
    #[error("Recognition worker failed: {0}")]
    Worker(String),
}

impl PipelineError {
    /// The whole catalog ran without producing text: the user has to type it.
    pub fn needs_manual_entry(&self) -> bool {
        matches!(self, PipelineError::Recognition(RecognitionError::NoUsableText { .. }))
    }
}

/// The result of a single image processing run.
#[derive(Debug, Clone)]
pub struct OcrOutput {
    pub text: CanonicalText,
    /// Engine confidence of the winning attempt (0–100).
    pub confidence: f32,
    pub profile: String,
    pub attempts: usize,
    /// Whether the recognizer saw the enhanced image or the raw upload.
    pub normalize_outcome: NormalizeOutcome,
}

/// Orchestrates: validate → normalize (time-boxed) → recognition catalog → canonical text.
///
/// Holds no per-image state, so one pipeline can serve several images at once.
pub struct ProblemImagePipeline<R: OcrBackend> {
    recognizer: Arc<R>,
    catalog: Arc<[RecognitionProfile]>,
    normalize_budget: Duration,
}

impl<R: OcrBackend + 'static> ProblemImagePipeline<R> {
    pub fn new(recognizer: R) -> Self {
        Self {
            recognizer: Arc::new(recognizer),
            catalog: default_catalog().into(),
            normalize_budget: DEFAULT_BUDGET,
        }
    }

    pub fn from_settings(recognizer: R, settings: &OcrSettings) -> Self {
        let pipeline = Self::new(recognizer).with_normalize_budget(settings.normalize_budget());
        match &settings.profiles {
            Some(profiles) => pipeline.with_catalog(profiles.clone()),
            None => pipeline,
        }
    }

    pub fn with_catalog(mut self, catalog: Vec<RecognitionProfile>) -> Self {
        self.catalog = catalog.into();
        self
    }

    pub fn with_normalize_budget(mut self, budget: Duration) -> Self {
        self.normalize_budget = budget;
        self
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    pub fn catalog(&self) -> &[RecognitionProfile] {
        &self.catalog
    }

    /// Process an image file on disk.
    pub async fn process_file(&self, path: &Path) -> Result<OcrOutput, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        info!("Processing image: {}", path.display());
        self.process_bytes(bytes).await
    }

    /// Process raw upload bytes (JPEG / PNG / WEBP / …).
    pub async fn process_bytes(&self, data: Vec<u8>) -> Result<OcrOutput, PipelineError> {
        // 1. Refuse non-images and oversized uploads.
        validate_upload(&data)?;

        // 2. Normalize, falling back to the raw bytes on failure or timeout.
        let raw = RawImage::from_bytes(data);
        let normalized = preprocess::normalize_within(raw, self.normalize_budget).await;
        let normalize_outcome = normalized.outcome().clone();

        // 3. Run the catalog on the blocking pool; attempts stay sequential.
        let recognizer = Arc::clone(&self.recognizer);
        let catalog = Arc::clone(&self.catalog);
        let best = tokio::task::spawn_blocking(move || {
            runner::recognize(&normalized, &catalog, recognizer.as_ref())
        })
        .await
        .map_err(|e| PipelineError::Worker(e.to_string()))??;

        Ok(OcrOutput {
            text: best.text,
            confidence: best.confidence,
            profile: best.profile,
            attempts: best.attempts,
            normalize_outcome,
        })
    }
}

pub fn validate_upload(data: &[u8]) -> Result<(), PipelineError> {
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(PipelineError::TooLarge {
            size: data.len(),
            limit: MAX_UPLOAD_BYTES,
        });
    }
    image::guess_format(data).map_err(|_| PipelineError::UnsupportedFormat)?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
