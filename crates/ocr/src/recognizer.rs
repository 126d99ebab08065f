use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use mathvar_core::RecognitionProfile;

use crate::types::RecognitionAttempt;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Profile '{0}' not supported by this engine")]
    UnsupportedProfile(String),
    #[error("Tesseract not available, build with `tesseract` feature")]
    NotAvailable,
}

/// Abstraction over an OCR backend.
/// Implementations accept encoded image bytes and one profile, and return the
/// recognized text with the engine's confidence (0–100).
pub trait OcrBackend: Send + Sync {
    fn recognize(
        &self,
        image_bytes: &[u8],
        profile: &RecognitionProfile,
    ) -> Result<RecognitionAttempt, OcrError>;
}

impl<B: OcrBackend + ?Sized> OcrBackend for Arc<B> {
    fn recognize(
        &self,
        image_bytes: &[u8],
        profile: &RecognitionProfile,
    ) -> Result<RecognitionAttempt, OcrError> {
        (**self).recognize(image_bytes, profile)
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns the same text and confidence for every profile.
pub struct MockRecognizer {
    pub text: String,
    pub confidence: f32,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self { text: text.into(), confidence }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(
        &self,
        _image_bytes: &[u8],
        profile: &RecognitionProfile,
    ) -> Result<RecognitionAttempt, OcrError> {
        Ok(RecognitionAttempt::new(&profile.name, self.text.clone(), self.confidence))
    }
}

// ── Scripted backend ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Scripted {
    Text(String, f32),
    Fail(String),
}

/// Plays back one scripted outcome per call, in call order, and records which
/// profiles were asked for. Calls past the end of the script see empty text.
#[derive(Default)]
pub struct ScriptedRecognizer {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRecognizer {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Profile names in the order they were invoked.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl OcrBackend for ScriptedRecognizer {
    fn recognize(
        &self,
        _image_bytes: &[u8],
        profile: &RecognitionProfile,
    ) -> Result<RecognitionAttempt, OcrError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(profile.name.clone());
        let next = self.script.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        match next {
            Some(Scripted::Text(text, confidence)) => {
                Ok(RecognitionAttempt::new(&profile.name, text, confidence))
            }
            Some(Scripted::Fail(msg)) => Err(OcrError::Engine(msg)),
            None => Ok(RecognitionAttempt::new(&profile.name, "", 0.0)),
        }
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError};
    use crate::types::RecognitionAttempt;
    use leptess::{LepTess, Variable};
    use mathvar_core::RecognitionProfile;

    pub struct TesseractRecognizer {
        data_path: Option<String>,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>) -> Self {
            Self { data_path }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(
            &self,
            image_bytes: &[u8],
            profile: &RecognitionProfile,
        ) -> Result<RecognitionAttempt, OcrError> {
            let mut lt = LepTess::new(self.data_path.as_deref(), &profile.language)
                .map_err(|e| OcrError::Engine(e.to_string()))?;

            if let Some(mode) = profile.page_segmentation {
                lt.set_variable(Variable::TesseditPagesegMode, mode.as_tesseract())
                    .map_err(|_| OcrError::UnsupportedProfile(profile.name.clone()))?;
            }
            if let Some(chars) = &profile.char_whitelist {
                lt.set_variable(Variable::TesseditCharWhitelist, chars)
                    .map_err(|_| OcrError::UnsupportedProfile(profile.name.clone()))?;
            }
            let preserve = if profile.preserve_interword_spaces { "1" } else { "0" };
            lt.set_variable(Variable::PreserveInterwordSpaces, preserve)
                .map_err(|_| OcrError::UnsupportedProfile(profile.name.clone()))?;

            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            let text = lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))?;
            let confidence = lt.mean_text_conf() as f32;

            Ok(RecognitionAttempt::new(&profile.name, text, confidence))
        }
    }
}
