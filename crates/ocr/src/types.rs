use image::ImageFormat;
use serde::Serialize;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// An uploaded image, kept as its original encoded bytes.
#[derive(Debug, Clone)]
pub struct RawImage {
    bytes: Arc<[u8]>,
    dimensions: Option<(u32, u32)>,
    format: Option<ImageFormat>,
}

impl RawImage {
    /// Wrap encoded bytes. Dimensions and format are probed from the header only;
    /// both are `None` when the header is unreadable.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes: Arc<[u8]> = bytes.into();
        let format = image::guess_format(&bytes).ok();
        let dimensions = image::ImageReader::new(Cursor::new(&bytes[..]))
            .with_guessed_format()
            .ok()
            .and_then(|r| r.into_dimensions().ok());
        Self { bytes, dimensions, format }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub(crate) fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }
}

/// Why normalization handed the raw image through untouched.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PassThroughReason {
    #[error("image dimensions unknown")]
    UnknownDimensions,
    #[error("image dimensions {width}x{height} outside accepted range")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("image decode failed: {0}")]
    Decode(String),
    #[error("processed image encode failed: {0}")]
    Encode(String),
    #[error("normalization exceeded {0:?}")]
    TimedOut(Duration),
    #[error("normalization worker aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeOutcome {
    /// Rescaled and binarized at `threshold`.
    Enhanced { scale: f32, threshold: u8 },
    PassThrough(PassThroughReason),
}

impl NormalizeOutcome {
    pub fn is_enhanced(&self) -> bool {
        matches!(self, NormalizeOutcome::Enhanced { .. })
    }
}

/// The image every recognition attempt reads. Cloning shares the buffer.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    bytes: Arc<[u8]>,
    dimensions: Option<(u32, u32)>,
    outcome: NormalizeOutcome,
}

impl NormalizedImage {
    pub(crate) fn enhanced(bytes: Vec<u8>, dimensions: (u32, u32), scale: f32, threshold: u8) -> Self {
        Self {
            bytes: bytes.into(),
            dimensions: Some(dimensions),
            outcome: NormalizeOutcome::Enhanced { scale, threshold },
        }
    }

    pub fn pass_through(raw: &RawImage, reason: PassThroughReason) -> Self {
        Self {
            bytes: raw.shared_bytes(),
            dimensions: raw.dimensions(),
            outcome: NormalizeOutcome::PassThrough(reason),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub fn outcome(&self) -> &NormalizeOutcome {
        &self.outcome
    }
}

/// Text and confidence from running one profile against one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionAttempt {
    pub profile: String,
    pub text: String,
    /// Engine confidence, 0–100.
    pub confidence: f32,
}

impl RecognitionAttempt {
    pub fn new(profile: impl Into<String>, text: impl Into<String>, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 100.0) };
        Self {
            profile: profile.into(),
            text: text.into().trim().to_string(),
            confidence,
        }
    }

    /// Length in chars, the unit the selection rules compare.
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Recognized text after canonicalization. Only `canonical::canonicalize` builds one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalText(pub(crate) String);

impl CanonicalText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CanonicalText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The winning attempt for one image.
#[derive(Debug, Clone, Serialize)]
pub struct BestResult {
    pub text: CanonicalText,
    pub confidence: f32,
    pub profile: String,
    /// Number of profiles actually run, failures included.
    pub attempts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(width, height, |_, _| Luma([200u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn raw_image_probes_header() {
        let raw = RawImage::from_bytes(png(7, 3));
        assert_eq!(raw.dimensions(), Some((7, 3)));
        assert_eq!(raw.format(), Some(ImageFormat::Png));
    }

    #[test]
    fn raw_image_garbage_has_no_dimensions() {
        let raw = RawImage::from_bytes(b"not an image".to_vec());
        assert_eq!(raw.dimensions(), None);
        assert_eq!(raw.format(), None);
    }

    #[test]
    fn attempt_clamps_confidence_and_trims() {
        let a = RecognitionAttempt::new("p", "  x+1 \n", 140.0);
        assert_eq!(a.confidence, 100.0);
        assert_eq!(a.text, "x+1");
        assert_eq!(RecognitionAttempt::new("p", "", f32::NAN).confidence, 0.0);
    }

    #[test]
    fn attempt_length_counts_chars() {
        assert_eq!(RecognitionAttempt::new("p", "문제 1", 0.0).text_len(), 4);
    }

    #[test]
    fn pass_through_shares_raw_bytes() {
        let raw = RawImage::from_bytes(png(2, 2));
        let n = NormalizedImage::pass_through(&raw, PassThroughReason::UnknownDimensions);
        assert_eq!(n.bytes(), raw.bytes());
        assert!(!n.outcome().is_enhanced());
    }
}
