use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use tracing::info;

use mathvar_core::{AppConfig, GeneratedProblem, OcrSettings, SingleProblem};
use mathvar_ocr::{MockRecognizer, OcrBackend, ProblemImagePipeline};
use mathvar_variation::{
    write_txt, GeminiClient, OfflineService, VariationError, VariationGenerator, VariationService,
};

pub type Pipeline = ProblemImagePipeline<Arc<dyn OcrBackend>>;

/// One half of the submission as given on the command line.
#[derive(Debug, Clone, Copy)]
pub enum Side {
    Problem,
    Solution,
}

impl Side {
    fn label(self) -> &'static str {
        match self {
            Side::Problem => "problem",
            Side::Solution => "solution",
        }
    }
}

/// Pick the recognizer: scripted text for dry runs, Tesseract when built in.
pub fn build_pipeline(settings: &OcrSettings, dry_run_text: Option<&str>) -> Result<Pipeline> {
    let backend: Arc<dyn OcrBackend> = match dry_run_text {
        Some(text) => Arc::new(MockRecognizer::new(text, 90.0)),
        None => engine_backend(settings)?,
    };
    Ok(ProblemImagePipeline::from_settings(backend, settings))
}

#[cfg(feature = "tesseract")]
fn engine_backend(settings: &OcrSettings) -> Result<Arc<dyn OcrBackend>> {
    use mathvar_ocr::recognizer::tesseract_backend::TesseractRecognizer;
    let data_path = settings
        .tessdata_dir
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned());
    Ok(Arc::new(TesseractRecognizer::new(data_path)))
}

#[cfg(not(feature = "tesseract"))]
fn engine_backend(_settings: &OcrSettings) -> Result<Arc<dyn OcrBackend>> {
    Err(mathvar_ocr::OcrError::NotAvailable.into())
}

/// Typed text wins over the image; an image alone goes through OCR.
/// Returns the text and the image reference kept for display.
pub async fn resolve_side(
    pipeline: Option<&Pipeline>,
    side: Side,
    text: Option<String>,
    image: Option<PathBuf>,
) -> Result<(String, Option<String>)> {
    let image_ref = image.as_ref().map(|p| p.display().to_string());
    let typed = text.filter(|t| !t.trim().is_empty());

    match (typed, image) {
        (Some(text), _) => Ok((text, image_ref)),
        (None, None) => Ok((String::new(), None)),
        (None, Some(path)) => {
            let Some(pipeline) = pipeline else {
                bail!("no OCR backend available for the {} image", side.label());
            };
            match pipeline.process_file(&path).await {
                Ok(output) => {
                    info!(
                        side = side.label(),
                        confidence = output.confidence,
                        profile = %output.profile,
                        "text recognized"
                    );
                    Ok((output.text.into_string(), image_ref))
                }
                Err(e) if e.needs_manual_entry() => bail!(
                    "could not read any text from the {side} image {path}. \
                     Please type it in with --{side}-text",
                    side = side.label(),
                    path = path.display(),
                ),
                Err(e) => Err(e)
                    .with_context(|| format!("failed to process {}", path.display())),
            }
        }
    }
}

/// Run the generator against whichever service the config allows.
pub async fn generate(
    config: &AppConfig,
    problem: &SingleProblem,
    count: u32,
) -> Result<Vec<GeneratedProblem>> {
    match GeminiClient::from_settings(&config.variation) {
        Ok(client) => Ok(generate_with(client, problem, count).await),
        Err(VariationError::MissingApiKey(var)) => {
            info!("${var} not set, numbers will be varied locally");
            Ok(generate_with(OfflineService, problem, count).await)
        }
        Err(e) => Err(e).context("failed to set up the variation client"),
    }
}

async fn generate_with<S: VariationService>(
    service: S,
    problem: &SingleProblem,
    count: u32,
) -> Vec<GeneratedProblem> {
    VariationGenerator::new(service).generate(problem, count).await
}

pub fn export(out_dir: &Path, batch: &[GeneratedProblem]) -> Result<PathBuf> {
    let path = write_txt(out_dir, batch, Local::now().naive_local())
        .with_context(|| format!("failed to export into {}", out_dir.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};

    fn write_png(dir: &Path) -> PathBuf {
        let img: GrayImage = ImageBuffer::from_fn(6, 6, |x, _| Luma([if x < 3 { 25u8 } else { 230 }]));
        let path = dir.join("side.png");
        DynamicImage::ImageLuma8(img).save(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn typed_text_skips_ocr() {
        let (text, image) = resolve_side(None, Side::Problem, Some("1 + 1".into()), None)
            .await
            .unwrap();
        assert_eq!(text, "1 + 1");
        assert!(image.is_none());
    }

    #[tokio::test]
    async fn image_goes_through_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path());
        let pipeline = build_pipeline(&OcrSettings::default(), Some("2 분 의 1")).unwrap();

        let (text, image) = resolve_side(Some(&pipeline), Side::Solution, None, Some(png.clone()))
            .await
            .unwrap();
        assert_eq!(text, "1/2");
        assert_eq!(image, Some(png.display().to_string()));
    }

    #[tokio::test]
    async fn unreadable_image_asks_for_manual_entry() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path());
        let pipeline = build_pipeline(&OcrSettings::default(), Some("")).unwrap();

        let err = resolve_side(Some(&pipeline), Side::Problem, None, Some(png))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--problem-text"), "{err}");
    }

    #[tokio::test]
    async fn offline_batch_exports() {
        let mut config = AppConfig::default();
        config.variation.api_key_env = "MATHVAR_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        let problem = SingleProblem::from_text("사과 5개와 배 3개", "합은 8개");

        let batch = generate(&config, &problem, 2).await.unwrap();
        assert_eq!(batch.len(), 3);

        let dir = tempfile::tempdir().unwrap();
        let path = export(dir.path(), &batch).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("총 변형 문제 수: 2개"));
    }
}
