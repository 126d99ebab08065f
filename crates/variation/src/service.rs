use std::future::Future;
use thiserror::Error;

use mathvar_core::NumberVariation;

#[derive(Debug, Error)]
pub enum VariationError {
    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),
    #[error("Variation service unavailable: {0}")]
    Unavailable(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Response carried no text")]
    EmptyResponse,
    #[error("No JSON object found in response")]
    NoJson,
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Response is missing '{0}'")]
    Incomplete(&'static str),
}

/// Something that rewrites the numbers of a problem (or solution) text.
///
/// `context` is the other half of the pair, passed so the rewrite can stay
/// consistent with it.
pub trait VariationService: Send + Sync {
    fn generate(
        &self,
        text: &str,
        context: Option<&str>,
    ) -> impl Future<Output = Result<NumberVariation, VariationError>> + Send;
}

/// Used when no API key is configured; every call fails so the caller falls
/// back to local substitution.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineService;

impl VariationService for OfflineService {
    async fn generate(
        &self,
        _text: &str,
        _context: Option<&str>,
    ) -> Result<NumberVariation, VariationError> {
        Err(VariationError::Unavailable("no API key configured".to_string()))
    }
}
