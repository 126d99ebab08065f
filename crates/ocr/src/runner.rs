use thiserror::Error;
use tracing::{debug, info, warn};

use mathvar_core::RecognitionProfile;

use crate::canonical::canonicalize;
use crate::recognizer::OcrBackend;
use crate::select::{is_good_enough, RunningBest};
use crate::types::{BestResult, NormalizedImage};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecognitionError {
    /// Every profile failed or came back empty. The caller should ask for the
    /// text to be typed in instead of retrying.
    #[error("no usable text after {attempts} recognition attempts ({failures} failed)")]
    NoUsableText { attempts: usize, failures: usize },
}

/// Run `catalog` in order against `image`, keeping the best attempt and
/// stopping early once one is good enough. A failing profile is skipped.
pub fn recognize<B: OcrBackend + ?Sized>(
    image: &NormalizedImage,
    catalog: &[RecognitionProfile],
    backend: &B,
) -> Result<BestResult, RecognitionError> {
    let mut running = RunningBest::new();
    let mut attempts = 0usize;
    let mut failures = 0usize;

    for profile in catalog {
        attempts += 1;
        debug!(profile = %profile.name, "recognition attempt");

        let attempt = match backend.recognize(image.bytes(), profile) {
            Ok(a) => a,
            Err(e) => {
                failures += 1;
                warn!(profile = %profile.name, error = %e, "recognition profile failed");
                continue;
            }
        };

        debug!(
            profile = %profile.name,
            confidence = attempt.confidence,
            chars = attempt.text_len(),
            "recognition result"
        );

        let good_enough = is_good_enough(&attempt);
        if running.offer(attempt) {
            debug!(profile = %profile.name, "new best recognition result");
        }
        if good_enough {
            info!(profile = %profile.name, "recognition result good enough, skipping remaining profiles");
            break;
        }
    }

    let Some(best) = running.into_best() else {
        warn!(attempts, failures, "no usable text recognized");
        return Err(RecognitionError::NoUsableText { attempts, failures });
    };

    info!(
        profile = %best.profile,
        confidence = best.confidence,
        attempts,
        "recognition finished"
    );

    Ok(BestResult {
        text: canonicalize(&best.text),
        confidence: best.confidence,
        profile: best.profile,
        attempts,
    })
}
