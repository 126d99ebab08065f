use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use mathvar_core::{GeneratedProblem, NumberVariation, Sequence, SingleProblem, VariationSettings};

use crate::fallback::fallback_variation;
use crate::service::VariationService;

/// Produces a batch of numeric variants of one problem.
///
/// The remote service is tried first for every text; whatever goes wrong
/// there, the local fallback fills in, so generation itself never fails.
pub struct VariationGenerator<S> {
    service: S,
    rng: StdRng,
}

impl<S: VariationService> VariationGenerator<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic fallback numbers, for tests and reproducible runs.
    pub fn with_seed(service: S, seed: u64) -> Self {
        Self {
            service,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Vary the numbers of one text, with its counterpart as context.
    pub async fn vary(&mut self, text: &str, context: Option<&str>) -> NumberVariation {
        match self.service.generate(text, context).await {
            Ok(v) if !v.modified_text.trim().is_empty() => v,
            Ok(_) => {
                warn!("variation service returned empty text, using local fallback");
                fallback_variation(text, &mut self.rng)
            }
            Err(e) => {
                warn!(error = %e, "variation service failed, using local fallback");
                fallback_variation(text, &mut self.rng)
            }
        }
    }

    /// The original followed by `count` variants (clamped to 1..=10).
    pub async fn generate(&mut self, problem: &SingleProblem, count: u32) -> Vec<GeneratedProblem> {
        let count = count.clamp(1, VariationSettings::MAX_COUNT);
        let original = GeneratedProblem::original(problem);
        let problem_text = original.problem_text.clone();
        let solution_text = original.solution_text.clone();

        let mut batch = Vec::with_capacity(count as usize + 1);
        batch.push(original);

        for n in 1..=count {
            let varied_problem = match &problem_text {
                Some(text) => Some(self.vary(text, solution_text.as_deref()).await.modified_text),
                None => None,
            };
            let varied_solution = match &solution_text {
                Some(text) => Some(self.vary(text, problem_text.as_deref()).await.modified_text),
                None => None,
            };

            batch.push(GeneratedProblem {
                sequence: Sequence::Variant(n),
                problem_text: varied_problem,
                problem_image: problem.problem_image.clone(),
                solution_text: varied_solution,
                solution_image: problem.solution_image.clone(),
                is_generated: true,
            });
        }

        info!(variants = count, "variation batch generated");
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{OfflineService, VariationError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers every call with a fixed rewrite and records the context seen.
    #[derive(Default)]
    struct Echo {
        contexts: Mutex<Vec<Option<String>>>,
    }

    impl VariationService for Echo {
        async fn generate(
            &self,
            text: &str,
            context: Option<&str>,
        ) -> Result<NumberVariation, VariationError> {
            self.contexts
                .lock()
                .unwrap()
                .push(context.map(str::to_string));
            Ok(NumberVariation {
                modified_text: format!("varied: {text}"),
                ..NumberVariation::default()
            })
        }
    }

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl VariationService for Counting {
        async fn generate(
            &self,
            _text: &str,
            _context: Option<&str>,
        ) -> Result<NumberVariation, VariationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(VariationError::EmptyResponse)
        }
    }

    #[tokio::test]
    async fn batch_starts_with_original_then_variants() {
        let mut gen = VariationGenerator::with_seed(Echo::default(), 1);
        let problem = SingleProblem::from_text("사과 5개", "답 5");
        let batch = gen.generate(&problem, 3).await;

        assert_eq!(batch.len(), 4);
        assert_eq!(batch[0].sequence, Sequence::Original);
        assert!(!batch[0].is_generated);
        assert_eq!(batch[0].problem_text.as_deref(), Some("사과 5개"));

        for (i, p) in batch[1..].iter().enumerate() {
            assert_eq!(p.sequence, Sequence::Variant(i as u32 + 1));
            assert!(p.is_generated);
            assert_eq!(p.problem_text.as_deref(), Some("varied: 사과 5개"));
            assert_eq!(p.solution_text.as_deref(), Some("varied: 답 5"));
        }
    }

    #[tokio::test]
    async fn each_side_sees_the_other_as_context() {
        let mut gen = VariationGenerator::with_seed(Echo::default(), 1);
        gen.generate(&SingleProblem::from_text("P 1", "S 2"), 1).await;
        let contexts = gen.service().contexts.lock().unwrap().clone();
        assert_eq!(contexts, vec![Some("S 2".to_string()), Some("P 1".to_string())]);
    }

    #[tokio::test]
    async fn service_failure_falls_back_locally() {
        let mut gen = VariationGenerator::with_seed(Counting::default(), 9);
        let problem = SingleProblem::from_text("철수는 사과 5개와 배 3개를 가지고 있다.", "");
        let batch = gen.generate(&problem, 2).await;

        assert_eq!(gen.service().calls.load(Ordering::SeqCst), 2);
        for p in &batch[1..] {
            let text = p.problem_text.as_deref().unwrap();
            assert_ne!(text, "철수는 사과 5개와 배 3개를 가지고 있다.");
            assert!(text.starts_with("철수는 사과 "));
            assert!(p.solution_text.is_none());
        }
    }

    #[tokio::test]
    async fn image_only_sides_are_carried_over() {
        let mut gen = VariationGenerator::with_seed(OfflineService, 3);
        let problem = SingleProblem {
            problem_image: Some("problem.png".to_string()),
            solution_text: "정답은 12".to_string(),
            ..SingleProblem::default()
        };
        let batch = gen.generate(&problem, 1).await;
        assert_eq!(batch[1].problem_text, None);
        assert_eq!(batch[1].problem_image.as_deref(), Some("problem.png"));
        assert!(batch[1].solution_text.is_some());
    }

    #[tokio::test]
    async fn count_is_clamped() {
        let mut gen = VariationGenerator::with_seed(OfflineService, 0);
        let problem = SingleProblem::from_text("3 + 4", "7");
        assert_eq!(gen.generate(&problem, 0).await.len(), 2);
        assert_eq!(gen.generate(&problem, 50).await.len(), 11);
    }
}
