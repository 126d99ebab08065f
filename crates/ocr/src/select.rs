use crate::types::RecognitionAttempt;

/// Above this confidence a longer text beats a more confident one.
pub const LENGTH_OVERRIDE_MIN_CONFIDENCE: f32 = 50.0;
/// An attempt above this confidence (with enough text) ends the catalog run.
pub const GOOD_ENOUGH_MIN_CONFIDENCE: f32 = 80.0;
/// Minimum text length, in chars, for the early exit.
pub const GOOD_ENOUGH_MIN_LEN: usize = 5;

/// Whether `attempt` is good enough to stop trying further profiles.
pub fn is_good_enough(attempt: &RecognitionAttempt) -> bool {
    attempt.confidence > GOOD_ENOUGH_MIN_CONFIDENCE && attempt.text_len() > GOOD_ENOUGH_MIN_LEN
}

/// Best attempt seen so far, updated in encounter order.
#[derive(Debug, Default)]
pub struct RunningBest {
    best: Option<RecognitionAttempt>,
}

impl RunningBest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer an attempt. Empty attempts are ignored; the first non-empty one
    /// is always taken; afterwards a challenger wins on strictly higher
    /// confidence, or on longer text at confidence above 50.
    /// Returns whether the attempt became the new best.
    pub fn offer(&mut self, attempt: RecognitionAttempt) -> bool {
        if attempt.is_empty() {
            return false;
        }
        let replace = match &self.best {
            None => true,
            Some(best) => {
                attempt.confidence > best.confidence
                    || (attempt.confidence > LENGTH_OVERRIDE_MIN_CONFIDENCE
                        && attempt.text_len() > best.text_len())
            }
        };
        if replace {
            self.best = Some(attempt);
        }
        replace
    }

    pub fn best(&self) -> Option<&RecognitionAttempt> {
        self.best.as_ref()
    }

    pub fn into_best(self) -> Option<RecognitionAttempt> {
        self.best
    }
}

/// Fold `attempts` through [`RunningBest`] in order.
pub fn select_best(attempts: impl IntoIterator<Item = RecognitionAttempt>) -> Option<RecognitionAttempt> {
    let mut running = RunningBest::new();
    for attempt in attempts {
        running.offer(attempt);
    }
    running.into_best()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(confidence: f32, text: &str) -> RecognitionAttempt {
        RecognitionAttempt::new("p", text, confidence)
    }

    #[test]
    fn longer_text_wins_above_fifty() {
        let best = select_best([a(60.0, "ab"), a(55.0, "abcdef")]).unwrap();
        assert_eq!(best.text, "abcdef");
        assert_eq!(best.confidence, 55.0);
    }

    #[test]
    fn longer_text_loses_at_fifty_or_below() {
        let best = select_best([a(60.0, "ab"), a(50.0, "abcdef")]).unwrap();
        assert_eq!(best.text, "ab");
    }

    #[test]
    fn higher_confidence_wins_even_when_shorter() {
        let best = select_best([a(55.0, "abcdef"), a(70.0, "x")]).unwrap();
        assert_eq!(best.text, "x");
    }

    #[test]
    fn first_in_order_keeps_ties() {
        let best = select_best([a(70.0, "abc"), a(70.0, "xyz")]).unwrap();
        assert_eq!(best.text, "abc");
    }

    #[test]
    fn selection_is_order_dependent() {
        // Pairwise rules, not a global sort: the same attempts in another
        // order pick a different winner.
        let forward = select_best([a(60.0, "ab"), a(55.0, "abcdef"), a(58.0, "abc")]).unwrap();
        assert_eq!(forward.text, "abc");
        let reversed = select_best([a(58.0, "abc"), a(55.0, "abcdef"), a(60.0, "ab")]).unwrap();
        assert_eq!(reversed.text, "ab");
    }

    #[test]
    fn empty_attempts_are_ignored() {
        let best = select_best([a(95.0, ""), a(12.0, "1+1")]).unwrap();
        assert_eq!(best.text, "1+1");
        assert_eq!(best.confidence, 12.0);
        assert!(select_best([a(90.0, "  "), a(10.0, "")]).is_none());
    }

    #[test]
    fn zero_confidence_text_is_still_usable() {
        let best = select_best([a(0.0, "x")]).unwrap();
        assert_eq!(best.text, "x");
    }

    #[test]
    fn offer_reports_replacement() {
        let mut r = RunningBest::new();
        assert!(r.offer(a(40.0, "abc")));
        assert!(!r.offer(a(30.0, "abcdef")));
        assert!(r.offer(a(41.0, "a")));
        assert_eq!(r.best().unwrap().confidence, 41.0);
    }

    #[test]
    fn good_enough_needs_both_confidence_and_length() {
        assert!(is_good_enough(&a(85.0, "x^2+1=0")));
        assert!(!is_good_enough(&a(80.0, "x^2+1=0")));
        assert!(!is_good_enough(&a(95.0, "x+1=0")));
        assert!(is_good_enough(&a(81.0, "x+1=02")));
    }
}
