use serde::{Deserialize, Serialize};

/// A single math problem as submitted: each side may be text, an image, or both.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SingleProblem {
    pub problem_text: String,
    /// Reference to the uploaded problem image (path or data URL), kept for display.
    pub problem_image: Option<String>,
    pub solution_text: String,
    pub solution_image: Option<String>,
}

impl SingleProblem {
    pub fn from_text(problem: impl Into<String>, solution: impl Into<String>) -> Self {
        Self {
            problem_text: problem.into(),
            solution_text: solution.into(),
            ..Self::default()
        }
    }

    /// A problem is submittable once either side carries text or an image.
    pub fn is_empty(&self) -> bool {
        self.problem_text.trim().is_empty()
            && self.problem_image.is_none()
            && self.solution_text.trim().is_empty()
            && self.solution_image.is_none()
    }
}

/// Position of an entry in a generated batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sequence {
    Original,
    Variant(u32),
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sequence::Original => write!(f, "원본"),
            Sequence::Variant(n) => write!(f, "변형-{n}"),
        }
    }
}

impl std::str::FromStr for Sequence {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "원본" {
            return Ok(Sequence::Original);
        }
        s.strip_prefix("변형-")
            .and_then(|n| n.parse().ok())
            .map(Sequence::Variant)
            .ok_or_else(|| format!("Unknown sequence label: '{s}'"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedProblem {
    pub sequence: Sequence,
    pub problem_text: Option<String>,
    pub problem_image: Option<String>,
    pub solution_text: Option<String>,
    pub solution_image: Option<String>,
    /// False only for the untouched original at the head of a batch.
    pub is_generated: bool,
}

impl GeneratedProblem {
    pub fn original(problem: &SingleProblem) -> Self {
        Self {
            sequence: Sequence::Original,
            problem_text: non_empty(&problem.problem_text),
            problem_image: problem.problem_image.clone(),
            solution_text: non_empty(&problem.solution_text),
            solution_image: problem.solution_image.clone(),
            is_generated: false,
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn sequence_display() {
        assert_eq!(Sequence::Original.to_string(), "원본");
        assert_eq!(Sequence::Variant(3).to_string(), "변형-3");
    }

    #[test]
    fn sequence_roundtrip() {
        assert_eq!(Sequence::from_str("원본").unwrap(), Sequence::Original);
        assert_eq!(Sequence::from_str("변형-12").unwrap(), Sequence::Variant(12));
        assert!(Sequence::from_str("변형-x").is_err());
    }

    #[test]
    fn original_drops_blank_text() {
        let p = SingleProblem {
            problem_text: "1+1=?".into(),
            problem_image: None,
            solution_text: "   ".into(),
            solution_image: Some("solution.png".into()),
        };
        let g = GeneratedProblem::original(&p);
        assert_eq!(g.problem_text.as_deref(), Some("1+1=?"));
        assert!(g.solution_text.is_none());
        assert_eq!(g.solution_image.as_deref(), Some("solution.png"));
        assert!(!g.is_generated);
    }

    #[test]
    fn empty_problem_detection() {
        assert!(SingleProblem::default().is_empty());
        assert!(!SingleProblem::from_text("x", "").is_empty());
    }
}
