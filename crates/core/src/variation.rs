use serde::{Deserialize, Serialize};

/// Outcome of one numeric-substitution pass over a problem text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NumberVariation {
    pub original_numbers: Vec<String>,
    pub modified_numbers: Vec<String>,
    /// Char offsets of the replaced numbers in the original text.
    #[serde(default)]
    pub positions: Vec<usize>,
    pub modified_text: String,
}

impl NumberVariation {
    /// Upper bound on how many numbers one variation may touch.
    pub const MAX_CHANGES: usize = 3;

    pub fn unchanged(text: &str) -> Self {
        Self {
            modified_text: text.to_string(),
            ..Self::default()
        }
    }

    /// Drop any substitutions past [`Self::MAX_CHANGES`].
    pub fn truncate_changes(&mut self) {
        self.original_numbers.truncate(Self::MAX_CHANGES);
        self.modified_numbers.truncate(Self::MAX_CHANGES);
        self.positions.truncate(Self::MAX_CHANGES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_without_positions() {
        let json = r#"{"originalNumbers":["5"],"modifiedNumbers":["7"],"modifiedText":"7개"}"#;
        let v: NumberVariation = serde_json::from_str(json).unwrap();
        assert_eq!(v.original_numbers, vec!["5"]);
        assert!(v.positions.is_empty());
        assert_eq!(v.modified_text, "7개");
    }

    #[test]
    fn truncate_keeps_first_three() {
        let mut v = NumberVariation {
            original_numbers: vec!["1".into(), "2".into(), "3".into(), "4".into()],
            modified_numbers: vec!["5".into(), "6".into(), "7".into(), "8".into()],
            positions: vec![0, 2, 4, 6],
            modified_text: String::new(),
        };
        v.truncate_changes();
        assert_eq!(v.original_numbers, vec!["1", "2", "3"]);
        assert_eq!(v.modified_numbers.len(), 3);
        assert_eq!(v.positions, vec![0, 2, 4]);
    }
}
