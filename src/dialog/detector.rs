//! Flow detector — picks a loan flow from the user's opening message.

use serde::{Deserialize, Serialize};

/// Result of classifying free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowGuess {
    Education,
    Wedding,
    Undetermined,
}

const EDUCATION_KEYWORDS: &[&str] = &["cfa", "education"];
const WEDDING_KEYWORDS: &[&str] = &["wedding", "marriage"];

/// Reply used when no keyword is present.
pub const FALLBACK_PROMPT: &str = "Could you please specify if you’re looking for a personal loan for CFA education or for Wedding expenses?";

/// Classify by literal substring. Education keywords win over wedding ones.
pub fn detect(text: &str) -> FlowGuess {
    let lower = text.to_lowercase();
    if EDUCATION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        FlowGuess::Education
    } else if WEDDING_KEYWORDS.iter().any(|k| lower.contains(k)) {
        FlowGuess::Wedding
    } else {
        FlowGuess::Undetermined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords() {
        assert_eq!(detect("I need a CFA loan"), FlowGuess::Education);
        assert_eq!(detect("help with EDUCATION fees"), FlowGuess::Education);
        assert_eq!(detect("my wedding is next month"), FlowGuess::Wedding);
        assert_eq!(detect("Marriage expenses"), FlowGuess::Wedding);
        assert_eq!(detect("I want a car"), FlowGuess::Undetermined);
        assert_eq!(detect(""), FlowGuess::Undetermined);
    }

    #[test]
    fn education_takes_precedence() {
        assert_eq!(
            detect("wedding first, then my cfa exams"),
            FlowGuess::Education
        );
    }

    #[test]
    fn substring_not_word_match() {
        // Literal substring presence only.
        assert_eq!(detect("cfaffle"), FlowGuess::Education);
    }
}
