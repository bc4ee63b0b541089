//! Answer correctness checks.
//!
//! Submissions are judged by case-insensitive, whitespace-trimmed exact
//! comparison against the reference answer. Every question type goes through
//! the same comparison, MATCHING included; there is no partial credit and no
//! multi-answer matching. Content editors work around it by keeping reference
//! answers single-valued.

/// Whether a submitted answer matches the reference answer.
pub fn is_correct_answer(submitted: &str, correct: &str) -> bool {
    normalize(submitted) == normalize(correct)
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(is_correct_answer("goes", "goes"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(is_correct_answer("Goes", "goes"));
        assert!(is_correct_answer("GOES", "goes"));
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        assert!(is_correct_answer(" goes ", "goes"));
        assert!(is_correct_answer("\tgoes\n", "goes"));
        assert!(is_correct_answer("goes", "  goes  "));
    }

    #[test]
    fn test_wrong_answer() {
        assert!(!is_correct_answer("go", "goes"));
        assert!(!is_correct_answer("", "goes"));
    }

    #[test]
    fn test_inner_whitespace_is_significant() {
        assert!(!is_correct_answer("go es", "goes"));
        assert!(is_correct_answer("has gone", "Has Gone"));
    }
}
