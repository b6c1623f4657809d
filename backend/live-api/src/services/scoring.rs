use crate::models::question::{Question, QuestionKind};

/// Grades a single submitted answer against a question's answer key.
///
/// Comparison is case-insensitive exact match for every kind. Speed
/// bonus: a correct answer earns `1000 - elapsed_ms / 100` points,
/// floored at zero, with elapsed time measured server-side from the
/// question broadcast.
pub struct AnswerScoringEngine;

impl AnswerScoringEngine {
    pub fn score(question: &Question, submitted: &str, elapsed_ms: u64) -> (bool, u32) {
        let is_correct = match question.kind {
            QuestionKind::SingleChoice | QuestionKind::TrueFalse => question
                .options
                .iter()
                .any(|o| o.correct && Self::matches(&o.text, submitted)),
            QuestionKind::ShortAnswer | QuestionKind::FillBlank => question
                .canonical_answer
                .as_deref()
                .map(|expected| Self::matches(expected, submitted))
                .unwrap_or(false),
        };

        let awarded = if is_correct {
            1000u64.saturating_sub(elapsed_ms / 100) as u32
        } else {
            0
        };

        (is_correct, awarded)
    }

    fn matches(expected: &str, submitted: &str) -> bool {
        expected.to_lowercase() == submitted.to_lowercase()
    }
}
