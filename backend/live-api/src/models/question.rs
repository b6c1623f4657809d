use serde::{Deserialize, Serialize};

/// The closed set of question kinds the engine knows how to score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    SingleChoice,
    TrueFalse,
    ShortAnswer,
    FillBlank,
}

/// One selectable option of a choice question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOption {
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

/// A question as seeded into a session. Carries the answer key and is
/// never sent to participants directly; see [`QuestionPublic`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    /// Canonical answer for short-answer and fill-blank questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_answer: Option<String>,
    pub time_limit_secs: u64,
}

impl Question {
    /// The value revealed to everyone once the question is graded.
    pub fn correct_answer(&self) -> String {
        match self.kind {
            QuestionKind::SingleChoice | QuestionKind::TrueFalse => self
                .options
                .iter()
                .find(|o| o.correct)
                .map(|o| o.text.clone())
                .unwrap_or_default(),
            QuestionKind::ShortAnswer | QuestionKind::FillBlank => {
                self.canonical_answer.clone().unwrap_or_default()
            }
        }
    }
}

/// Participant-facing view of a question with correctness stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionPublic {
    pub id: String,
    pub text: String,
    pub kind: QuestionKind,
    pub options: Vec<String>,
    pub time_limit_secs: u64,
}

impl From<&Question> for QuestionPublic {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            text: question.text.clone(),
            kind: question.kind,
            options: question.options.iter().map(|o| o.text.clone()).collect(),
            time_limit_secs: question.time_limit_secs,
        }
    }
}
