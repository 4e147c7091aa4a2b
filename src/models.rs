//! Domain models for quizzes, questions, answers, and the signed-in user.
//!
//! These are the shapes the session machinery works with. Endpoint-specific
//! request/response types live in `api::types`; everything here is also a
//! wire shape (camelCase field names) because the backend serves quiz
//! content directly in this form.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    FillInBlank,
}

/// One selectable option of a choice question. `is_correct` is only
/// populated in full quiz payloads fetched for an authorized session;
/// listing endpoints omit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub kind: QuestionKind,
    /// Populated for choice kinds, empty for fill-in-blank.
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    /// Canonical answer text for fill-in-blank questions.
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl Question {
    /// The authoritative correct answer as display text.
    pub fn canonical_answer(&self) -> Option<&str> {
        match self.kind {
            QuestionKind::FillInBlank => self.answer.as_deref(),
            QuestionKind::MultipleChoice | QuestionKind::TrueFalse => self
                .options
                .iter()
                .find(|o| o.is_correct)
                .map(|o| o.text.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizSettings {
    /// Per-question countdown; `None` disables timing entirely.
    pub seconds_per_question: Option<u64>,
    pub show_hints: bool,
    pub show_explanations: bool,
    /// Shuffle question order when a session starts.
    pub randomize: bool,
    /// Forward-only navigation; going back is refused.
    pub linear: bool,
    pub retakes_allowed: bool,
    /// Minimum percentage to pass; 0 means every attempt passes.
    pub passing_percent: u32,
    /// When set, a question timeout completes the whole session instead
    /// of only locking the expired question.
    pub submit_on_timeout: bool,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            seconds_per_question: None,
            show_hints: true,
            show_explanations: true,
            randomize: false,
            linear: false,
            retakes_allowed: true,
            passing_percent: 0,
            submit_on_timeout: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub settings: QuizSettings,
}

/// A recorded answer: an option index for choice questions, free text
/// for fill-in-blank. Serialized untagged so snapshots stay compact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Selected(usize),
    Text(String),
}

impl Answer {
    /// The submission wire value: option text for a selection, the text
    /// itself otherwise. Out-of-range selections submit as empty.
    pub fn wire_value(&self, question: &Question) -> String {
        match self {
            Answer::Selected(i) => question
                .options
                .get(*i)
                .map(|o| o.text.clone())
                .unwrap_or_default(),
            Answer::Text(t) => t.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Profile snapshot held by the auth layer and cached locally. The
/// backend owns the truth; `credits` in particular is reconciled from
/// submit receipts and payment verifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub credits: i64,
    pub role: Role,
}
