//! Scoring for completed quiz sessions.
//!
//! Grading is pure: it compares the collected answers against the quiz's
//! canonical answers and produces an immutable [`ScoreReport`]. The server
//! may later supersede the aggregate score (see `bridge`), but the
//! per-question breakdown is always computed here.

use serde::{Deserialize, Serialize};

use crate::models::{Answer, Question, QuestionKind, Quiz};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub index: usize,
    pub question_id: String,
    pub correct: bool,
    /// What the user submitted, as display text. `None` when unanswered.
    pub given: Option<String>,
    pub expected: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub results: Vec<QuestionResult>,
    /// Count of correct answers.
    pub score: u32,
    pub total: u32,
    /// score / total, rounded to the nearest integer.
    pub percentage: u32,
    pub passed: bool,
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Free-text kinds compare normalized text against the canonical answer;
/// choice kinds check the selected option's correctness flag. A textual
/// answer to a choice question (true/false typed out, restored snapshots)
/// is matched against the correct option's text. Unanswered is incorrect.
fn is_correct(question: &Question, answer: Option<&Answer>) -> bool {
    let Some(answer) = answer else {
        return false;
    };

    match question.kind {
        QuestionKind::MultipleChoice | QuestionKind::TrueFalse => match answer {
            Answer::Selected(i) => question.options.get(*i).is_some_and(|o| o.is_correct),
            Answer::Text(t) => question
                .options
                .iter()
                .find(|o| o.is_correct)
                .is_some_and(|o| normalize(&o.text) == normalize(t)),
        },
        QuestionKind::FillInBlank => match answer {
            Answer::Text(t) => question
                .answer
                .as_deref()
                .is_some_and(|expected| normalize(t) == normalize(expected)),
            Answer::Selected(_) => false,
        },
    }
}

/// Grade a full answer sheet against a quiz. `answers` is aligned by
/// question index; missing slots count as incorrect.
pub fn grade(quiz: &Quiz, answers: &[Option<Answer>]) -> ScoreReport {
    let total = quiz.questions.len() as u32;
    let mut results = Vec::with_capacity(quiz.questions.len());
    let mut score = 0u32;

    for (index, question) in quiz.questions.iter().enumerate() {
        let answer = answers.get(index).and_then(|a| a.as_ref());
        let correct = is_correct(question, answer);
        if correct {
            score += 1;
        }
        results.push(QuestionResult {
            index,
            question_id: question.id.clone(),
            correct,
            given: answer.map(|a| a.wire_value(question)),
            expected: question.canonical_answer().unwrap_or_default().to_string(),
        });
    }

    let percentage = if total == 0 {
        0
    } else {
        ((score as f64 * 100.0) / total as f64).round() as u32
    };

    ScoreReport {
        results,
        score,
        total,
        percentage,
        passed: percentage >= quiz.settings.passing_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerOption, QuizSettings};

    fn fill_in(id: &str, prompt: &str, answer: &str) -> Question {
        Question {
            id: id.to_string(),
            prompt: prompt.to_string(),
            kind: QuestionKind::FillInBlank,
            options: vec![],
            answer: Some(answer.to_string()),
            hint: None,
            explanation: None,
            difficulty: None,
            topics: vec![],
        }
    }

    fn quiz_with(questions: Vec<Question>) -> Quiz {
        Quiz {
            id: "quiz-1".to_string(),
            title: "Test".to_string(),
            questions,
            settings: QuizSettings::default(),
        }
    }

    fn text(s: &str) -> Option<Answer> {
        Some(Answer::Text(s.to_string()))
    }

    #[test]
    fn test_half_right_scores_fifty_percent() {
        let quiz = quiz_with(vec![
            fill_in("q1", "Capital of France?", "Paris"),
            fill_in("q2", "Red planet?", "Mars"),
        ]);

        let report = grade(&quiz, &[text("Paris"), text("Venus")]);
        assert_eq!(report.score, 1);
        assert_eq!(report.percentage, 50);
        assert!(report.results[0].correct);
        assert!(!report.results[1].correct);
    }

    #[test]
    fn test_empty_answer_is_incorrect_not_an_error() {
        let quiz = quiz_with(vec![
            fill_in("q1", "Capital of France?", "Paris"),
            fill_in("q2", "Red planet?", "Mars"),
        ]);

        let report = grade(&quiz, &[text(""), text("Mars")]);
        assert_eq!(report.score, 1);
        assert!(!report.results[0].correct);
    }

    #[test]
    fn test_unanswered_slot_is_incorrect() {
        let quiz = quiz_with(vec![
            fill_in("q1", "Capital of France?", "Paris"),
            fill_in("q2", "Red planet?", "Mars"),
        ]);

        let report = grade(&quiz, &[None, text("Mars")]);
        assert_eq!(report.score, 1);
        assert_eq!(report.results[0].given, None);
    }

    #[test]
    fn test_comparison_trims_and_ignores_case() {
        let quiz = quiz_with(vec![fill_in("q1", "Capital of France?", "Paris")]);
        let report = grade(&quiz, &[text("  pArIs ")]);
        assert_eq!(report.score, 1);
    }

    #[test]
    fn test_choice_question_scored_by_flag() {
        let question = Question {
            id: "q1".to_string(),
            prompt: "Capital of France?".to_string(),
            kind: QuestionKind::MultipleChoice,
            options: vec![
                AnswerOption { text: "Lyon".to_string(), is_correct: false },
                AnswerOption { text: "Paris".to_string(), is_correct: true },
            ],
            answer: None,
            hint: None,
            explanation: None,
            difficulty: None,
            topics: vec![],
        };
        let quiz = quiz_with(vec![question]);

        let right = grade(&quiz, &[Some(Answer::Selected(1))]);
        assert_eq!(right.score, 1);

        let wrong = grade(&quiz, &[Some(Answer::Selected(0))]);
        assert_eq!(wrong.score, 0);

        // Out-of-range selection degrades to incorrect.
        let out = grade(&quiz, &[Some(Answer::Selected(7))]);
        assert_eq!(out.score, 0);

        // A textual answer to a choice question matches the correct option.
        let typed = grade(&quiz, &[text("paris")]);
        assert_eq!(typed.score, 1);
    }

    #[test]
    fn test_percentage_rounds_to_nearest() {
        let quiz = quiz_with(vec![
            fill_in("q1", "a", "a"),
            fill_in("q2", "b", "b"),
            fill_in("q3", "c", "c"),
        ]);

        // 1/3 => 33.33 rounds to 33; 2/3 => 66.67 rounds to 67.
        let one = grade(&quiz, &[text("a"), None, None]);
        assert_eq!(one.percentage, 33);
        let two = grade(&quiz, &[text("a"), text("b"), None]);
        assert_eq!(two.percentage, 67);
    }

    #[test]
    fn test_passing_threshold() {
        let mut quiz = quiz_with(vec![fill_in("q1", "a", "a"), fill_in("q2", "b", "b")]);
        quiz.settings.passing_percent = 75;

        let fail = grade(&quiz, &[text("a"), None]);
        assert!(!fail.passed);
        let pass = grade(&quiz, &[text("a"), text("b")]);
        assert!(pass.passed);
    }
}
