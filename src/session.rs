//! The quiz session state machine: position tracking, answer collection,
//! completion, and reconciliation with the server's authoritative score.
//!
//! A [`SessionState`] lives for exactly one attempt. Retakes build a fresh
//! value instead of mutating the old one, so a finished report can never
//! be recomputed in place.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;

use crate::api::types::SubmitReceipt;
use crate::error::SessionError;
use crate::models::{Answer, Question, Quiz};
use crate::scoring::{self, ScoreReport};

/// Where a finished session stands with respect to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStatus {
    NotSubmitted,
    Pending,
    /// The server accepted the attempt; its score supersedes the local one.
    Submitted { server_score: u32 },
    /// Submission failed; the local score stays visible and the caller
    /// decides when to retry.
    Failed { reason: String },
}

/// Outcome of a question timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutOutcome {
    /// The expired question no longer accepts answers; the session goes on.
    QuestionLocked,
    /// `submit_on_timeout` was set, so the whole session completed.
    SessionCompleted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    quiz: Quiz,
    current_index: usize,
    answers: Vec<Option<Answer>>,
    locked: Vec<bool>,
    completed: bool,
    report: Option<ScoreReport>,
    submit: SubmitStatus,
    started_at: DateTime<Utc>,
}

impl SessionState {
    /// Begin a new attempt. Shuffles question order when the quiz asks
    /// for it. A quiz without questions is not startable.
    pub fn start(mut quiz: Quiz) -> Result<Self, SessionError> {
        if quiz.questions.is_empty() {
            return Err(SessionError::EmptyQuiz);
        }

        if quiz.settings.randomize {
            quiz.questions.shuffle(&mut rand::thread_rng());
        }

        let count = quiz.questions.len();
        tracing::debug!(quiz = %quiz.id, questions = count, "session started");

        Ok(Self {
            quiz,
            current_index: 0,
            answers: vec![None; count],
            locked: vec![false; count],
            completed: false,
            report: None,
            submit: SubmitStatus::NotSubmitted,
            started_at: Utc::now(),
        })
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> &Question {
        &self.quiz.questions[self.current_index]
    }

    pub fn question_count(&self) -> usize {
        self.quiz.questions.len()
    }

    pub fn answers(&self) -> &[Option<Answer>] {
        &self.answers
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn elapsed_secs(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }

    /// The score report; `None` until the session completes.
    pub fn report(&self) -> Option<&ScoreReport> {
        self.report.as_ref()
    }

    pub fn submit_status(&self) -> &SubmitStatus {
        &self.submit
    }

    /// Score to show the user: the server's once submitted, the locally
    /// computed one otherwise.
    pub fn display_score(&self) -> Option<u32> {
        match &self.submit {
            SubmitStatus::Submitted { server_score } => Some(*server_score),
            _ => self.report.as_ref().map(|r| r.score),
        }
    }

    /// Hint for the current question, gated by quiz settings.
    pub fn hint(&self) -> Option<&str> {
        if !self.quiz.settings.show_hints {
            return None;
        }
        self.current_question().hint.as_deref()
    }

    /// Explanation for the current question, gated by quiz settings.
    pub fn explanation(&self) -> Option<&str> {
        if !self.quiz.settings.show_explanations {
            return None;
        }
        self.current_question().explanation.as_deref()
    }

    /// Store an answer at `index` without moving the cursor. Overwrites
    /// any previous answer at that position; recording the same answer
    /// twice leaves the session identical.
    pub fn record_answer(&mut self, index: usize, answer: Answer) -> Result<(), SessionError> {
        if self.completed {
            return Err(SessionError::Closed);
        }
        if index >= self.answers.len() {
            return Err(SessionError::OutOfRange(index));
        }
        if self.locked[index] {
            return Err(SessionError::QuestionLocked(index));
        }
        self.answers[index] = Some(answer);
        Ok(())
    }

    /// Move to the next question. Returns the new index; at the last
    /// question this signals [`SessionError::Boundary`] and stays put.
    pub fn advance(&mut self) -> Result<usize, SessionError> {
        if self.completed {
            return Err(SessionError::Closed);
        }
        if self.current_index + 1 >= self.quiz.questions.len() {
            return Err(SessionError::Boundary);
        }
        self.current_index += 1;
        Ok(self.current_index)
    }

    /// Move to the previous question. Refused entirely on linear quizzes.
    pub fn retreat(&mut self) -> Result<usize, SessionError> {
        if self.completed {
            return Err(SessionError::Closed);
        }
        if self.quiz.settings.linear {
            return Err(SessionError::LinearOnly);
        }
        if self.current_index == 0 {
            return Err(SessionError::Boundary);
        }
        self.current_index -= 1;
        Ok(self.current_index)
    }

    /// Finish the attempt: grade the answer sheet and freeze the session.
    /// Every later mutation fails with [`SessionError::Closed`].
    pub fn complete(&mut self) -> Result<&ScoreReport, SessionError> {
        if self.completed {
            return Err(SessionError::Closed);
        }
        let report = scoring::grade(&self.quiz, &self.answers);
        tracing::info!(
            quiz = %self.quiz.id,
            score = report.score,
            total = report.total,
            "session completed"
        );
        self.completed = true;
        Ok(self.report.insert(report))
    }

    /// React to a timer expiry for `index`: the question stops accepting
    /// answers. Completes the whole session only when the quiz is
    /// configured to submit on timeout.
    pub fn handle_timeout(&mut self, index: usize) -> Result<TimeoutOutcome, SessionError> {
        if self.completed {
            return Err(SessionError::Closed);
        }
        if index >= self.locked.len() {
            return Err(SessionError::OutOfRange(index));
        }
        self.locked[index] = true;
        tracing::debug!(quiz = %self.quiz.id, question = index, "question timed out");

        if self.quiz.settings.submit_on_timeout {
            self.complete()?;
            return Ok(TimeoutOutcome::SessionCompleted);
        }
        Ok(TimeoutOutcome::QuestionLocked)
    }

    /// A fresh attempt at the same quiz: new identity, empty answers,
    /// reshuffled if the quiz randomizes.
    pub fn restart(&self) -> Result<SessionState, SessionError> {
        if !self.quiz.settings.retakes_allowed {
            return Err(SessionError::RetakeNotAllowed);
        }
        Self::start(self.quiz.clone())
    }

    /// Flag the attempt as handed to the submit worker.
    pub fn mark_pending(&mut self) -> Result<(), SessionError> {
        if !self.completed {
            return Err(SessionError::NotCompleted);
        }
        self.submit = SubmitStatus::Pending;
        Ok(())
    }

    /// Fold the server's receipt back in; its score wins from here on.
    pub fn reconcile(&mut self, receipt: &SubmitReceipt) -> Result<(), SessionError> {
        if !self.completed {
            return Err(SessionError::NotCompleted);
        }
        self.submit = SubmitStatus::Submitted {
            server_score: receipt.score,
        };
        Ok(())
    }

    /// Record a failed submission; the local score remains on display.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), SessionError> {
        if !self.completed {
            return Err(SessionError::NotCompleted);
        }
        self.submit = SubmitStatus::Failed {
            reason: reason.into(),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QuestionKind, QuizSettings};

    fn fill_in(id: &str, answer: &str) -> Question {
        Question {
            id: id.to_string(),
            prompt: format!("prompt {id}"),
            kind: QuestionKind::FillInBlank,
            options: vec![],
            answer: Some(answer.to_string()),
            hint: Some(format!("hint {id}")),
            explanation: Some(format!("explanation {id}")),
            difficulty: None,
            topics: vec![],
        }
    }

    fn quiz(n: usize) -> Quiz {
        Quiz {
            id: "quiz-1".to_string(),
            title: "Test".to_string(),
            questions: (0..n).map(|i| fill_in(&format!("q{i}"), "x")).collect(),
            settings: QuizSettings::default(),
        }
    }

    fn text(s: &str) -> Answer {
        Answer::Text(s.to_string())
    }

    #[test]
    fn test_start_rejects_empty_quiz() {
        assert_eq!(SessionState::start(quiz(0)), Err(SessionError::EmptyQuiz));
    }

    #[test]
    fn test_start_initializes_aligned_answers() {
        let session = SessionState::start(quiz(3)).unwrap();
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.answers().len(), 3);
        assert!(session.answers().iter().all(|a| a.is_none()));
        assert!(!session.is_completed());
        assert!(session.report().is_none());
    }

    #[test]
    fn test_n_advances_stop_at_last_index() {
        let n = 5;
        let mut session = SessionState::start(quiz(n)).unwrap();
        for _ in 0..n {
            let _ = session.advance();
        }
        assert_eq!(session.current_index(), n - 1);
    }

    #[test]
    fn test_advance_signals_boundary_at_end() {
        let mut session = SessionState::start(quiz(2)).unwrap();
        assert_eq!(session.advance(), Ok(1));
        assert_eq!(session.advance(), Err(SessionError::Boundary));
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn test_retreat_signals_boundary_at_start() {
        let mut session = SessionState::start(quiz(2)).unwrap();
        assert_eq!(session.retreat(), Err(SessionError::Boundary));
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn test_linear_quiz_refuses_retreat() {
        let mut q = quiz(3);
        q.settings.linear = true;
        let mut session = SessionState::start(q).unwrap();
        session.advance().unwrap();
        assert_eq!(session.retreat(), Err(SessionError::LinearOnly));
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn test_record_answer_is_idempotent() {
        let mut session = SessionState::start(quiz(2)).unwrap();
        session.record_answer(1, text("Mars")).unwrap();
        let snapshot = session.clone();
        session.record_answer(1, text("Mars")).unwrap();
        assert_eq!(session, snapshot);
    }

    #[test]
    fn test_record_answer_overwrites_and_keeps_cursor() {
        let mut session = SessionState::start(quiz(2)).unwrap();
        session.record_answer(0, text("first")).unwrap();
        session.record_answer(0, text("second")).unwrap();
        assert_eq!(session.answers()[0], Some(text("second")));
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.answered_count(), 1);
    }

    #[test]
    fn test_record_answer_bounds_checked() {
        let mut session = SessionState::start(quiz(2)).unwrap();
        assert_eq!(
            session.record_answer(2, text("x")),
            Err(SessionError::OutOfRange(2))
        );
    }

    #[test]
    fn test_complete_freezes_session() {
        let mut session = SessionState::start(quiz(2)).unwrap();
        session.record_answer(0, text("x")).unwrap();
        let report = session.complete().unwrap().clone();
        assert_eq!(report.score, 1);

        assert_eq!(session.record_answer(1, text("x")), Err(SessionError::Closed));
        assert_eq!(session.advance(), Err(SessionError::Closed));
        assert_eq!(session.retreat(), Err(SessionError::Closed));
        assert_eq!(session.complete().unwrap_err(), SessionError::Closed);
        assert_eq!(session.display_score(), Some(1));
    }

    #[test]
    fn test_timeout_locks_question_only() {
        let mut session = SessionState::start(quiz(2)).unwrap();
        let outcome = session.handle_timeout(0).unwrap();
        assert_eq!(outcome, TimeoutOutcome::QuestionLocked);
        assert!(!session.is_completed());
        assert_eq!(
            session.record_answer(0, text("late")),
            Err(SessionError::QuestionLocked(0))
        );
        // Other questions still accept answers.
        session.record_answer(1, text("ok")).unwrap();
    }

    #[test]
    fn test_timeout_completes_when_configured() {
        let mut q = quiz(2);
        q.settings.submit_on_timeout = true;
        let mut session = SessionState::start(q).unwrap();
        let outcome = session.handle_timeout(0).unwrap();
        assert_eq!(outcome, TimeoutOutcome::SessionCompleted);
        assert!(session.is_completed());
        assert!(session.report().is_some());
    }

    #[test]
    fn test_restart_builds_fresh_identity() {
        let mut session = SessionState::start(quiz(2)).unwrap();
        session.record_answer(0, text("x")).unwrap();
        session.complete().unwrap();

        let fresh = session.restart().unwrap();
        assert_eq!(fresh.current_index(), 0);
        assert!(fresh.answers().iter().all(|a| a.is_none()));
        assert!(!fresh.is_completed());
        assert!(fresh.report().is_none());
        // The original attempt is untouched.
        assert!(session.is_completed());
    }

    #[test]
    fn test_restart_refused_without_retakes() {
        let mut q = quiz(1);
        q.settings.retakes_allowed = false;
        let session = SessionState::start(q).unwrap();
        assert!(matches!(
            session.restart(),
            Err(SessionError::RetakeNotAllowed)
        ));
    }

    #[test]
    fn test_randomize_keeps_question_set() {
        let mut q = quiz(20);
        q.settings.randomize = true;
        let session = SessionState::start(q.clone()).unwrap();
        let mut ids: Vec<_> = session.quiz().questions.iter().map(|x| x.id.clone()).collect();
        ids.sort();
        let mut expected: Vec<_> = q.questions.iter().map(|x| x.id.clone()).collect();
        expected.sort();
        assert_eq!(ids, expected);
        assert_eq!(session.answers().len(), 20);
    }

    #[test]
    fn test_hint_and_explanation_gated_by_settings() {
        let mut q = quiz(1);
        q.settings.show_hints = false;
        q.settings.show_explanations = true;
        let session = SessionState::start(q).unwrap();
        assert_eq!(session.hint(), None);
        assert_eq!(session.explanation(), Some("explanation q0"));
    }

    #[test]
    fn test_reconcile_prefers_server_score() {
        let mut session = SessionState::start(quiz(2)).unwrap();
        session.record_answer(0, text("x")).unwrap();
        session.record_answer(1, text("x")).unwrap();
        session.complete().unwrap();
        assert_eq!(session.display_score(), Some(2));

        session.mark_pending().unwrap();
        assert_eq!(*session.submit_status(), SubmitStatus::Pending);

        let receipt = SubmitReceipt { score: 1, credits: Some(4) };
        session.reconcile(&receipt).unwrap();
        assert_eq!(session.display_score(), Some(1));
        assert_eq!(
            *session.submit_status(),
            SubmitStatus::Submitted { server_score: 1 }
        );
    }

    #[test]
    fn test_failed_submit_keeps_local_score() {
        let mut session = SessionState::start(quiz(1)).unwrap();
        session.record_answer(0, text("x")).unwrap();
        session.complete().unwrap();
        session.mark_pending().unwrap();
        session.mark_failed("connection reset").unwrap();

        assert_eq!(session.display_score(), Some(1));
        assert!(matches!(session.submit_status(), SubmitStatus::Failed { .. }));
    }

    #[test]
    fn test_submit_bookkeeping_requires_completion() {
        let mut session = SessionState::start(quiz(1)).unwrap();
        assert_eq!(session.mark_pending(), Err(SessionError::NotCompleted));
        assert_eq!(
            session.reconcile(&SubmitReceipt { score: 0, credits: None }),
            Err(SessionError::NotCompleted)
        );
    }
}
