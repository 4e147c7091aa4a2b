//! Persistence bridge: hands finished sessions to the backend and brings
//! the authoritative result back.
//!
//! A background worker owns the API client and consumes submit jobs from
//! a channel, reporting outcomes on another. Failures become messages,
//! never retries; the caller decides if and when to resubmit.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::types::{SubmitReceipt, SubmitRequest};
use crate::api::ApiClient;
use crate::error::SessionError;
use crate::session::SessionState;

/// One finished attempt, ready to submit.
#[derive(Debug, Clone)]
pub struct SubmitJob {
    pub quiz_id: String,
    pub answers: Vec<String>,
    pub username: String,
    pub access_token: String,
}

impl SubmitJob {
    /// Build a job from a completed session. Unanswered questions go up
    /// as empty strings so the sheet stays aligned with question order.
    pub fn from_session(
        session: &SessionState,
        username: &str,
        access_token: &str,
    ) -> Result<Self, SessionError> {
        if !session.is_completed() {
            return Err(SessionError::NotCompleted);
        }
        let answers = session
            .quiz()
            .questions
            .iter()
            .zip(session.answers())
            .map(|(question, answer)| {
                answer
                    .as_ref()
                    .map(|a| a.wire_value(question))
                    .unwrap_or_default()
            })
            .collect();
        Ok(Self {
            quiz_id: session.quiz().id.clone(),
            answers,
            username: username.to_string(),
            access_token: access_token.to_string(),
        })
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Accepted {
        quiz_id: String,
        receipt: SubmitReceipt,
    },
    Rejected {
        quiz_id: String,
        error: crate::error::ApiError,
    },
}

/// Spawn the submit worker. It runs until the job channel closes or the
/// outcome receiver goes away, whichever comes first.
pub fn spawn_submit_worker(
    client: ApiClient,
    mut jobs: mpsc::Receiver<SubmitJob>,
    outcomes: mpsc::Sender<SubmitOutcome>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(job) = jobs.recv().await {
            let request = SubmitRequest {
                answers: job.answers,
                username: job.username,
            };
            tracing::debug!(quiz = %job.quiz_id, "submitting attempt");

            let outcome = match client
                .submit_quiz(&job.access_token, &job.quiz_id, &request)
                .await
            {
                Ok(receipt) => SubmitOutcome::Accepted {
                    quiz_id: job.quiz_id,
                    receipt,
                },
                Err(error) => {
                    tracing::warn!(quiz = %job.quiz_id, error = %error, "submit failed");
                    SubmitOutcome::Rejected {
                        quiz_id: job.quiz_id,
                        error,
                    }
                }
            };

            if outcomes.send(outcome).await.is_err() {
                break;
            }
        }
        tracing::debug!("submit worker channel closed, exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Answer, Question, QuestionKind, Quiz, QuizSettings};

    fn quiz() -> Quiz {
        Quiz {
            id: "quiz-1".to_string(),
            title: "Planets".to_string(),
            questions: vec![
                Question {
                    id: "q0".to_string(),
                    prompt: "Capital of France?".to_string(),
                    kind: QuestionKind::FillInBlank,
                    options: vec![],
                    answer: Some("Paris".to_string()),
                    hint: None,
                    explanation: None,
                    difficulty: None,
                    topics: vec![],
                },
                Question {
                    id: "q1".to_string(),
                    prompt: "Red planet?".to_string(),
                    kind: QuestionKind::FillInBlank,
                    options: vec![],
                    answer: Some("Mars".to_string()),
                    hint: None,
                    explanation: None,
                    difficulty: None,
                    topics: vec![],
                },
            ],
            settings: QuizSettings::default(),
        }
    }

    #[test]
    fn test_job_requires_completed_session() {
        let session = SessionState::start(quiz()).unwrap();
        assert!(matches!(
            SubmitJob::from_session(&session, "ada", "tok"),
            Err(SessionError::NotCompleted)
        ));
    }

    #[test]
    fn test_job_aligns_answers_with_question_order() {
        let mut session = SessionState::start(quiz()).unwrap();
        session
            .record_answer(1, Answer::Text("Mars".to_string()))
            .unwrap();
        session.complete().unwrap();

        let job = SubmitJob::from_session(&session, "ada", "tok").unwrap();
        assert_eq!(job.quiz_id, "quiz-1");
        assert_eq!(job.answers, vec!["".to_string(), "Mars".to_string()]);
        assert_eq!(job.username, "ada");
    }
}
