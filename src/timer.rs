//! Per-question countdown.
//!
//! One background task ticks once a second and reports over a channel.
//! Changing question replaces the countdown with a fresh full-duration
//! one; unused time never carries over. Stopping the timer (or dropping
//! it) aborts the task so no tick can fire against a torn-down session.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { question_index: usize, remaining: u64 },
    /// Terminal for a question; emitted exactly once per countdown.
    Expired { question_index: usize },
}

#[derive(Debug)]
pub struct QuestionTimer {
    duration_secs: u64,
    events: mpsc::Sender<TimerEvent>,
    task: Option<JoinHandle<()>>,
}

impl QuestionTimer {
    /// A timer that counts `duration_secs` down for one question at a
    /// time. Nothing runs until [`restart`](Self::restart) is called.
    pub fn new(duration_secs: u64) -> (Self, mpsc::Receiver<TimerEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        (
            Self {
                duration_secs,
                events: tx,
                task: None,
            },
            rx,
        )
    }

    /// Build from quiz settings; `None` when the quiz is untimed.
    pub fn from_settings(
        settings: &crate::models::QuizSettings,
    ) -> Option<(Self, mpsc::Receiver<TimerEvent>)> {
        settings.seconds_per_question.map(Self::new)
    }

    /// Begin (or re-begin) the countdown for `question_index`. Any
    /// countdown still running for a previous question is cancelled
    /// first, so at most one is ever live.
    pub fn restart(&mut self, question_index: usize) {
        self.stop();
        let tx = self.events.clone();
        let duration = self.duration_secs;
        self.task = Some(tokio::spawn(run_countdown(question_index, duration, tx)));
    }

    /// Cancel the running countdown, if any. Idempotent.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for QuestionTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_countdown(question_index: usize, duration: u64, tx: mpsc::Sender<TimerEvent>) {
    if duration == 0 {
        let _ = tx.send(TimerEvent::Expired { question_index }).await;
        return;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    // The first tick completes immediately; consume it so the countdown
    // starts a full second out.
    interval.tick().await;

    let mut remaining = duration;
    loop {
        interval.tick().await;
        remaining -= 1;
        if remaining == 0 {
            let _ = tx.send(TimerEvent::Expired { question_index }).await;
            tracing::debug!(question = question_index, "countdown expired");
            return;
        }
        if tx
            .send(TimerEvent::Tick {
                question_index,
                remaining,
            })
            .await
            .is_err()
        {
            // Receiver gone; the session was torn down.
            return;
        }
    }
}
