//! services/api/src/web/timer_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! the quiz countdown.

use crate::web::state::SessionState;
use quizforge_core::session::TimerTick;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The countdown task for one quiz attempt.
///
/// Ticks once per wall-clock second while the session is taking a quiz and
/// submits automatically when the countdown reaches zero, with whatever
/// answers exist at that instant. It is designed to be gracefully cancelled
/// via a `CancellationToken` whenever the session leaves the quiz phase.
pub async fn countdown_process(
    session_lock: Arc<Mutex<SessionState>>,
    cancellation_token: CancellationToken,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; consume it so the countdown
    // starts a full second after the first answer.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!("Countdown cancelled.");
                return;
            }
            _ = interval.tick() => {
                let mut state = session_lock.lock().await;
                match state.session.tick_timer() {
                    TimerTick::Running(_) => {}
                    TimerTick::Inactive => {
                        // The session left the quiz phase without this task
                        // being cancelled; there is nothing left to count.
                        return;
                    }
                    TimerTick::Expired => {
                        info!("Quiz time expired; submitting automatically.");
                        let _ = state.session.submit();
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizforge_core::domain::{Language, Quiz, QuizItem, QuizLength};
    use quizforge_core::session::{InputMode, Phase};

    fn quiz(len: usize) -> Quiz {
        (0..len)
            .map(|i| QuizItem {
                question: format!("question {i}"),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_option_index: 0,
                explanation: "because".into(),
            })
            .collect()
    }

    /// A session state mid-quiz with an armed timer of `duration` seconds.
    fn quiz_in_progress(duration: u32) -> SessionState {
        let mut state = SessionState::new(Language::En, QuizLength::Fifteen, duration);
        state.session.set_input_mode(InputMode::Text);
        let epoch = state.session.epoch();
        state.session.begin_quiz_from_text("source text").unwrap();
        assert!(state.session.finish_quiz_generation(epoch, Ok(quiz(2))));
        state.session.record_answer(0, 0).unwrap();
        assert!(state.session.timer().active);
        state
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_submits_exactly_once() {
        let session_lock = Arc::new(Mutex::new(quiz_in_progress(3)));
        let token = session_lock.lock().await.countdown_token.clone();

        let task = tokio::spawn(countdown_process(session_lock.clone(), token));
        task.await.unwrap();

        let state = session_lock.lock().await;
        assert_eq!(state.session.phase(), Phase::Results);
        assert_eq!(state.session.timer().seconds_remaining, 0);
        assert!(!state.session.timer().active);
        assert_eq!(state.session.answers().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_ticks() {
        let session_lock = Arc::new(Mutex::new(quiz_in_progress(3600)));
        let token = session_lock.lock().await.countdown_token.clone();

        let task = tokio::spawn(countdown_process(session_lock.clone(), token.clone()));
        tokio::time::advance(Duration::from_secs(5)).await;
        token.cancel();
        task.await.unwrap();

        let state = session_lock.lock().await;
        assert_eq!(state.session.phase(), Phase::Quiz);
        assert!(state.session.timer().seconds_remaining >= 3600 - 6);
    }

    #[tokio::test(start_paused = true)]
    async fn task_exits_when_the_session_already_moved_on() {
        let session_lock = Arc::new(Mutex::new(quiz_in_progress(3600)));
        let token = session_lock.lock().await.countdown_token.clone();
        session_lock.lock().await.session.submit().unwrap();

        let task = tokio::spawn(countdown_process(session_lock.clone(), token));
        task.await.unwrap();

        let state = session_lock.lock().await;
        assert_eq!(state.session.phase(), Phase::Results);
    }
}
