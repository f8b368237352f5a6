//! services/api/src/web/state.rs
//!
//! Defines the application's shared and session-specific states.

use crate::config::Config;
use quizforge_core::domain::{Language, QuizLength};
use quizforge_core::ports::{QuizGenerationService, TocExtractionService};
use quizforge_core::session::Session;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub toc_adapter: Arc<dyn TocExtractionService>,
    pub quiz_adapter: Arc<dyn QuizGenerationService>,
    pub sessions: SessionRegistry,
}

//=========================================================================================
// SessionState (Specific to One Session)
//=========================================================================================

/// The state for a single session: the domain aggregate plus the handle to
/// its countdown task, if one is running.
pub struct SessionState {
    pub session: Session,
    /// A token to gracefully cancel the countdown task bound to the current
    /// quiz attempt.
    pub countdown_token: CancellationToken,
}

impl SessionState {
    pub fn new(language: Language, quiz_length: QuizLength, quiz_duration_secs: u32) -> Self {
        Self {
            session: Session::new(language, quiz_length, quiz_duration_secs),
            countdown_token: CancellationToken::new(),
        }
    }

    /// Cancels any running countdown and installs a fresh token so only one
    /// countdown is ever live for this session.
    pub fn stop_countdown(&mut self) {
        self.countdown_token.cancel();
        self.countdown_token = CancellationToken::new();
    }
}

//=========================================================================================
// SessionRegistry
//=========================================================================================

/// The in-memory registry of live sessions. Nothing here survives a restart.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<Uuid, Arc<Mutex<SessionState>>>>>,
}

impl SessionRegistry {
    pub async fn create(
        &self,
        language: Language,
        quiz_length: QuizLength,
        quiz_duration_secs: u32,
    ) -> (Uuid, Arc<Mutex<SessionState>>) {
        let session_id = Uuid::new_v4();
        let state = Arc::new(Mutex::new(SessionState::new(
            language,
            quiz_length,
            quiz_duration_secs,
        )));
        self.inner.lock().await.insert(session_id, state.clone());
        (session_id, state)
    }

    pub async fn get(&self, session_id: Uuid) -> Option<Arc<Mutex<SessionState>>> {
        self.inner.lock().await.get(&session_id).cloned()
    }

    pub async fn remove(&self, session_id: Uuid) -> Option<Arc<Mutex<SessionState>>> {
        self.inner.lock().await.remove(&session_id)
    }
}
