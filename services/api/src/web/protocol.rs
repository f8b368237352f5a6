//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser client and the
//! API server: the request bodies for each session action and the session
//! snapshot returned so the client can re-render after every action.

use chrono::{DateTime, Utc};
use quizforge_core::session::{Phase, Session};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Request Bodies Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Creates a session. Both fields are optional; the defaults are the
/// Vietnamese locale and a fifty-question quiz.
#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(default)]
pub struct CreateSessionRequest {
    /// Two-letter language code: "en" or "vi".
    pub language: Option<String>,
    /// Requested question count: one of 15, 25, 40, 50.
    pub quiz_length: Option<usize>,
}

/// Updates session preferences. Omitted fields are left unchanged.
#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(default)]
pub struct UpdateSettingsRequest {
    pub language: Option<String>,
    pub quiz_length: Option<usize>,
    /// "file" or "text".
    pub input_mode: Option<String>,
    pub source_text: Option<String>,
}

/// Generates a quiz from the topics the user ticked.
#[derive(Deserialize, Debug, ToSchema)]
pub struct GenerateQuizRequest {
    pub selected_topics: Vec<String>,
}

/// Generates a quiz from pasted text.
#[derive(Deserialize, Debug, ToSchema)]
pub struct QuizFromTextRequest {
    pub text: String,
}

/// Records one answer.
#[derive(Deserialize, Debug, ToSchema)]
pub struct AnswerRequest {
    pub question_index: usize,
    pub option_index: usize,
}

//=========================================================================================
// The Session Snapshot Sent FROM the Server TO the Client (Browser)
//=========================================================================================

#[derive(Serialize, Debug, ToSchema)]
pub struct FileView {
    pub file_name: String,
    pub mime_type: String,
    /// Display token: `image:<id>` for revocable image previews, otherwise
    /// `<kind>:<filename>`.
    pub preview: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct QuizItemView {
    pub question: String,
    pub options: Vec<String>,
    pub correct_option_index: usize,
    pub explanation: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct AnswerView {
    pub question_index: usize,
    pub option_index: usize,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct TimerView {
    pub seconds_remaining: u32,
    pub active: bool,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ScoreView {
    pub correct: usize,
    pub total: usize,
}

/// The complete observable state of one session.
#[derive(Serialize, Debug, ToSchema)]
pub struct SessionView {
    pub session_id: Uuid,
    /// One of: idle, loading, table_of_contents, quiz, results, error.
    pub phase: String,
    pub language: String,
    pub input_mode: String,
    pub quiz_length: usize,
    pub files: Vec<FileView>,
    pub table_of_contents: Vec<String>,
    pub quiz: Vec<QuizItemView>,
    pub answers: Vec<AnswerView>,
    pub error_message: Option<String>,
    pub source_text: String,
    pub timer: TimerView,
    pub generation_in_flight: bool,
    /// Present only on the results screen.
    pub score: Option<ScoreView>,
    pub created_at: DateTime<Utc>,
}

impl SessionView {
    pub fn from_session(session_id: Uuid, session: &Session) -> Self {
        let files = session
            .files()
            .files()
            .iter()
            .zip(session.files().previews())
            .map(|(file, preview)| FileView {
                file_name: file.file_name.clone(),
                mime_type: file.mime_type.clone(),
                preview: preview.token(),
            })
            .collect();

        let quiz = session
            .quiz()
            .iter()
            .map(|item| QuizItemView {
                question: item.question.clone(),
                options: item.options.clone(),
                correct_option_index: item.correct_option_index,
                explanation: item.explanation.clone(),
            })
            .collect();

        let mut answers: Vec<AnswerView> = session
            .answers()
            .iter()
            .map(|(&question_index, &option_index)| AnswerView {
                question_index,
                option_index,
            })
            .collect();
        answers.sort_by_key(|answer| answer.question_index);

        let score = match session.phase() {
            Phase::Results => Some(ScoreView {
                correct: session.score(),
                total: session.quiz().len(),
            }),
            _ => None,
        };

        Self {
            session_id,
            phase: session.phase().as_str().to_string(),
            language: session.language().code().to_string(),
            input_mode: session.input_mode().as_str().to_string(),
            quiz_length: session.quiz_length().question_count(),
            files,
            table_of_contents: session.table_of_contents().to_vec(),
            quiz,
            answers,
            error_message: session.error_message().map(str::to_string),
            source_text: session.source_text().to_string(),
            timer: TimerView {
                seconds_remaining: session.timer().seconds_remaining,
                active: session.timer().active,
            },
            generation_in_flight: session.generation_in_flight(),
            score,
            created_at: session.created_at(),
        }
    }
}
