//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification. Every session action returns
//! the fresh session snapshot so the client can re-render immediately.
//!
//! Generation handlers never hold the session lock across the service call:
//! they validate and flag the request under the lock, release it, await the
//! port, then re-acquire and apply the result (or discard it if the session
//! was reset in the meantime).

use crate::web::{
    protocol::{
        AnswerRequest, AnswerView, CreateSessionRequest, FileView, GenerateQuizRequest,
        QuizFromTextRequest, QuizItemView, ScoreView, SessionView, TimerView,
        UpdateSettingsRequest,
    },
    state::{AppState, SessionState},
    timer_task::countdown_process,
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use quizforge_core::domain::{Language, QuizLength};
use quizforge_core::files::{resolve_mime_type, IngestedFile};
use quizforge_core::session::{AnswerOutcome, InputMode, Phase};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_session_handler,
        get_session_handler,
    ),
    components(
        schemas(
            CreateSessionRequest,
            SessionView,
            FileView,
            QuizItemView,
            AnswerView,
            TimerView,
            ScoreView
        )
    ),
    tags(
        (name = "QuizForge API", description = "Session actions for document-to-quiz generation.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Helpers
//=========================================================================================

fn parse_language(code: &str) -> Result<Language, (StatusCode, String)> {
    Language::from_code(code).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("Unsupported language code: '{code}'"),
        )
    })
}

fn parse_quiz_length(count: usize) -> Result<QuizLength, (StatusCode, String)> {
    QuizLength::from_count(count).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("Quiz length must be one of 15, 25, 40 or 50; got {count}"),
        )
    })
}

fn parse_input_mode(value: &str) -> Result<InputMode, (StatusCode, String)> {
    InputMode::from_name(value).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("Input mode must be 'file' or 'text'; got '{value}'"),
        )
    })
}

async fn resolve_session(
    app_state: &AppState,
    session_id: Uuid,
) -> Result<Arc<Mutex<SessionState>>, (StatusCode, String)> {
    app_state.sessions.get(session_id).await.ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("Unknown session: {session_id}"),
        )
    })
}

/// Drains a multipart body into ingested files, resolving each content type
/// from the declared type or the filename extension.
async fn collect_files(
    multipart: &mut Multipart,
) -> Result<Vec<IngestedFile>, (StatusCode, String)> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let file_name = field.file_name().unwrap_or("untitled").to_string();
        let declared = field.content_type().map(|value| value.to_string());
        let data = field.bytes().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read file bytes: {}", e),
            )
        })?;
        let mime_type = resolve_mime_type(&file_name, declared.as_deref());
        files.push(IngestedFile::new(file_name, mime_type, data));
    }
    Ok(files)
}

//=========================================================================================
// Session Lifecycle Handlers
//=========================================================================================

/// Create a new quiz session.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created successfully", body = SessionView),
        (status = 400, description = "Unknown language code or quiz length")
    )
)]
pub async fn create_session_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let language = match payload.language.as_deref() {
        Some(code) => parse_language(code)?,
        None => Language::default(),
    };
    let quiz_length = match payload.quiz_length {
        Some(count) => parse_quiz_length(count)?,
        None => QuizLength::default(),
    };

    let (session_id, session_lock) = app_state
        .sessions
        .create(language, quiz_length, app_state.config.quiz_duration_secs)
        .await;
    info!("Created session {session_id}");

    let state = session_lock.lock().await;
    Ok((
        StatusCode::CREATED,
        Json(SessionView::from_session(session_id, &state.session)),
    ))
}

/// Fetch the current snapshot of a session.
#[utoipa::path(
    get,
    path = "/sessions/{session_id}",
    params(
        ("session_id" = Uuid, Path, description = "The session to inspect.")
    ),
    responses(
        (status = 200, description = "Current session snapshot", body = SessionView),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session_lock = resolve_session(&app_state, session_id).await?;
    let state = session_lock.lock().await;
    Ok(Json(SessionView::from_session(session_id, &state.session)))
}

pub async fn update_settings_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let language = payload
        .language
        .as_deref()
        .map(parse_language)
        .transpose()?;
    let quiz_length = payload.quiz_length.map(parse_quiz_length).transpose()?;
    let input_mode = payload
        .input_mode
        .as_deref()
        .map(parse_input_mode)
        .transpose()?;

    let session_lock = resolve_session(&app_state, session_id).await?;
    let mut state = session_lock.lock().await;
    if let Some(language) = language {
        state.session.set_language(language);
    }
    if let Some(quiz_length) = quiz_length {
        state.session.set_quiz_length(quiz_length);
    }
    if let Some(input_mode) = input_mode {
        state.session.set_input_mode(input_mode);
    }
    if let Some(text) = payload.source_text {
        state.session.set_source_text(text);
    }
    Ok(Json(SessionView::from_session(session_id, &state.session)))
}

pub async fn delete_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match app_state.sessions.remove(session_id).await {
        Some(session_lock) => {
            session_lock.lock().await.stop_countdown();
            info!("Dropped session {session_id}");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err((
            StatusCode::NOT_FOUND,
            format!("Unknown session: {session_id}"),
        )),
    }
}

//=========================================================================================
// File Intake Handlers
//=========================================================================================

pub async fn add_files_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session_lock = resolve_session(&app_state, session_id).await?;
    let files = collect_files(&mut multipart).await?;

    let mut state = session_lock.lock().await;
    if !files.is_empty() && state.session.add_files(files).is_err() {
        return Err((
            StatusCode::CONFLICT,
            "Files can only be changed on the start screen.".to_string(),
        ));
    }
    Ok(Json(SessionView::from_session(session_id, &state.session)))
}

/// Replaces the file list wholesale. An empty body clears it; either way
/// every old image preview is released before new ones are created.
pub async fn replace_files_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session_lock = resolve_session(&app_state, session_id).await?;
    let files = collect_files(&mut multipart).await?;

    let mut state = session_lock.lock().await;
    if state.session.replace_files(files).is_err() {
        return Err((
            StatusCode::CONFLICT,
            "Files can only be changed on the start screen.".to_string(),
        ));
    }
    Ok(Json(SessionView::from_session(session_id, &state.session)))
}

pub async fn remove_file_handler(
    State(app_state): State<Arc<AppState>>,
    Path((session_id, index)): Path<(Uuid, usize)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session_lock = resolve_session(&app_state, session_id).await?;
    let mut state = session_lock.lock().await;
    if state.session.phase() != Phase::Idle {
        return Err((
            StatusCode::CONFLICT,
            "Files can only be changed on the start screen.".to_string(),
        ));
    }
    if state.session.remove_file(index).is_err() {
        return Err((StatusCode::NOT_FOUND, format!("No file at index {index}")));
    }
    Ok(Json(SessionView::from_session(session_id, &state.session)))
}

//=========================================================================================
// Generation Handlers
//=========================================================================================

pub async fn extract_toc_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session_lock = resolve_session(&app_state, session_id).await?;

    let started = {
        let mut state = session_lock.lock().await;
        match state.session.begin_toc_extraction() {
            Ok(parts) => Some((state.session.epoch(), parts, state.session.language())),
            // Either a quiet no-op or a pre-flight rejection already applied
            // to the session; the snapshot tells the client which.
            Err(_) => None,
        }
    };

    let Some((epoch, parts, language)) = started else {
        let state = session_lock.lock().await;
        return Ok(Json(SessionView::from_session(session_id, &state.session)));
    };

    let result = app_state
        .toc_adapter
        .extract_table_of_contents(&parts, language)
        .await;

    let mut state = session_lock.lock().await;
    if !state.session.finish_toc_extraction(epoch, result) {
        info!("Discarding stale table-of-contents result for session {session_id}");
    }
    Ok(Json(SessionView::from_session(session_id, &state.session)))
}

pub async fn generate_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<GenerateQuizRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session_lock = resolve_session(&app_state, session_id).await?;

    let started = {
        let mut state = session_lock.lock().await;
        match state
            .session
            .begin_quiz_from_selection(&payload.selected_topics)
        {
            Ok(parts) => {
                // A countdown from a previous attempt must never keep ticking
                // into the new quiz.
                state.stop_countdown();
                Some((
                    state.session.epoch(),
                    parts,
                    state.session.language(),
                    state.session.quiz_length(),
                ))
            }
            Err(_) => None,
        }
    };

    let Some((epoch, parts, language, quiz_length)) = started else {
        let state = session_lock.lock().await;
        return Ok(Json(SessionView::from_session(session_id, &state.session)));
    };

    let result = app_state
        .quiz_adapter
        .generate_quiz_from_selection(&parts, language, quiz_length, &payload.selected_topics)
        .await;

    let mut state = session_lock.lock().await;
    if !state.session.finish_quiz_generation(epoch, result) {
        info!("Discarding stale quiz result for session {session_id}");
    }
    Ok(Json(SessionView::from_session(session_id, &state.session)))
}

pub async fn generate_quiz_from_text_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<QuizFromTextRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session_lock = resolve_session(&app_state, session_id).await?;

    let started = {
        let mut state = session_lock.lock().await;
        match state.session.begin_quiz_from_text(&payload.text) {
            Ok(text) => {
                state.stop_countdown();
                Some((
                    state.session.epoch(),
                    text,
                    state.session.language(),
                    state.session.quiz_length(),
                ))
            }
            Err(_) => None,
        }
    };

    let Some((epoch, text, language, quiz_length)) = started else {
        let state = session_lock.lock().await;
        return Ok(Json(SessionView::from_session(session_id, &state.session)));
    };

    let result = app_state
        .quiz_adapter
        .generate_quiz_from_text(&text, language, quiz_length)
        .await;

    let mut state = session_lock.lock().await;
    if !state.session.finish_quiz_generation(epoch, result) {
        info!("Discarding stale quiz result for session {session_id}");
    }
    Ok(Json(SessionView::from_session(session_id, &state.session)))
}

//=========================================================================================
// Quiz-Taking Handlers
//=========================================================================================

pub async fn record_answer_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session_lock = resolve_session(&app_state, session_id).await?;

    let mut state = session_lock.lock().await;
    if let Ok(AnswerOutcome::TimerStarted) = state
        .session
        .record_answer(payload.question_index, payload.option_index)
    {
        state.stop_countdown();
        let token = state.countdown_token.clone();
        tokio::spawn(countdown_process(session_lock.clone(), token));
        info!("Countdown started for session {session_id}");
    }
    Ok(Json(SessionView::from_session(session_id, &state.session)))
}

pub async fn submit_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session_lock = resolve_session(&app_state, session_id).await?;
    let mut state = session_lock.lock().await;
    if state.session.submit().is_ok() {
        state.stop_countdown();
    }
    Ok(Json(SessionView::from_session(session_id, &state.session)))
}

pub async fn regenerate_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session_lock = resolve_session(&app_state, session_id).await?;
    let mut state = session_lock.lock().await;
    if state.session.regenerate().is_ok() {
        state.stop_countdown();
    }
    Ok(Json(SessionView::from_session(session_id, &state.session)))
}

pub async fn reset_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session_lock = resolve_session(&app_state, session_id).await?;
    let mut state = session_lock.lock().await;
    state.stop_countdown();
    state.session.reset();
    Ok(Json(SessionView::from_session(session_id, &state.session)))
}
