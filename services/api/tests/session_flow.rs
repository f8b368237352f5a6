// tests/session_flow.rs
//
// End-to-end session flows over HTTP, driven against the in-memory
// generation adapter so no network or API key is involved.

use api_lib::{
    adapters::InMemoryGenerationAdapter,
    config::Config,
    web::{
        create_router,
        state::{AppState, SessionRegistry},
    },
};
use serde_json::{json, Value};
use std::sync::Arc;

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        log_level: tracing::Level::ERROR,
        gemini_api_key: None,
        gemini_model: "test-model".to_string(),
        quiz_duration_secs: 3600,
        cors_allowed_origin: "http://localhost:3000".to_string(),
    }
}

/// Spawns the app on a random port with the given adapter.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app(adapter: Arc<InMemoryGenerationAdapter>) -> String {
    let app_state = Arc::new(AppState {
        config: Arc::new(test_config()),
        toc_adapter: adapter.clone(),
        quiz_adapter: adapter,
        sessions: SessionRegistry::default(),
    });
    let app = create_router(app_state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

fn default_adapter() -> Arc<InMemoryGenerationAdapter> {
    Arc::new(InMemoryGenerationAdapter::new(vec![
        "Chapter 1: Introduction".to_string(),
        "Chapter 2: Core Concepts".to_string(),
    ]))
}

async fn create_session(client: &reqwest::Client, address: &str, body: Value) -> Value {
    let response = client
        .post(format!("{address}/sessions"))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    response.json().await.expect("Invalid JSON response")
}

async fn post_json(client: &reqwest::Client, url: String, body: Value) -> Value {
    let response = client
        .post(url)
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    response.json().await.expect("Invalid JSON response")
}

async fn post_empty(client: &reqwest::Client, url: String) -> Value {
    let response = client
        .post(url)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    response.json().await.expect("Invalid JSON response")
}

fn file_part(name: &str, mime: Option<&str>) -> reqwest::multipart::Part {
    let part = reqwest::multipart::Part::bytes(b"payload".to_vec()).file_name(name.to_string());
    match mime {
        Some(mime) => part.mime_str(mime).unwrap(),
        None => part,
    }
}

async fn upload_files(
    client: &reqwest::Client,
    address: &str,
    session_id: &str,
    parts: Vec<reqwest::multipart::Part>,
) -> Value {
    let mut form = reqwest::multipart::Form::new();
    for part in parts {
        form = form.part("file", part);
    }
    let response = client
        .post(format!("{address}/sessions/{session_id}/files"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    response.json().await.expect("Invalid JSON response")
}

#[tokio::test]
async fn full_file_mode_flow_produces_scored_results() {
    let adapter = default_adapter();
    let address = spawn_app(adapter.clone()).await;
    let client = reqwest::Client::new();

    let session = create_session(
        &client,
        &address,
        json!({"language": "en", "quiz_length": 15}),
    )
    .await;
    let id = session["session_id"].as_str().unwrap().to_string();
    assert_eq!(session["phase"], "idle");
    assert_eq!(session["quiz_length"], 15);

    let view = upload_files(
        &client,
        &address,
        &id,
        vec![file_part("chapter.pdf", Some("application/pdf"))],
    )
    .await;
    assert_eq!(view["files"].as_array().unwrap().len(), 1);
    assert_eq!(view["files"][0]["preview"], "pdf:chapter.pdf");

    let view = post_empty(&client, format!("{address}/sessions/{id}/toc")).await;
    assert_eq!(view["phase"], "table_of_contents");
    assert_eq!(view["table_of_contents"].as_array().unwrap().len(), 2);
    assert_eq!(adapter.toc_calls(), 1);

    let view = post_json(
        &client,
        format!("{address}/sessions/{id}/quiz"),
        json!({"selected_topics": ["Chapter 1: Introduction"]}),
    )
    .await;
    assert_eq!(view["phase"], "quiz");
    assert_eq!(view["quiz"].as_array().unwrap().len(), 15);
    assert_eq!(view["timer"]["active"], false);
    assert_eq!(view["timer"]["seconds_remaining"], 3600);
    assert_eq!(adapter.quiz_calls(), 1);

    // The first answer arms the countdown. Question 0's correct index is 0.
    let view = post_json(
        &client,
        format!("{address}/sessions/{id}/answers"),
        json!({"question_index": 0, "option_index": 0}),
    )
    .await;
    assert_eq!(view["timer"]["active"], true);

    // Question 1's correct index is 1; answer it wrong.
    post_json(
        &client,
        format!("{address}/sessions/{id}/answers"),
        json!({"question_index": 1, "option_index": 3}),
    )
    .await;

    let view = post_empty(&client, format!("{address}/sessions/{id}/submit")).await;
    assert_eq!(view["phase"], "results");
    assert_eq!(view["score"]["correct"], 1);
    assert_eq!(view["score"]["total"], 15);
    assert_eq!(view["timer"]["active"], false);
    assert_eq!(view["answers"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn docx_upload_blocks_toc_extraction_before_any_call() {
    let adapter = default_adapter();
    let address = spawn_app(adapter.clone()).await;
    let client = reqwest::Client::new();

    let session = create_session(&client, &address, json!({})).await;
    let id = session["session_id"].as_str().unwrap().to_string();

    upload_files(
        &client,
        &address,
        &id,
        vec![
            file_part("chapter.pdf", Some("application/pdf")),
            // No declared type: the .docx extension decides.
            file_part("essay.docx", None),
        ],
    )
    .await;

    let view = post_empty(&client, format!("{address}/sessions/{id}/toc")).await;
    assert_eq!(view["phase"], "error");
    assert!(view["error_message"]
        .as_str()
        .unwrap()
        .contains("essay.docx"));
    assert_eq!(adapter.toc_calls(), 0);
    assert_eq!(adapter.quiz_calls(), 0);
}

#[tokio::test]
async fn empty_toc_result_is_an_error_not_an_empty_success() {
    let adapter = Arc::new(InMemoryGenerationAdapter::new(Vec::new()));
    let address = spawn_app(adapter.clone()).await;
    let client = reqwest::Client::new();

    let session = create_session(&client, &address, json!({})).await;
    let id = session["session_id"].as_str().unwrap().to_string();

    upload_files(
        &client,
        &address,
        &id,
        vec![file_part("chapter.pdf", Some("application/pdf"))],
    )
    .await;

    let view = post_empty(&client, format!("{address}/sessions/{id}/toc")).await;
    assert_eq!(view["phase"], "error");
    assert!(view["table_of_contents"].as_array().unwrap().is_empty());
    assert_eq!(adapter.toc_calls(), 1);
}

#[tokio::test]
async fn blank_text_generates_nothing() {
    let adapter = default_adapter();
    let address = spawn_app(adapter.clone()).await;
    let client = reqwest::Client::new();

    let session = create_session(&client, &address, json!({})).await;
    let id = session["session_id"].as_str().unwrap().to_string();

    let response = client
        .put(format!("{address}/sessions/{id}/settings"))
        .json(&json!({"input_mode": "text"}))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    let view = post_json(
        &client,
        format!("{address}/sessions/{id}/quiz-from-text"),
        json!({"text": "   \n\t  "}),
    )
    .await;
    assert_eq!(view["phase"], "idle");
    assert_eq!(adapter.quiz_calls(), 0);
}

#[tokio::test]
async fn text_mode_flow_keeps_source_through_regeneration() {
    let adapter = default_adapter();
    let address = spawn_app(adapter.clone()).await;
    let client = reqwest::Client::new();

    let session = create_session(&client, &address, json!({"quiz_length": 25})).await;
    let id = session["session_id"].as_str().unwrap().to_string();

    client
        .put(format!("{address}/sessions/{id}/settings"))
        .json(&json!({"input_mode": "text"}))
        .send()
        .await
        .expect("Failed to execute request");

    let view = post_json(
        &client,
        format!("{address}/sessions/{id}/quiz-from-text"),
        json!({"text": "Ownership and borrowing keep Rust memory safe."}),
    )
    .await;
    assert_eq!(view["phase"], "quiz");
    assert_eq!(view["quiz"].as_array().unwrap().len(), 25);

    post_json(
        &client,
        format!("{address}/sessions/{id}/answers"),
        json!({"question_index": 0, "option_index": 0}),
    )
    .await;
    post_empty(&client, format!("{address}/sessions/{id}/submit")).await;

    let view = post_empty(&client, format!("{address}/sessions/{id}/regenerate")).await;
    assert_eq!(view["phase"], "idle");
    assert_eq!(view["input_mode"], "text");
    assert_eq!(
        view["source_text"],
        "Ownership and borrowing keep Rust memory safe."
    );
    assert!(view["quiz"].as_array().unwrap().is_empty());
    assert!(view["answers"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn reset_is_idempotent_over_http() {
    let adapter = default_adapter();
    let address = spawn_app(adapter.clone()).await;
    let client = reqwest::Client::new();

    let session = create_session(&client, &address, json!({"language": "en"})).await;
    let id = session["session_id"].as_str().unwrap().to_string();

    upload_files(
        &client,
        &address,
        &id,
        vec![file_part("page.png", Some("image/png"))],
    )
    .await;
    post_empty(&client, format!("{address}/sessions/{id}/toc")).await;

    let first = post_empty(&client, format!("{address}/sessions/{id}/reset")).await;
    assert_eq!(first["phase"], "idle");
    assert!(first["files"].as_array().unwrap().is_empty());
    assert!(first["table_of_contents"].as_array().unwrap().is_empty());
    assert_eq!(first["language"], "en");

    let second = post_empty(&client, format!("{address}/sessions/{id}/reset")).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn removing_a_file_keeps_lists_aligned() {
    let adapter = default_adapter();
    let address = spawn_app(adapter.clone()).await;
    let client = reqwest::Client::new();

    let session = create_session(&client, &address, json!({})).await;
    let id = session["session_id"].as_str().unwrap().to_string();

    let view = upload_files(
        &client,
        &address,
        &id,
        vec![
            file_part("first.png", Some("image/png")),
            file_part("second.jpg", None),
        ],
    )
    .await;
    assert_eq!(view["files"].as_array().unwrap().len(), 2);
    assert!(view["files"][0]["preview"]
        .as_str()
        .unwrap()
        .starts_with("image:"));
    assert_eq!(view["files"][1]["mime_type"], "image/jpeg");

    let response = client
        .delete(format!("{address}/sessions/{id}/files/0"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let view: Value = response.json().await.unwrap();
    assert_eq!(view["files"].as_array().unwrap().len(), 1);
    assert_eq!(view["files"][0]["file_name"], "second.jpg");
}

#[tokio::test]
async fn unknown_session_returns_404() {
    let adapter = default_adapter();
    let address = spawn_app(adapter).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{address}/sessions/{}", uuid::Uuid::new_v4()))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn invalid_quiz_length_is_rejected() {
    let adapter = default_adapter();
    let address = spawn_app(adapter).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{address}/sessions"))
        .json(&json!({"quiz_length": 30}))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);
}
