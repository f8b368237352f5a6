//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for the Gemini generation API.
//! It implements the `TocExtractionService` and `QuizGenerationService`
//! ports from the `core` crate by calling `generateContent` with inline
//! document parts, an instruction, and a JSON response schema.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use async_trait::async_trait;
use quizforge_core::domain::{DocumentPart, Language, Quiz, QuizItem, QuizLength};
use quizforge_core::ports::{
    PortError, PortResult, QuizGenerationService, TocExtractionService,
};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::error;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// One user-facing message per operation. The underlying causes are logged,
// never returned.
const TOC_FAILURE: &str =
    "Failed to generate a table of contents. The document might be unreadable.";
const SELECTION_FAILURE: &str =
    "Failed to generate a quiz. The model may be overloaded or the document could not be processed.";
const TEXT_FAILURE: &str = "Failed to generate a quiz from the provided text.";

//=========================================================================================
// Prompts
//=========================================================================================

fn toc_prompt(language: Language) -> &'static str {
    match language {
        Language::Vi => {
            "Bạn là trợ lý chuyên phân tích tài liệu. Hãy xác định các chương, phần hoặc \
             chủ đề chính trong các tệp được cung cấp và trả về danh sách tiêu đề dưới \
             dạng một mảng JSON gồm các chuỗi. Giữ tiêu đề ngắn gọn và đúng với nội dung \
             tài liệu."
        }
        Language::En => {
            "You are an expert document analyzer. Identify the main chapters, sections, \
             or topics in the provided files and return the list of topic titles as a \
             JSON array of strings. Keep the titles concise and true to the document's \
             content."
        }
    }
}

fn selection_quiz_prompt(
    language: Language,
    question_count: usize,
    selected_topics: &[String],
) -> String {
    let topics = selected_topics.join("; ");
    match language {
        Language::Vi => format!(
            "Bạn là chuyên gia tạo nội dung giáo dục. Hãy tạo một bài kiểm tra trắc \
             nghiệm gồm {question_count} câu hỏi CHỈ dựa trên nội dung thuộc các chủ đề \
             sau: {topics}. Mỗi câu hỏi có bốn phương án riêng biệt, đúng một phương án, \
             kèm chỉ số của phương án đúng (0 cho A, 1 cho B, v.v.) và một lời giải \
             thích ngắn gọn dựa vào tài liệu. Toàn bộ nội dung phải bằng ngôn ngữ gốc \
             của tài liệu và tuân thủ schema đã cho."
        ),
        Language::En => format!(
            "You are an expert in creating educational content. Create a multiple-choice \
             quiz of {question_count} questions based ONLY on the content found under \
             the following topics: {topics}. Each question has four distinct options, \
             exactly one of which is correct, plus the correct option's index (0 for A, \
             1 for B, and so on) and a concise explanation referencing the document. All \
             content must be in the original language of the document and adhere to the \
             provided schema."
        ),
    }
}

fn text_quiz_prompt(language: Language, question_count: usize) -> String {
    match language {
        Language::Vi => format!(
            "Bạn là chuyên gia tạo nội dung giáo dục. Hãy phân tích đoạn văn bản được \
             cung cấp và tạo một bài kiểm tra trắc nghiệm gồm {question_count} câu hỏi. \
             Mỗi câu hỏi có bốn phương án riêng biệt, đúng một phương án, kèm chỉ số của \
             phương án đúng (0 cho A, 1 cho B, v.v.) và một lời giải thích ngắn gọn. \
             Toàn bộ nội dung phải bằng ngôn ngữ gốc của văn bản và tuân thủ schema đã \
             cho."
        ),
        Language::En => format!(
            "You are an expert in creating educational content. Analyze the provided \
             text and create a multiple-choice quiz of {question_count} questions. Each \
             question has four distinct options, exactly one of which is correct, plus \
             the correct option's index (0 for A, 1 for B, and so on) and a concise \
             explanation. All content must be in the original language of the text and \
             adhere to the provided schema."
        ),
    }
}

//=========================================================================================
// Response Schemas
//=========================================================================================

fn toc_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": { "type": "STRING" }
    })
}

fn quiz_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "question": { "type": "STRING" },
                "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                "correctOptionIndex": { "type": "INTEGER" },
                "explanation": { "type": "STRING" }
            },
            "required": ["question", "options", "correctOptionIndex", "explanation"]
        }
    })
}

//=========================================================================================
// Wire Format
//=========================================================================================

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<WireContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct WireContent {
    parts: Vec<WirePart>,
}

#[derive(Serialize)]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl WirePart {
    fn text(value: impl Into<String>) -> Self {
        Self {
            text: Some(value.into()),
            inline_data: None,
        }
    }

    fn inline(part: &DocumentPart) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: part.mime_type.clone(),
                data: BASE64.encode(&part.data),
            }),
        }
    }
}

#[derive(Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
    #[serde(rename = "responseSchema")]
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// The items as the model returns them, before shape validation.
#[derive(Deserialize)]
struct WireQuizItem {
    question: String,
    options: Vec<String>,
    #[serde(rename = "correctOptionIndex")]
    correct_option_index: usize,
    explanation: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements both generation ports against the Gemini API.
#[derive(Clone)]
pub struct GeminiAdapter {
    client: reqwest::Client,
    api_key: Secret<String>,
    model: String,
    base_url: String,
}

impl GeminiAdapter {
    /// Creates a new `GeminiAdapter` for the given model.
    pub fn new(api_key: Secret<String>, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the API base URL (used to point at a stand-in server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sends one `generateContent` request and returns the first candidate's
    /// text. Errors are internal causes; callers normalize them per
    /// operation.
    async fn invoke(&self, parts: Vec<WirePart>, schema: Value) -> Result<String, String> {
        let request = GenerateContentRequest {
            contents: vec![WireContent { parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("failed to read response body: {e}"))?;
        if !status.is_success() {
            return Err(format!("service responded with {status}: {body}"));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| format!("response body was not valid JSON: {e}"))?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .map(|part| part.text)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err("response contained no candidate text".to_string());
        }
        Ok(text)
    }
}

fn parse_topics(raw: &str) -> Result<Vec<String>, String> {
    serde_json::from_str::<Vec<String>>(raw.trim())
        .map_err(|e| format!("response was not a JSON array of strings: {e}"))
}

fn parse_quiz(raw: &str, quiz_length: QuizLength) -> Result<Quiz, String> {
    let items: Vec<WireQuizItem> = serde_json::from_str(raw.trim())
        .map_err(|e| format!("response was not a JSON array of quiz items: {e}"))?;

    let mut quiz: Quiz = Vec::with_capacity(items.len());
    for (index, wire) in items.into_iter().enumerate() {
        let item = QuizItem {
            question: wire.question,
            options: wire.options,
            correct_option_index: wire.correct_option_index,
            explanation: wire.explanation,
        };
        if !item.is_well_formed() {
            return Err(format!(
                "quiz item {index} is malformed: {} options, correct index {}",
                item.options.len(),
                item.correct_option_index
            ));
        }
        quiz.push(item);
    }

    // The model occasionally over-delivers; never hand back more questions
    // than were requested.
    quiz.truncate(quiz_length.question_count());
    Ok(quiz)
}

//=========================================================================================
// Port Trait Implementations
//=========================================================================================

#[async_trait]
impl TocExtractionService for GeminiAdapter {
    async fn extract_table_of_contents(
        &self,
        parts: &[DocumentPart],
        language: Language,
    ) -> PortResult<Vec<String>> {
        let mut wire_parts: Vec<WirePart> = parts.iter().map(WirePart::inline).collect();
        wire_parts.push(WirePart::text(toc_prompt(language)));

        let raw = self.invoke(wire_parts, toc_schema()).await.map_err(|cause| {
            error!("Table-of-contents extraction failed: {cause}");
            PortError::GenerationFailure(TOC_FAILURE.to_string())
        })?;
        let topics = parse_topics(&raw).map_err(|cause| {
            error!("Table-of-contents extraction failed: {cause}");
            PortError::GenerationFailure(TOC_FAILURE.to_string())
        })?;

        if topics.is_empty() {
            return Err(PortError::EmptyResult);
        }
        Ok(topics)
    }
}

#[async_trait]
impl QuizGenerationService for GeminiAdapter {
    async fn generate_quiz_from_selection(
        &self,
        parts: &[DocumentPart],
        language: Language,
        quiz_length: QuizLength,
        selected_topics: &[String],
    ) -> PortResult<Quiz> {
        let mut wire_parts: Vec<WirePart> = parts.iter().map(WirePart::inline).collect();
        wire_parts.push(WirePart::text(selection_quiz_prompt(
            language,
            quiz_length.question_count(),
            selected_topics,
        )));

        let raw = self.invoke(wire_parts, quiz_schema()).await.map_err(|cause| {
            error!("Quiz generation from selection failed: {cause}");
            PortError::GenerationFailure(SELECTION_FAILURE.to_string())
        })?;
        let quiz = parse_quiz(&raw, quiz_length).map_err(|cause| {
            error!("Quiz generation from selection failed: {cause}");
            PortError::GenerationFailure(SELECTION_FAILURE.to_string())
        })?;

        if quiz.is_empty() {
            return Err(PortError::EmptyResult);
        }
        Ok(quiz)
    }

    async fn generate_quiz_from_text(
        &self,
        text: &str,
        language: Language,
        quiz_length: QuizLength,
    ) -> PortResult<Quiz> {
        let prompt = text_quiz_prompt(language, quiz_length.question_count());
        let wire_parts = vec![WirePart::text(format!("{prompt}\n\n{text}"))];

        let raw = self.invoke(wire_parts, quiz_schema()).await.map_err(|cause| {
            error!("Quiz generation from text failed: {cause}");
            PortError::GenerationFailure(TEXT_FAILURE.to_string())
        })?;
        let quiz = parse_quiz(&raw, quiz_length).map_err(|cause| {
            error!("Quiz generation from text failed: {cause}");
            PortError::GenerationFailure(TEXT_FAILURE.to_string())
        })?;

        if quiz.is_empty() {
            return Err(PortError::EmptyResult);
        }
        Ok(quiz)
    }
}
