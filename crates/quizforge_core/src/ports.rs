//! crates/quizforge_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the specific generation backend.

use crate::domain::{DocumentPart, Language, Quiz, QuizLength};
use async_trait::async_trait;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The error type for all port operations. Every failure is already phrased
/// for display; callers distinguish the kinds, never the underlying causes.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// One or more selected files cannot be used for the requested
    /// operation. Raised pre-flight, before any remote call.
    #[error("Unsupported file type: {}", .0.join(", "))]
    UnsupportedFileType(Vec<String>),

    /// The service answered with a syntactically valid but empty collection.
    /// A zero-item table of contents or quiz is useless, so this is a
    /// failure, not an empty success.
    #[error("The model returned no usable content")]
    EmptyResult,

    /// Transport error, malformed JSON, or a response that does not match
    /// the requested shape. The underlying cause is logged, not exposed.
    #[error("{0}")]
    GenerationFailure(String),

    /// A selected file could not be encoded into a request payload.
    #[error("Failed to read file: {0}")]
    ReadFailure(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait TocExtractionService: Send + Sync {
    /// Extracts an ordered list of topic titles from the given documents.
    /// Returns `PortError::EmptyResult` when the model produces no topics.
    async fn extract_table_of_contents(
        &self,
        parts: &[DocumentPart],
        language: Language,
    ) -> PortResult<Vec<String>>;
}

#[async_trait]
pub trait QuizGenerationService: Send + Sync {
    /// Generates a quiz sourced only from the selected topics of the given
    /// documents: at most `quiz_length` items, each with four options, one
    /// correct index, and an explanation, in the document's language.
    async fn generate_quiz_from_selection(
        &self,
        parts: &[DocumentPart],
        language: Language,
        quiz_length: QuizLength,
        selected_topics: &[String],
    ) -> PortResult<Quiz>;

    /// Same contract, sourced from raw text, with no topic filtering.
    async fn generate_quiz_from_text(
        &self,
        text: &str,
        language: Language,
        quiz_length: QuizLength,
    ) -> PortResult<Quiz>;
}
