//! services/api/src/adapters/memory.rs
//!
//! A deterministic in-memory implementation of both generation ports.
//! The integration tests drive the full session flow against this adapter
//! instead of the network; the call counters let tests assert that
//! pre-flight guards really short-circuit before any service call.

use async_trait::async_trait;
use quizforge_core::domain::{DocumentPart, Language, Quiz, QuizItem, QuizLength};
use quizforge_core::ports::{
    PortError, PortResult, QuizGenerationService, TocExtractionService,
};
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct InMemoryGenerationAdapter {
    topics: Vec<String>,
    toc_calls: AtomicUsize,
    quiz_calls: AtomicUsize,
}

impl InMemoryGenerationAdapter {
    /// The adapter will answer ToC extraction with the given topics; an
    /// empty list reproduces a model that found nothing.
    pub fn new(topics: Vec<String>) -> Self {
        Self {
            topics,
            toc_calls: AtomicUsize::new(0),
            quiz_calls: AtomicUsize::new(0),
        }
    }

    pub fn toc_calls(&self) -> usize {
        self.toc_calls.load(Ordering::SeqCst)
    }

    pub fn quiz_calls(&self) -> usize {
        self.quiz_calls.load(Ordering::SeqCst)
    }

    fn build_quiz(source: &str, language: Language, count: usize) -> Quiz {
        (0..count)
            .map(|i| QuizItem {
                question: format!("[{}] Question {} about {}", language.code(), i + 1, source),
                options: vec![
                    "Option A".to_string(),
                    "Option B".to_string(),
                    "Option C".to_string(),
                    "Option D".to_string(),
                ],
                correct_option_index: i % 4,
                explanation: format!("Explanation {}", i + 1),
            })
            .collect()
    }
}

#[async_trait]
impl TocExtractionService for InMemoryGenerationAdapter {
    async fn extract_table_of_contents(
        &self,
        _parts: &[DocumentPart],
        _language: Language,
    ) -> PortResult<Vec<String>> {
        self.toc_calls.fetch_add(1, Ordering::SeqCst);
        if self.topics.is_empty() {
            return Err(PortError::EmptyResult);
        }
        Ok(self.topics.clone())
    }
}

#[async_trait]
impl QuizGenerationService for InMemoryGenerationAdapter {
    async fn generate_quiz_from_selection(
        &self,
        _parts: &[DocumentPart],
        language: Language,
        quiz_length: QuizLength,
        selected_topics: &[String],
    ) -> PortResult<Quiz> {
        self.quiz_calls.fetch_add(1, Ordering::SeqCst);
        let source = selected_topics.join("; ");
        Ok(Self::build_quiz(
            &source,
            language,
            quiz_length.question_count(),
        ))
    }

    async fn generate_quiz_from_text(
        &self,
        text: &str,
        language: Language,
        quiz_length: QuizLength,
    ) -> PortResult<Quiz> {
        self.quiz_calls.fetch_add(1, Ordering::SeqCst);
        let preview: String = text.chars().take(32).collect();
        Ok(Self::build_quiz(
            &preview,
            language,
            quiz_length.question_count(),
        ))
    }
}
