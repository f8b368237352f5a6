//! crates/quizforge_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any transport or serialization format.

use bytes::Bytes;
use std::collections::HashMap;

/// The number of answer options every quiz question carries.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// The language used for prompts and generated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    En,
    #[default]
    Vi,
}

impl Language {
    /// The two-letter code used on the wire and in configuration.
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Vi => "vi",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Language::En),
            "vi" => Some(Language::Vi),
            _ => None,
        }
    }
}

/// The number of questions the user asked for. Only a fixed set of sizes
/// is offered, matching the selector the presentation layer renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizLength {
    Fifteen,
    TwentyFive,
    Forty,
    Fifty,
}

impl Default for QuizLength {
    fn default() -> Self {
        QuizLength::Fifty
    }
}

impl QuizLength {
    pub fn question_count(self) -> usize {
        match self {
            QuizLength::Fifteen => 15,
            QuizLength::TwentyFive => 25,
            QuizLength::Forty => 40,
            QuizLength::Fifty => 50,
        }
    }

    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            15 => Some(QuizLength::Fifteen),
            25 => Some(QuizLength::TwentyFive),
            40 => Some(QuizLength::Forty),
            50 => Some(QuizLength::Fifty),
            _ => None,
        }
    }
}

/// One multiple-choice question produced by the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizItem {
    pub question: String,
    pub options: Vec<String>,
    pub correct_option_index: usize,
    pub explanation: String,
}

impl QuizItem {
    /// Structural validity: exactly four options and an index that points at
    /// one of them. Anything else coming back from the model is rejected at
    /// the adapter boundary.
    pub fn is_well_formed(&self) -> bool {
        self.options.len() == OPTIONS_PER_QUESTION
            && self.correct_option_index < self.options.len()
    }
}

/// An ordered quiz; immutable while it is being taken.
pub type Quiz = Vec<QuizItem>;

/// Question index → selected option index. Built one entry per answered
/// question; looked up by key, never by position.
pub type AnswerMap = HashMap<usize, usize>;

/// Counts the answers that match the quiz's correct option indices.
pub fn score(quiz: &[QuizItem], answers: &AnswerMap) -> usize {
    quiz.iter()
        .enumerate()
        .filter(|(index, item)| answers.get(index) == Some(&item.correct_option_index))
        .count()
}

/// A document payload ready to be sent to the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPart {
    pub mime_type: String,
    pub data: Bytes,
}
