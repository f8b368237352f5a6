//! crates/quizforge_core/src/session.rs
//!
//! The session aggregate and its state machine. A session owns everything
//! one user interaction accumulates: ingested files, the extracted table of
//! contents, the generated quiz, the answers, and the countdown bookkeeping.
//! All transitions go through the action methods below; the controller in
//! the api service performs the asynchronous generation calls between a
//! `begin_*` and its matching `finish_*`.

use crate::domain::{self, AnswerMap, DocumentPart, Language, Quiz, QuizLength};
use crate::files::{FileStore, IngestedFile};
use crate::ports::{PortError, PortResult};
use chrono::{DateTime, Utc};

/// The top-level phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    TableOfContents,
    Quiz,
    Results,
    Error,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::TableOfContents => "table_of_contents",
            Phase::Quiz => "quiz",
            Phase::Results => "results",
            Phase::Error => "error",
        }
    }
}

/// Whether the quiz is sourced from uploaded files or pasted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    File,
    Text,
}

impl InputMode {
    pub fn as_str(self) -> &'static str {
        match self {
            InputMode::File => "file",
            InputMode::Text => "text",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value {
            "file" => Some(InputMode::File),
            "text" => Some(InputMode::Text),
            _ => None,
        }
    }
}

/// Countdown bookkeeping for one quiz attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    pub seconds_remaining: u32,
    pub active: bool,
}

impl TimerState {
    fn new(duration_secs: u32) -> Self {
        Self {
            seconds_remaining: duration_secs,
            active: false,
        }
    }

    fn reset(&mut self, duration_secs: u32) {
        self.seconds_remaining = duration_secs;
        self.active = false;
    }

    fn tick(&mut self) -> TimerTick {
        if !self.active {
            return TimerTick::Inactive;
        }
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining == 0 {
            // Deactivate so expiry is observed exactly once.
            self.active = false;
            TimerTick::Expired
        } else {
            TimerTick::Running(self.seconds_remaining)
        }
    }
}

/// The outcome of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    /// The timer is not running (or the session left the quiz phase).
    Inactive,
    /// Still counting down; carries the seconds remaining.
    Running(u32),
    /// The countdown just reached zero. Reported once.
    Expired,
}

/// Why a requested action did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRefused {
    /// A guard failed quietly; the session is unchanged.
    NothingToDo,
    /// The session moved to the error phase instead; the display message
    /// has been stored.
    Rejected,
}

/// What recording an answer did beyond storing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Recorded,
    /// This was the first answer; the countdown just became active.
    TimerStarted,
}

/// The root mutable aggregate for one user interaction.
pub struct Session {
    phase: Phase,
    language: Language,
    input_mode: InputMode,
    file_store: FileStore,
    table_of_contents: Vec<String>,
    quiz: Quiz,
    answers: AnswerMap,
    error_message: Option<String>,
    quiz_length: QuizLength,
    source_text: String,
    timer: TimerState,
    quiz_duration_secs: u32,
    generation_in_flight: bool,
    epoch: u64,
    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(language: Language, quiz_length: QuizLength, quiz_duration_secs: u32) -> Self {
        Self {
            phase: Phase::Idle,
            language,
            input_mode: InputMode::File,
            file_store: FileStore::default(),
            table_of_contents: Vec::new(),
            quiz: Vec::new(),
            answers: AnswerMap::new(),
            error_message: None,
            quiz_length,
            source_text: String::new(),
            timer: TimerState::new(quiz_duration_secs),
            quiz_duration_secs,
            generation_in_flight: false,
            epoch: 0,
            created_at: Utc::now(),
        }
    }

    //=====================================================================================
    // Accessors
    //=====================================================================================

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    pub fn files(&self) -> &FileStore {
        &self.file_store
    }

    pub fn table_of_contents(&self) -> &[String] {
        &self.table_of_contents
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn quiz_length(&self) -> QuizLength {
        self.quiz_length
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn timer(&self) -> TimerState {
        self.timer
    }

    pub fn generation_in_flight(&self) -> bool {
        self.generation_in_flight
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn score(&self) -> usize {
        domain::score(&self.quiz, &self.answers)
    }

    //=====================================================================================
    // Preferences and file intake
    //=====================================================================================

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn set_quiz_length(&mut self, quiz_length: QuizLength) {
        self.quiz_length = quiz_length;
    }

    pub fn set_input_mode(&mut self, input_mode: InputMode) {
        self.input_mode = input_mode;
    }

    pub fn set_source_text(&mut self, text: String) {
        self.source_text = text;
    }

    pub fn add_files(&mut self, incoming: Vec<IngestedFile>) -> Result<(), ActionRefused> {
        if self.phase != Phase::Idle {
            return Err(ActionRefused::NothingToDo);
        }
        self.file_store.add_files(incoming);
        Ok(())
    }

    pub fn replace_files(&mut self, incoming: Vec<IngestedFile>) -> Result<(), ActionRefused> {
        if self.phase != Phase::Idle {
            return Err(ActionRefused::NothingToDo);
        }
        self.file_store.replace_files(incoming);
        Ok(())
    }

    pub fn remove_file(&mut self, index: usize) -> Result<(), ActionRefused> {
        if self.phase != Phase::Idle {
            return Err(ActionRefused::NothingToDo);
        }
        self.file_store
            .remove_file(index)
            .map(|_| ())
            .ok_or(ActionRefused::NothingToDo)
    }

    //=====================================================================================
    // Table-of-contents extraction
    //=====================================================================================

    /// Starts the extraction sub-flow. The session stays in `Idle` with the
    /// in-flight flag raised; the returned parts go to the extraction port.
    pub fn begin_toc_extraction(&mut self) -> Result<Vec<DocumentPart>, ActionRefused> {
        if self.phase != Phase::Idle || self.generation_in_flight || self.file_store.is_empty() {
            return Err(ActionRefused::NothingToDo);
        }

        let unsupported = self.file_store.unsupported_for_extraction();
        if !unsupported.is_empty() {
            self.fail(PortError::UnsupportedFileType(unsupported).to_string());
            return Err(ActionRefused::Rejected);
        }

        match self.file_store.document_parts() {
            Ok(parts) => {
                self.error_message = None;
                self.generation_in_flight = true;
                Ok(parts)
            }
            Err(err) => {
                self.fail(err.to_string());
                Err(ActionRefused::Rejected)
            }
        }
    }

    /// Applies the extraction result. Returns `false` when the result is
    /// stale (the session was reset while the call was outstanding) and was
    /// discarded.
    pub fn finish_toc_extraction(
        &mut self,
        epoch: u64,
        result: PortResult<Vec<String>>,
    ) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.generation_in_flight = false;
        match result {
            Ok(topics) if !topics.is_empty() => {
                self.table_of_contents = topics;
                self.phase = Phase::TableOfContents;
            }
            Ok(_) => self.fail(PortError::EmptyResult.to_string()),
            Err(err) => self.fail(err.to_string()),
        }
        true
    }

    //=====================================================================================
    // Quiz generation
    //=====================================================================================

    /// Starts quiz generation from the selected topics. Moves to `Loading`
    /// and resets the countdown for the upcoming attempt.
    pub fn begin_quiz_from_selection(
        &mut self,
        selected_topics: &[String],
    ) -> Result<Vec<DocumentPart>, ActionRefused> {
        if self.phase != Phase::TableOfContents
            || self.generation_in_flight
            || selected_topics.is_empty()
        {
            return Err(ActionRefused::NothingToDo);
        }

        match self.file_store.document_parts() {
            Ok(parts) => {
                self.error_message = None;
                self.phase = Phase::Loading;
                self.generation_in_flight = true;
                self.timer.reset(self.quiz_duration_secs);
                Ok(parts)
            }
            Err(err) => {
                self.fail(err.to_string());
                Err(ActionRefused::Rejected)
            }
        }
    }

    /// Starts quiz generation from pasted text. Whitespace-only input is a
    /// no-op; the session stays where it is.
    pub fn begin_quiz_from_text(&mut self, text: &str) -> Result<String, ActionRefused> {
        if self.phase != Phase::Idle
            || self.input_mode != InputMode::Text
            || self.generation_in_flight
            || text.trim().is_empty()
        {
            return Err(ActionRefused::NothingToDo);
        }

        // Keep the text so regeneration can offer it again.
        self.source_text = text.to_string();
        self.error_message = None;
        self.phase = Phase::Loading;
        self.generation_in_flight = true;
        self.timer.reset(self.quiz_duration_secs);
        Ok(text.to_string())
    }

    /// Applies a quiz-generation result from either source. Returns `false`
    /// when the result is stale and was discarded.
    pub fn finish_quiz_generation(&mut self, epoch: u64, result: PortResult<Quiz>) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.generation_in_flight = false;
        match result {
            Ok(quiz) if !quiz.is_empty() => {
                self.quiz = quiz;
                self.answers.clear();
                self.timer.reset(self.quiz_duration_secs);
                self.phase = Phase::Quiz;
            }
            Ok(_) => self.fail(PortError::EmptyResult.to_string()),
            Err(err) => self.fail(err.to_string()),
        }
        true
    }

    //=====================================================================================
    // Quiz taking
    //=====================================================================================

    /// Records one answer. The first answer arms the countdown; reading
    /// time before engagement is never counted.
    pub fn record_answer(
        &mut self,
        question_index: usize,
        option_index: usize,
    ) -> Result<AnswerOutcome, ActionRefused> {
        if self.phase != Phase::Quiz {
            return Err(ActionRefused::NothingToDo);
        }
        let options = match self.quiz.get(question_index) {
            Some(item) => item.options.len(),
            None => return Err(ActionRefused::NothingToDo),
        };
        if option_index >= options {
            return Err(ActionRefused::NothingToDo);
        }

        self.answers.insert(question_index, option_index);
        if self.timer.active {
            Ok(AnswerOutcome::Recorded)
        } else {
            self.timer.reset(self.quiz_duration_secs);
            self.timer.active = true;
            Ok(AnswerOutcome::TimerStarted)
        }
    }

    /// Moves to results with whatever answers exist. Used both for the
    /// explicit submission and for countdown expiry.
    pub fn submit(&mut self) -> Result<(), ActionRefused> {
        if self.phase != Phase::Quiz {
            return Err(ActionRefused::NothingToDo);
        }
        self.timer.active = false;
        self.phase = Phase::Results;
        Ok(())
    }

    /// One countdown tick. Only meaningful while taking a quiz; any other
    /// phase reads as an inactive timer so a stray tick can never mutate a
    /// finished session.
    pub fn tick_timer(&mut self) -> TimerTick {
        if self.phase != Phase::Quiz {
            return TimerTick::Inactive;
        }
        self.timer.tick()
    }

    //=====================================================================================
    // Recovery paths
    //=====================================================================================

    /// Discards the quiz and returns to topic selection (file mode) or text
    /// entry (text mode), keeping the extracted topics and the source text
    /// for reuse.
    pub fn regenerate(&mut self) -> Result<(), ActionRefused> {
        if self.phase != Phase::Results {
            return Err(ActionRefused::NothingToDo);
        }
        self.quiz.clear();
        self.answers.clear();
        self.timer.reset(self.quiz_duration_secs);
        self.phase = match self.input_mode {
            InputMode::File => Phase::TableOfContents,
            InputMode::Text => Phase::Idle,
        };
        Ok(())
    }

    /// Returns the session to its initial value, releasing every preview
    /// handle. Bumps the epoch so an outstanding generation result is
    /// discarded when it eventually lands.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.input_mode = InputMode::File;
        self.file_store.clear();
        self.table_of_contents.clear();
        self.quiz.clear();
        self.answers.clear();
        self.error_message = None;
        self.source_text.clear();
        self.timer.reset(self.quiz_duration_secs);
        self.generation_in_flight = false;
        self.epoch += 1;
    }

    fn fail(&mut self, message: String) {
        self.phase = Phase::Error;
        self.error_message = Some(message);
        self.timer.active = false;
        self.generation_in_flight = false;
    }
}
