pub mod domain;
pub mod files;
pub mod ports;
pub mod session;

pub use domain::{score, AnswerMap, DocumentPart, Language, Quiz, QuizItem, QuizLength, OPTIONS_PER_QUESTION};
pub use files::{resolve_mime_type, FileStore, IngestedFile, Preview, PreviewRegistry};
pub use ports::{PortError, PortResult, QuizGenerationService, TocExtractionService};
pub use session::{ActionRefused, AnswerOutcome, InputMode, Phase, Session, TimerState, TimerTick};
