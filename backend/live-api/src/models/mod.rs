pub mod answer;
pub mod error;
pub mod event;
pub mod participant;
pub mod question;
pub mod seed;

pub use answer::{AnswerRecord, ScoreboardRow};
pub use error::GameError;
pub use event::{ActiveQuestionView, ClientMessage, PhaseView, SessionEvent, SessionSnapshot};
pub use participant::{ApprovalStatus, ParticipantEntry};
pub use question::{Question, QuestionKind, QuestionOption, QuestionPublic};
pub use seed::SessionSeed;
