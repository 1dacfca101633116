//! Quiz session engine.
//!
//! The engine walks `Idle → CategorySelected → Configuring → InProgress →
//! Completed`. Question pools come from the content cache; results are
//! merged into `UserProgress` exactly once per finished session. Abandoning
//! a session discards it without touching progress.

pub mod engine;
pub mod error;
pub mod progress;
pub mod selection;
pub mod session;

pub use engine::{AdvanceOutcome, QuizConfig, QuizEngine, QuizState};
pub use error::QuizError;
pub use progress::ProgressStore;
pub use selection::{DailyChallengeStore, DAILY_CHALLENGE_SIZE, SPEED_ROUND_SIZE};
pub use session::{Answer, QuizSession, QuizSummary, RevealPolicy, POINTS_PER_CORRECT};
