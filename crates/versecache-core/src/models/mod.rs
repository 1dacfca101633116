//! Payload and record types.
//!
//! - `Question`, `CorrectAnswer`, `QuestionBank`, `Category`: quiz content
//!   as served by the remote quiz documents
//! - `UserProgress`, `CategoryProgress`: cumulative quiz results

pub mod progress;
pub mod quiz;

pub use progress::{CategoryProgress, UserProgress, POINTS_PER_LEVEL};
pub use quiz::{
    Category, CorrectAnswer, Question, QuestionBank, ALL_CATEGORIES_ID, BEGINNER_DIFFICULTY, TRUE_INDEX,
};
