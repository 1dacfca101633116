use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use super::QuizSummary;
use crate::models::UserProgress;
use crate::store::KeyValueStore;

/// Durable `UserProgress` for one user.
#[derive(Clone)]
pub struct ProgressStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl ProgressStore {
    pub fn new(store: Arc<dyn KeyValueStore>, user_id: &str) -> Self {
        Self {
            store,
            key: format!("user_progress_{}", user_id),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current progress; a user with no record starts from zero.
    pub fn load(&self) -> Result<UserProgress> {
        match self.store.get(&self.key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("Failed to parse progress record: {}", self.key)),
            None => Ok(UserProgress::default()),
        }
    }

    pub fn save(&self, progress: &UserProgress) -> Result<()> {
        let bytes = serde_json::to_vec(progress)?;
        self.store
            .set(&self.key, &bytes)
            .with_context(|| format!("Failed to save progress record: {}", self.key))
    }

    /// Merge a finished session and persist the result.
    pub fn record_session(&self, summary: &QuizSummary) -> Result<UserProgress> {
        let mut progress = self.load()?;
        progress.merge_session(
            &summary.category_id,
            summary.correct_count,
            summary.completion_points,
        );
        self.save(&progress)?;

        info!(
            category = %summary.category_id,
            correct = summary.correct_count,
            total_quizzes = progress.total_quizzes_completed,
            level = progress.level(),
            "Quiz progress recorded"
        );
        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileStore, MemoryStore};

    fn summary(category: &str, correct: u32, total: usize) -> QuizSummary {
        QuizSummary {
            category_id: category.to_string(),
            total_questions: total,
            correct_count: correct,
            score: correct * 100,
            completion_points: total as u64 * 100,
            total_elapsed_seconds: 0,
            answers: Vec::new(),
        }
    }

    #[test]
    fn test_record_session_persists() {
        let store = Arc::new(MemoryStore::new());
        let progress = ProgressStore::new(store.clone(), "local");

        assert_eq!(progress.load().unwrap(), UserProgress::default());

        progress.record_session(&summary("gospels", 7, 10)).unwrap();
        let reopened = ProgressStore::new(store, "local");
        let loaded = reopened.load().unwrap();
        assert_eq!(loaded.total_quizzes_completed, 1);
        assert_eq!(loaded.total_correct_answers, 7);
        assert_eq!(loaded.total_points, 1000);
        assert_eq!(loaded.completed_in("gospels"), 1);
    }

    #[test]
    fn test_progress_is_per_user() {
        let store = Arc::new(MemoryStore::new());
        let alice = ProgressStore::new(store.clone(), "alice");
        let bob = ProgressStore::new(store, "bob");

        alice.record_session(&summary("gospels", 3, 5)).unwrap();
        assert_eq!(bob.load().unwrap().total_quizzes_completed, 0);
        assert_eq!(alice.key(), "user_progress_alice");
    }

    #[test]
    fn test_similar_user_ids_stay_separate_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path().to_path_buf()).unwrap());
        let acute = ProgressStore::new(store.clone(), "josé");
        let grave = ProgressStore::new(store.clone(), "josè");
        let spaced = ProgressStore::new(store.clone(), "a b");
        let underscored = ProgressStore::new(store, "a_b");

        acute.record_session(&summary("gospels", 7, 10)).unwrap();
        spaced.record_session(&summary("gospels", 2, 5)).unwrap();

        assert_eq!(grave.load().unwrap(), UserProgress::default());
        assert_eq!(underscored.load().unwrap(), UserProgress::default());
        assert_eq!(acute.load().unwrap().total_correct_answers, 7);
        assert_eq!(spaced.load().unwrap().total_correct_answers, 2);
    }

    #[test]
    fn test_corrupt_record_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        store.set("user_progress_local", b"not json").unwrap();
        let progress = ProgressStore::new(store, "local");
        assert!(progress.load().is_err());
        assert!(progress.record_session(&summary("gospels", 1, 1)).is_err());
    }
}
