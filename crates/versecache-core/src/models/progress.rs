use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Progress points needed per level.
pub const POINTS_PER_LEVEL: u64 = 10_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryProgress {
    pub completed_count: u32,
    pub correct_answers: u32,
}

/// Cumulative quiz results for one user. Only ever merged into, at quiz
/// completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase", default)]
pub struct UserProgress {
    pub total_quizzes_completed: u32,
    pub total_correct_answers: u32,
    pub total_points: u64,
    pub per_category: BTreeMap<String, CategoryProgress>,
}

impl UserProgress {
    /// Fold one finished session into the totals.
    pub fn merge_session(&mut self, category_id: &str, correct_count: u32, points: u64) {
        self.total_quizzes_completed += 1;
        self.total_correct_answers += correct_count;
        self.total_points += points;

        let category = self.per_category.entry(category_id.to_string()).or_default();
        category.completed_count += 1;
        category.correct_answers += correct_count;
    }

    /// Level 1 until the first `POINTS_PER_LEVEL` points, then one level per
    /// `POINTS_PER_LEVEL`.
    pub fn level(&self) -> u64 {
        self.total_points / POINTS_PER_LEVEL + 1
    }

    pub fn points_to_next_level(&self) -> u64 {
        self.level() * POINTS_PER_LEVEL - self.total_points
    }

    pub fn completed_in(&self, category_id: &str) -> u32 {
        self.per_category
            .get(category_id)
            .map(|c| c.completed_count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_session() {
        let mut progress = UserProgress::default();
        progress.merge_session("gospels", 7, 1000);
        progress.merge_session("gospels", 3, 500);
        progress.merge_session("prophets", 0, 500);

        assert_eq!(progress.total_quizzes_completed, 3);
        assert_eq!(progress.total_correct_answers, 10);
        assert_eq!(progress.total_points, 2000);
        assert_eq!(progress.completed_in("gospels"), 2);
        assert_eq!(progress.per_category["gospels"].correct_answers, 10);
        assert_eq!(progress.completed_in("prophets"), 1);
        assert_eq!(progress.completed_in("psalms"), 0);
    }

    #[test]
    fn test_level_from_points() {
        let mut progress = UserProgress::default();
        assert_eq!(progress.level(), 1);
        assert_eq!(progress.points_to_next_level(), 10_000);

        progress.total_points = 9_999;
        assert_eq!(progress.level(), 1);

        progress.total_points = 10_000;
        assert_eq!(progress.level(), 2);
        assert_eq!(progress.points_to_next_level(), 10_000);

        progress.total_points = 25_500;
        assert_eq!(progress.level(), 3);
        assert_eq!(progress.points_to_next_level(), 4_500);
    }

    #[test]
    fn test_missing_fields_default() {
        let progress: UserProgress = serde_json::from_str(r#"{"totalQuizzesCompleted": 4}"#).unwrap();
        assert_eq!(progress.total_quizzes_completed, 4);
        assert_eq!(progress.total_points, 0);
        assert!(progress.per_category.is_empty());
    }
}
