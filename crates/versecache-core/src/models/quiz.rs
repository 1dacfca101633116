use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Pseudo-category id that pools every category's questions.
pub const ALL_CATEGORIES_ID: &str = "all";

/// Difficulty bucket the daily challenge draws from.
pub const BEGINNER_DIFFICULTY: &str = "beginner";

/// Index the UI uses for "True" on a true/false question. "False" is 1.
pub const TRUE_INDEX: usize = 0;

/// Expected answer. The JSON type decides the scoring rule: a number is an
/// option index, a boolean marks a true/false question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(untagged)]
pub enum CorrectAnswer {
    Bool(bool),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default)]
    pub id: String,
    #[serde(alias = "prompt")]
    pub question: String,
    /// Absent for true/false questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub correct_answer: CorrectAnswer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Question {
    pub fn is_true_false(&self) -> bool {
        matches!(self.correct_answer, CorrectAnswer::Bool(_))
    }

    /// Score a chosen index.
    ///
    /// Multiple choice: correct iff `chosen` is the expected index.
    /// True/false: index 0 means "True", 1 means "False"; correct iff that
    /// boolean equals the expected one.
    pub fn is_correct(&self, chosen: usize) -> bool {
        match self.correct_answer {
            CorrectAnswer::Index(expected) => chosen == expected,
            CorrectAnswer::Bool(expected) => (chosen == TRUE_INDEX) == expected,
        }
    }

    /// Display text of the expected answer.
    pub fn correct_answer_text(&self) -> String {
        match self.correct_answer {
            CorrectAnswer::Bool(true) => "True".to_string(),
            CorrectAnswer::Bool(false) => "False".to_string(),
            CorrectAnswer::Index(i) => self
                .options
                .as_ref()
                .and_then(|options| options.get(i))
                .cloned()
                .unwrap_or_else(|| format!("Option {}", i + 1)),
        }
    }

    /// Choices shown to the user, in index order.
    pub fn choices(&self) -> Vec<String> {
        match (&self.options, self.correct_answer) {
            (_, CorrectAnswer::Bool(_)) => vec!["True".to_string(), "False".to_string()],
            (Some(options), _) => options.clone(),
            (None, _) => Vec::new(),
        }
    }
}

/// `categoryId → quizType → difficulty → questions`.
///
/// Map ordering carries no meaning; callers must not rely on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionBank(pub BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<Question>>>>);

impl QuestionBank {
    /// Every question of one category, all types and difficulties flattened.
    /// `ALL_CATEGORIES_ID` flattens the whole bank.
    pub fn pool(&self, category_id: &str) -> Vec<Question> {
        if category_id == ALL_CATEGORIES_ID {
            return self
                .0
                .values()
                .flat_map(Self::flatten_category)
                .collect();
        }
        self.0
            .get(category_id)
            .map(Self::flatten_category)
            .unwrap_or_default()
    }

    /// Questions of one difficulty across every category and quiz type.
    pub fn by_difficulty(&self, difficulty: &str) -> Vec<Question> {
        self.0
            .values()
            .flat_map(|types| types.values())
            .filter_map(|difficulties| difficulties.get(difficulty))
            .flatten()
            .cloned()
            .collect()
    }

    pub fn category_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn total_questions(&self) -> usize {
        self.pool(ALL_CATEGORIES_ID).len()
    }

    fn flatten_category(types: &BTreeMap<String, BTreeMap<String, Vec<Question>>>) -> Vec<Question> {
        types
            .values()
            .flat_map(|difficulties| difficulties.values())
            .flatten()
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mc(id: &str, correct: usize) -> Question {
        Question {
            id: id.to_string(),
            question: format!("Question {}", id),
            options: Some(vec!["A".into(), "B".into(), "C".into(), "D".into()]),
            correct_answer: CorrectAnswer::Index(correct),
            explanation: None,
            reference: None,
        }
    }

    fn tf(id: &str, correct: bool) -> Question {
        Question {
            id: id.to_string(),
            question: format!("Statement {}", id),
            options: None,
            correct_answer: CorrectAnswer::Bool(correct),
            explanation: None,
            reference: None,
        }
    }

    #[test]
    fn test_multiple_choice_scoring() {
        let q = mc("1", 2);
        assert!(q.is_correct(2));
        assert!(!q.is_correct(0));
        assert!(!q.is_correct(9));
        assert_eq!(q.correct_answer_text(), "C");
    }

    #[test]
    fn test_true_false_scoring() {
        let t = tf("t", true);
        assert!(t.is_correct(0));
        assert!(!t.is_correct(1));

        let f = tf("f", false);
        assert!(!f.is_correct(0));
        assert!(f.is_correct(1));

        assert_eq!(t.choices(), vec!["True", "False"]);
        assert_eq!(f.correct_answer_text(), "False");
    }

    #[test]
    fn test_question_json_shapes() {
        let json = r#"[
            {"question": "Who built the ark?", "options": ["Noah", "Moses"], "correctAnswer": 0,
             "explanation": "Genesis 6", "reference": "Genesis 6:14"},
            {"id": "tf-1", "question": "Jonah was swallowed by a great fish.", "correctAnswer": true}
        ]"#;
        let questions: Vec<Question> = serde_json::from_str(json).unwrap();

        assert_eq!(questions[0].correct_answer, CorrectAnswer::Index(0));
        assert_eq!(questions[0].reference.as_deref(), Some("Genesis 6:14"));
        assert!(questions[0].id.is_empty());
        assert!(questions[1].is_true_false());
        assert!(questions[1].options.is_none());
    }

    #[test]
    fn test_bank_pool_flattens_buckets() {
        let json = r#"{
            "old-testament": {
                "multiple-choice": {"beginner": [{"question": "a", "options": ["x"], "correctAnswer": 0}],
                                    "advanced": [{"question": "b", "options": ["x"], "correctAnswer": 0}]},
                "true-false": {"beginner": [{"question": "c", "correctAnswer": false}]}
            },
            "gospels": {
                "multiple-choice": {"intermediate": [{"question": "d", "options": ["x"], "correctAnswer": 0}]}
            }
        }"#;
        let bank: QuestionBank = serde_json::from_str(json).unwrap();

        assert_eq!(bank.pool("old-testament").len(), 3);
        assert_eq!(bank.pool("gospels").len(), 1);
        assert_eq!(bank.pool("missing").len(), 0);
        assert_eq!(bank.pool(ALL_CATEGORIES_ID).len(), 4);
        assert_eq!(bank.total_questions(), 4);

        let beginner: Vec<String> = bank
            .by_difficulty(BEGINNER_DIFFICULTY)
            .into_iter()
            .map(|q| q.question)
            .collect();
        assert_eq!(beginner.len(), 2);
        assert!(beginner.contains(&"a".to_string()));
        assert!(beginner.contains(&"c".to_string()));
    }
}
