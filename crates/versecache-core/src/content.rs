//! Content module registrations.
//!
//! Every screen that renders remote material loads it through one of these
//! sources. Each carries its own cache key, TTL and a minimal bundled
//! payload so a screen never renders empty on first run without network.
//!
//! Non-quiz payloads are opaque JSON; their schema belongs to the UI.

use std::collections::BTreeMap;

use chrono::Duration;
use serde_json::{json, Value};

use crate::cache::{CacheError, ContentRegistry, ContentSource};
use crate::models::{Category, CorrectAnswer, Question, QuestionBank};

/// Host of the static content documents.
pub const DEFAULT_CONTENT_BASE_URL: &str = "https://raw.githubusercontent.com/jacixn/project-1/main";

/// Character profiles live in their own repository.
pub const BIBLE_CHARACTERS_URL: &str =
    "https://raw.githubusercontent.com/jacixn/biblely-character-data/main/bible-characters.json";

pub const QUIZ_QUESTIONS: &str = "quiz_questions";
pub const QUIZ_CATEGORIES: &str = "quiz_categories";
pub const BIBLE_FACTS: &str = "bible_facts";
pub const KEY_VERSES: &str = "key_verses";
pub const THEMATIC_GUIDES: &str = "thematic_guides";
pub const BIBLE_TIMELINE: &str = "bible_timeline";
pub const BIBLE_CHARACTERS: &str = "bible_characters";

/// The full set of content sources.
#[derive(Debug, Clone)]
pub struct ContentSources {
    pub quiz_questions: ContentSource<QuestionBank>,
    pub quiz_categories: ContentSource<Vec<Category>>,
    pub bible_facts: ContentSource<Value>,
    /// TTL zero: verses are refetched on every load.
    pub key_verses: ContentSource<Value>,
    pub thematic_guides: ContentSource<Value>,
    pub bible_timeline: ContentSource<Value>,
    pub bible_characters: ContentSource<Value>,
}

impl Default for ContentSources {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_BASE_URL)
    }
}

impl ContentSources {
    pub fn new(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let url = |path: &str| format!("{}/{}", base, path);

        Self {
            quiz_questions: ContentSource::new(
                QUIZ_QUESTIONS,
                url("quiz-data/questions.json"),
                "quiz_questions_cache",
                Duration::hours(24),
            )
            .with_fallback(fallback_question_bank),
            quiz_categories: ContentSource::new(
                QUIZ_CATEGORIES,
                url("quiz-data/categories.json"),
                "quiz_categories_cache",
                Duration::hours(24),
            )
            .with_fallback(fallback_categories),
            bible_facts: ContentSource::new(
                BIBLE_FACTS,
                url("fivefold-ios/bible-facts.json"),
                "bible_facts_data_v1",
                Duration::hours(24),
            )
            .with_fallback(|| {
                json!({
                    "categories": [{ "id": "general", "name": "General" }],
                    "facts": [{
                        "id": "fact-1",
                        "category": "general",
                        "title": "Many authors, one story",
                        "fact": "The Bible was written by around forty authors over roughly 1,500 years."
                    }]
                })
            }),
            key_verses: ContentSource::new(
                KEY_VERSES,
                url("fivefold-ios/verses.json"),
                "cached_verses_data_v7",
                Duration::zero(),
            )
            .with_fallback(|| {
                json!({
                    "categories": [{ "id": "faith", "name": "Faith" }],
                    "verses": [{
                        "id": "john-3-16",
                        "category": "faith",
                        "reference": "John 3:16",
                        "text": "For God so loved the world, that he gave his only begotten Son, that whosoever believeth in him should not perish, but have everlasting life."
                    }]
                })
            }),
            thematic_guides: ContentSource::new(
                THEMATIC_GUIDES,
                url("fivefold-ios/thematic-guides.json"),
                "thematic_guides_data_v1",
                Duration::hours(1),
            )
            .with_fallback(|| json!({ "themes": [], "guides": [] })),
            bible_timeline: ContentSource::new(
                BIBLE_TIMELINE,
                url("fivefold-ios/bible-timeline.json"),
                "bible_timeline_data_v2_with_images",
                Duration::hours(1),
            )
            .with_fallback(|| {
                json!({
                    "eras": [{
                        "id": "creation",
                        "title": "Creation",
                        "timeRange": "Beginning",
                        "events": []
                    }]
                })
            }),
            bible_characters: ContentSource::new(
                BIBLE_CHARACTERS,
                BIBLE_CHARACTERS_URL,
                "bible_characters_data",
                Duration::hours(24),
            )
            .with_fallback(|| json!({ "characters": {}, "characterGroups": [] })),
        }
    }

    /// Register every source, failing on the first misconfigured one.
    pub fn registry(&self) -> Result<ContentRegistry, CacheError> {
        let mut registry = ContentRegistry::new();
        registry.register(&self.quiz_questions)?;
        registry.register(&self.quiz_categories)?;
        for source in self.opaque_sources() {
            registry.register(source)?;
        }
        Ok(registry)
    }

    /// Sources whose payload is untyped JSON.
    pub fn opaque_sources(&self) -> [&ContentSource<Value>; 5] {
        [
            &self.bible_facts,
            &self.key_verses,
            &self.thematic_guides,
            &self.bible_timeline,
            &self.bible_characters,
        ]
    }

    pub fn opaque(&self, source_id: &str) -> Option<&ContentSource<Value>> {
        self.opaque_sources()
            .into_iter()
            .find(|s| s.source_id == source_id)
    }
}

fn fallback_categories() -> Vec<Category> {
    vec![
        Category {
            id: "old-testament".to_string(),
            name: "Old Testament".to_string(),
            description: Some("From Creation to the prophets".to_string()),
            icon: None,
        },
        Category {
            id: "new-testament".to_string(),
            name: "New Testament".to_string(),
            description: Some("The Gospels, Acts and the letters".to_string()),
            icon: None,
        },
    ]
}

fn fallback_question_bank() -> QuestionBank {
    let mc = |id: &str, question: &str, options: &[&str], correct: usize, reference: &str| Question {
        id: id.to_string(),
        question: question.to_string(),
        options: Some(options.iter().map(|o| o.to_string()).collect()),
        correct_answer: CorrectAnswer::Index(correct),
        explanation: None,
        reference: Some(reference.to_string()),
    };
    let tf = |id: &str, question: &str, correct: bool, reference: &str| Question {
        id: id.to_string(),
        question: question.to_string(),
        options: None,
        correct_answer: CorrectAnswer::Bool(correct),
        explanation: None,
        reference: Some(reference.to_string()),
    };

    let old_testament = vec![
        mc("ot-1", "Who built the ark?", &["Noah", "Abraham", "Moses", "David"], 0, "Genesis 6:14"),
        mc("ot-2", "How many days did creation take, including the day of rest?", &["5", "6", "7", "8"], 2, "Genesis 2:2"),
        tf("ot-3", "David defeated Goliath with a sling and a stone.", true, "1 Samuel 17:49"),
    ];
    let new_testament = vec![
        mc("nt-1", "In which town was Jesus born?", &["Nazareth", "Bethlehem", "Jerusalem", "Capernaum"], 1, "Luke 2:4-7"),
        mc("nt-2", "How many disciples did Jesus choose?", &["7", "10", "12", "40"], 2, "Mark 3:14"),
        tf("nt-3", "Paul wrote the Gospel of John.", false, "John 21:24"),
    ];

    let bucket = |questions: Vec<Question>| -> BTreeMap<String, BTreeMap<String, Vec<Question>>> {
        let (true_false, multiple_choice): (Vec<Question>, Vec<Question>) =
            questions.into_iter().partition(Question::is_true_false);
        BTreeMap::from([
            (
                "multiple-choice".to_string(),
                BTreeMap::from([("beginner".to_string(), multiple_choice)]),
            ),
            (
                "true-false".to_string(),
                BTreeMap::from([("beginner".to_string(), true_false)]),
            ),
        ])
    };

    QuestionBank(BTreeMap::from([
        ("old-testament".to_string(), bucket(old_testament)),
        ("new-testament".to_string(), bucket(new_testament)),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ALL_CATEGORIES_ID;

    #[test]
    fn test_registry_accepts_every_source() {
        let sources = ContentSources::default();
        let registry = sources.registry().unwrap();
        assert_eq!(registry.len(), 7);

        let verses = registry.get(KEY_VERSES).unwrap();
        assert_eq!(verses.ttl, Duration::zero());
        assert_eq!(
            verses.remote_url,
            "https://raw.githubusercontent.com/jacixn/project-1/main/fivefold-ios/verses.json"
        );
        assert_eq!(registry.get(THEMATIC_GUIDES).unwrap().ttl, Duration::hours(1));
        assert_eq!(registry.get(BIBLE_CHARACTERS).unwrap().remote_url, BIBLE_CHARACTERS_URL);
    }

    #[test]
    fn test_base_url_override() {
        let sources = ContentSources::new("http://localhost:8080/");
        assert_eq!(
            sources.quiz_questions.remote_url,
            "http://localhost:8080/quiz-data/questions.json"
        );
    }

    #[test]
    fn test_opaque_lookup() {
        let sources = ContentSources::default();
        assert!(sources.opaque(BIBLE_FACTS).is_some());
        assert!(sources.opaque(QUIZ_QUESTIONS).is_none());
    }

    #[test]
    fn test_fallback_bank_is_playable() {
        let bank = fallback_question_bank();
        assert_eq!(bank.pool("old-testament").len(), 3);
        assert_eq!(bank.pool(ALL_CATEGORIES_ID).len(), 6);
        assert_eq!(bank.by_difficulty("beginner").len(), 6);

        let categories = fallback_categories();
        assert!(bank.category_ids().all(|id| categories.iter().any(|c| c.id == id)));
    }
}
