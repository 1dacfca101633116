//! Question set assembly: random draws, the speed round and the daily
//! challenge.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Question, QuestionBank, BEGINNER_DIFFICULTY};
use crate::store::KeyValueStore;

/// Questions in a speed round, drawn from every category.
pub const SPEED_ROUND_SIZE: usize = 10;

/// Questions in the daily challenge.
pub const DAILY_CHALLENGE_SIZE: usize = 5;

const DAILY_CHALLENGE_KEY: &str = "daily_challenge";

/// Uniformly shuffle `pool` and keep at most `count` questions.
pub fn draw<R: Rng + ?Sized>(mut pool: Vec<Question>, count: usize, rng: &mut R) -> Vec<Question> {
    pool.shuffle(rng);
    pool.truncate(count);
    pool
}

#[derive(Debug, Serialize, Deserialize)]
struct DailyChallenge {
    date: NaiveDate,
    questions: Vec<Question>,
}

/// Persists one question set per calendar date.
#[derive(Clone)]
pub struct DailyChallengeStore {
    store: Arc<dyn KeyValueStore>,
}

impl DailyChallengeStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The challenge for `date`, generating and saving it on first request.
    /// Returns an empty set when the bank has no beginner questions.
    pub fn get_or_create(&self, date: NaiveDate, bank: &QuestionBank) -> Result<Vec<Question>> {
        if let Some(existing) = self.load()? {
            if existing.date == date {
                debug!(%date, "Using saved daily challenge");
                return Ok(existing.questions);
            }
        }

        let pool = bank.by_difficulty(BEGINNER_DIFFICULTY);
        let questions = draw(pool, DAILY_CHALLENGE_SIZE, &mut rand::thread_rng());
        if questions.is_empty() {
            return Ok(questions);
        }

        let challenge = DailyChallenge { date, questions };
        let bytes = serde_json::to_vec(&challenge)?;
        self.store
            .set(DAILY_CHALLENGE_KEY, &bytes)
            .context("Failed to save daily challenge")?;
        debug!(%date, count = challenge.questions.len(), "Generated daily challenge");
        Ok(challenge.questions)
    }

    fn load(&self) -> Result<Option<DailyChallenge>> {
        let Some(bytes) = self.store.get(DAILY_CHALLENGE_KEY)? else {
            return Ok(None);
        };
        // A record from an older format is simply regenerated.
        Ok(serde_json::from_slice(&bytes).ok())
    }
}
