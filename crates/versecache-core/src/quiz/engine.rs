use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::selection::{draw, DailyChallengeStore, SPEED_ROUND_SIZE};
use super::{ProgressStore, QuizError, QuizSession, QuizSummary, RevealPolicy};
use crate::cache::{CacheManager, ContentSource, LoadOrigin};
use crate::models::{Category, Question, QuestionBank, UserProgress, ALL_CATEGORIES_ID};
use crate::utils::Clock;

/// Category id recorded for daily challenge sessions.
pub const DAILY_CHALLENGE_CATEGORY: &str = "daily";

/// Chosen options before a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizConfig {
    pub category_id: String,
    pub question_count: usize,
    pub reveal_policy: RevealPolicy,
}

#[derive(Debug, Clone)]
pub enum QuizState {
    Idle,
    CategorySelected { category_id: String },
    Configuring(QuizConfig),
    InProgress(QuizSession),
    Completed(QuizSummary),
}

impl QuizState {
    pub fn name(&self) -> &'static str {
        match self {
            QuizState::Idle => "idle",
            QuizState::CategorySelected { .. } => "category selected",
            QuizState::Configuring(_) => "configuring",
            QuizState::InProgress(_) => "in progress",
            QuizState::Completed(_) => "completed",
        }
    }
}

/// What `advance` moved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Next(Question),
    SessionCompleted(QuizSummary),
}

/// Single-user quiz engine. Not reentrant: every transition takes
/// `&mut self`.
pub struct QuizEngine {
    cache: CacheManager,
    questions: ContentSource<QuestionBank>,
    categories: ContentSource<Vec<Category>>,
    progress: ProgressStore,
    daily: DailyChallengeStore,
    clock: Arc<dyn Clock>,
    state: QuizState,
    content_origin: Option<LoadOrigin>,
}

impl QuizEngine {
    pub fn new(
        cache: CacheManager,
        questions: ContentSource<QuestionBank>,
        categories: ContentSource<Vec<Category>>,
        user_id: &str,
    ) -> Self {
        let store = cache.store();
        Self {
            progress: ProgressStore::new(Arc::clone(&store), user_id),
            daily: DailyChallengeStore::new(store),
            clock: cache.clock(),
            cache,
            questions,
            categories,
            state: QuizState::Idle,
            content_origin: None,
        }
    }

    pub fn state(&self) -> &QuizState {
        &self.state
    }

    pub fn session(&self) -> Option<&QuizSession> {
        match &self.state {
            QuizState::InProgress(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, QuizState::Completed(_))
    }

    /// Where the question bank of the last started session came from. A
    /// `Stale` or `Fallback` origin is the UI's cue for an offline banner.
    pub fn content_origin(&self) -> Option<LoadOrigin> {
        self.content_origin
    }

    /// Categories to offer, with the pooled "all" entry first.
    pub async fn categories(&self) -> Result<Vec<Category>, QuizError> {
        let loaded = self.cache.load(&self.categories, false).await?;
        let mut categories = Vec::with_capacity(loaded.payload.len() + 1);
        if !loaded.payload.iter().any(|c| c.id == ALL_CATEGORIES_ID) {
            categories.push(Category {
                id: ALL_CATEGORIES_ID.to_string(),
                name: "All Categories".to_string(),
                description: Some("Questions from every category".to_string()),
                icon: None,
            });
        }
        categories.extend(loaded.payload.iter().cloned());
        Ok(categories)
    }

    pub fn select_category(&mut self, category_id: &str) -> Result<(), QuizError> {
        if let QuizState::InProgress(_) = self.state {
            return Err(QuizError::invalid("select_category", self.state.name()));
        }
        self.state = QuizState::CategorySelected {
            category_id: category_id.to_string(),
        };
        Ok(())
    }

    /// Choose size and reveal policy. A count of zero is treated as one.
    pub fn configure(&mut self, question_count: usize, reveal_policy: RevealPolicy) -> Result<(), QuizError> {
        let category_id = match &self.state {
            QuizState::CategorySelected { category_id } => category_id.clone(),
            QuizState::Configuring(config) => config.category_id.clone(),
            other => return Err(QuizError::invalid("configure", other.name())),
        };
        self.state = QuizState::Configuring(QuizConfig {
            category_id,
            question_count: question_count.max(1),
            reveal_policy,
        });
        Ok(())
    }

    /// Assemble the configured session. On failure the engine stays in
    /// `Configuring`.
    pub async fn begin(&mut self) -> Result<&QuizSession, QuizError> {
        let config = match &self.state {
            QuizState::Configuring(config) => config.clone(),
            other => return Err(QuizError::invalid("begin", other.name())),
        };

        let bank = self.load_bank().await?;
        let pool = bank.pool(&config.category_id);
        if pool.is_empty() {
            warn!(category = %config.category_id, "No questions in category");
            return Err(QuizError::InsufficientQuestions(config.category_id));
        }

        let pool_size = pool.len();
        let questions = draw(pool, config.question_count, &mut rand::thread_rng());
        debug!(
            category = %config.category_id,
            requested = config.question_count,
            pool_size,
            selected = questions.len(),
            "Question set assembled"
        );

        Ok(self.enter_session(config.category_id, questions, config.reveal_policy))
    }

    /// Select, configure and begin in one step.
    pub async fn start_session(
        &mut self,
        category_id: &str,
        question_count: usize,
        reveal_policy: RevealPolicy,
    ) -> Result<&QuizSession, QuizError> {
        self.select_category(category_id)?;
        self.configure(question_count, reveal_policy)?;
        self.begin().await
    }

    /// Ten questions from every category.
    pub async fn start_speed_round(&mut self, reveal_policy: RevealPolicy) -> Result<&QuizSession, QuizError> {
        self.start_session(ALL_CATEGORIES_ID, SPEED_ROUND_SIZE, reveal_policy)
            .await
    }

    /// The day's fixed set of beginner questions.
    pub async fn start_daily_challenge(
        &mut self,
        reveal_policy: RevealPolicy,
        date: NaiveDate,
    ) -> Result<&QuizSession, QuizError> {
        if let QuizState::InProgress(_) = self.state {
            return Err(QuizError::invalid("start_daily_challenge", self.state.name()));
        }

        let bank = self.load_bank().await?;
        let questions = self
            .daily
            .get_or_create(date, &bank)
            .map_err(QuizError::storage)?;
        if questions.is_empty() {
            return Err(QuizError::InsufficientQuestions(DAILY_CHALLENGE_CATEGORY.to_string()));
        }

        Ok(self.enter_session(DAILY_CHALLENGE_CATEGORY.to_string(), questions, reveal_policy))
    }

    /// Score the current question. Under `AtEnd`, answering the last
    /// question completes the session and records progress.
    ///
    /// The answer is returned even when that progress write fails. The
    /// session then stays in progress with every question answered
    /// (`is_completed()` is false) and `complete()` retries the write.
    pub fn submit_answer(&mut self, chosen_index: usize) -> Result<super::Answer, QuizError> {
        let (answer, finished) = match &mut self.state {
            QuizState::InProgress(session) => {
                let answer = session.submit(chosen_index)?;
                let finished =
                    session.reveal_policy() == RevealPolicy::AtEnd && session.all_answered();
                (answer, finished)
            }
            other => return Err(QuizError::invalid("submit_answer", other.name())),
        };

        if finished {
            if let Err(e) = self.finish() {
                warn!(error = %e, "Quiz finished but progress was not recorded");
            }
        }
        Ok(answer)
    }

    /// Move past a revealed answer. Past the last question this completes
    /// the session and records progress.
    pub fn advance(&mut self) -> Result<AdvanceOutcome, QuizError> {
        let next = match &mut self.state {
            QuizState::InProgress(session) => session.advance()?.cloned(),
            other => return Err(QuizError::invalid("advance", other.name())),
        };

        match next {
            Some(question) => Ok(AdvanceOutcome::Next(question)),
            None => self.finish().map(AdvanceOutcome::SessionCompleted),
        }
    }

    /// Finish a fully answered session and record progress. Only valid once
    /// per session.
    pub fn complete(&mut self) -> Result<QuizSummary, QuizError> {
        let all_answered = match &self.state {
            QuizState::InProgress(session) => session.all_answered(),
            other => return Err(QuizError::invalid("complete", other.name())),
        };
        if !all_answered {
            return Err(QuizError::invalid("complete", "questions remain unanswered"));
        }
        self.finish()
    }

    /// Discard the running session. Progress is untouched.
    pub fn abandon(&mut self) -> bool {
        match &self.state {
            QuizState::InProgress(session) => {
                info!(
                    category = %session.category_id(),
                    answered = session.answers().len(),
                    "Quiz abandoned"
                );
                self.state = QuizState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Timer hook, called once per second by the host.
    pub fn tick(&mut self) {
        if let QuizState::InProgress(session) = &mut self.state {
            session.tick();
        }
    }

    pub fn progress(&self) -> Result<UserProgress, QuizError> {
        self.progress.load().map_err(QuizError::storage)
    }

    async fn load_bank(&mut self) -> Result<Arc<QuestionBank>, QuizError> {
        let loaded = self.cache.load(&self.questions, false).await?;
        if loaded.is_degraded() {
            warn!(origin = ?loaded.origin, "Quiz questions served from degraded source");
        }
        self.content_origin = Some(loaded.origin);
        Ok(loaded.payload)
    }

    fn enter_session(
        &mut self,
        category_id: String,
        questions: Vec<Question>,
        reveal_policy: RevealPolicy,
    ) -> &QuizSession {
        match self.progress.load() {
            Ok(progress) => debug!(
                quizzes = progress.total_quizzes_completed,
                level = progress.level(),
                "Progress at session start"
            ),
            Err(e) => warn!(error = %e, "Failed to read progress at session start"),
        }

        info!(category = %category_id, questions = questions.len(), ?reveal_policy, "Quiz started");
        let session = QuizSession::new(category_id, questions, reveal_policy, self.clock.now());
        self.state = QuizState::InProgress(session);
        match &self.state {
            QuizState::InProgress(session) => session,
            _ => unreachable!("state was just set to InProgress"),
        }
    }

    /// Record progress and move to `Completed`. On a storage failure the
    /// session stays in progress so `complete` can be retried.
    fn finish(&mut self) -> Result<QuizSummary, QuizError> {
        let summary = match &self.state {
            QuizState::InProgress(session) => session.summary(),
            other => return Err(QuizError::invalid("complete", other.name())),
        };

        self.progress
            .record_session(&summary)
            .map_err(QuizError::storage)?;

        info!(
            category = %summary.category_id,
            correct = summary.correct_count,
            total = summary.total_questions,
            score = summary.score,
            "Quiz completed"
        );
        self.state = QuizState::Completed(summary.clone());
        Ok(summary)
    }
}
