use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::QuizError;
use crate::models::Question;

/// Points added to the running score per correct answer.
pub const POINTS_PER_CORRECT: u32 = 100;

/// Progress points awarded per question when a session completes.
pub const COMPLETION_POINTS_PER_QUESTION: u64 = 100;

/// When correctness feedback is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "kebab-case")]
pub enum RevealPolicy {
    /// Pause after every answer until `advance` is called.
    AfterEach,
    /// Move straight on; feedback comes with the summary.
    AtEnd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_index: usize,
    pub chosen_index: usize,
    pub is_correct: bool,
    pub elapsed_seconds: u32,
}

/// Results of a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub category_id: String,
    pub total_questions: usize,
    pub correct_count: u32,
    pub score: u32,
    pub completion_points: u64,
    pub total_elapsed_seconds: u32,
    pub answers: Vec<Answer>,
}

impl QuizSummary {
    pub fn percentage(&self) -> u32 {
        if self.total_questions == 0 {
            return 0;
        }
        (self.correct_count as usize * 100 / self.total_questions) as u32
    }
}

/// One quiz attempt. Lives only in memory.
#[derive(Debug, Clone)]
pub struct QuizSession {
    category_id: String,
    questions: Vec<Question>,
    answers: Vec<Answer>,
    reveal_policy: RevealPolicy,
    started_at: DateTime<Utc>,
    current_index: usize,
    score: u32,
    // Seconds on the current question; frozen once it is answered.
    elapsed_seconds: u32,
}

impl QuizSession {
    pub fn new(
        category_id: impl Into<String>,
        questions: Vec<Question>,
        reveal_policy: RevealPolicy,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            category_id: category_id.into(),
            questions,
            answers: Vec::new(),
            reveal_policy,
            started_at,
            current_index: 0,
            score: 0,
            elapsed_seconds: 0,
        }
    }

    pub fn category_id(&self) -> &str {
        &self.category_id
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn reveal_policy(&self) -> RevealPolicy {
        self.reveal_policy
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// The question being asked, `None` once every question is answered.
    pub fn current_question(&self) -> Option<&Question> {
        if self.all_answered() {
            None
        } else {
            self.questions.get(self.current_index)
        }
    }

    /// Answer to the current question, if it has one. Under `AfterEach`
    /// this is what the UI reveals before `advance`.
    pub fn current_answer(&self) -> Option<&Answer> {
        self.answers.get(self.current_index)
    }

    pub fn awaiting_advance(&self) -> bool {
        self.reveal_policy == RevealPolicy::AfterEach
            && self.current_answer().is_some()
            && !self.is_last()
    }

    pub fn all_answered(&self) -> bool {
        self.answers.len() >= self.questions.len()
    }

    pub fn correct_count(&self) -> u32 {
        self.answers.iter().filter(|a| a.is_correct).count() as u32
    }

    fn is_last(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }

    /// Record the answer to the current question.
    pub fn submit(&mut self, chosen_index: usize) -> Result<Answer, QuizError> {
        if self.all_answered() {
            return Err(QuizError::invalid("submit_answer", "every question is answered"));
        }
        if self.current_answer().is_some() {
            return Err(QuizError::invalid("submit_answer", "the current question is answered"));
        }

        let question = &self.questions[self.current_index];
        let answer = Answer {
            question_index: self.current_index,
            chosen_index,
            is_correct: question.is_correct(chosen_index),
            elapsed_seconds: self.elapsed_seconds,
        };
        if answer.is_correct {
            self.score += POINTS_PER_CORRECT;
        }
        self.answers.push(answer.clone());

        if self.reveal_policy == RevealPolicy::AtEnd && !self.is_last() {
            self.move_next();
        }
        Ok(answer)
    }

    /// Move past an answered question under `AfterEach`. Returns the next
    /// question, or `None` when the list is exhausted.
    pub fn advance(&mut self) -> Result<Option<&Question>, QuizError> {
        if self.reveal_policy != RevealPolicy::AfterEach {
            return Err(QuizError::invalid("advance", "answers are revealed at the end"));
        }
        if self.current_answer().is_none() {
            return Err(QuizError::invalid("advance", "the current question is unanswered"));
        }
        if self.is_last() {
            return Ok(None);
        }
        self.move_next();
        Ok(self.questions.get(self.current_index))
    }

    fn move_next(&mut self) {
        self.current_index += 1;
        self.elapsed_seconds = 0;
    }

    /// One second of wall time on the current question.
    pub fn tick(&mut self) {
        if self.current_answer().is_none() && !self.all_answered() {
            self.elapsed_seconds = self.elapsed_seconds.saturating_add(1);
        }
    }

    pub fn summary(&self) -> QuizSummary {
        QuizSummary {
            category_id: self.category_id.clone(),
            total_questions: self.questions.len(),
            correct_count: self.correct_count(),
            score: self.score,
            completion_points: self.questions.len() as u64 * COMPLETION_POINTS_PER_QUESTION,
            total_elapsed_seconds: self.answers.iter().map(|a| a.elapsed_seconds).sum(),
            answers: self.answers.clone(),
        }
    }
}
