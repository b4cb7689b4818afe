use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub mod attempt;
pub mod item;
pub mod scoring;

/// Difficulty band a quiz item was generated at. `All` is the wildcard:
/// a session started at `All` draws from the whole course bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
    All,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
            Difficulty::All => "all",
        }
    }

    /// Bank filter value, `None` meaning "no difficulty restriction".
    pub fn bank_filter(&self) -> Option<&'static str> {
        match self {
            Difficulty::All => None,
            other => Some(other.as_str()),
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::All
    }
}

/// A user's quiz run against one course. `item_ids` is the ordered
/// snapshot fixed at creation time and never rewritten; the counters are
/// cumulative across all scored batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSession {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub item_ids: Vec<String>,
    pub total_submitted: u32,
    pub total_correct: u32,
    pub total_time_seconds: f64,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuizSession {
    /// Cumulative score over everything submitted so far, if anything was.
    pub fn score_percentage(&self) -> Option<f64> {
        if self.total_submitted == 0 {
            return None;
        }
        Some((self.total_correct as f64 / self.total_submitted as f64) * 100.0)
    }
}

fn default_item_count() -> u32 {
    5
}

#[derive(Debug, Deserialize, Validate)]
pub struct StartSessionRequest {
    #[serde(default)]
    pub difficulty: Difficulty,

    #[serde(default = "default_item_count")]
    #[validate(range(min = 1, max = 50, message = "count must be between 1 and 50"))]
    pub count: u32,
}

/// Public view of a session, used for the incomplete-sessions listing and
/// as part of the start/detail responses. Never exposes `item_ids`.
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub course_id: String,
    pub total_submitted: u32,
    pub total_correct: u32,
    pub score_percentage: Option<f64>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&QuizSession> for SessionSummary {
    fn from(session: &QuizSession) -> Self {
        Self {
            id: session.id.clone(),
            course_id: session.course_id.clone(),
            total_submitted: session.total_submitted,
            total_correct: session.total_correct,
            score_percentage: session.score_percentage(),
            is_completed: session.is_completed,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionsList {
    pub data: Vec<SessionSummary>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session: SessionSummary,
    pub questions: item::PresentedBatch,
}

/// Full session view: the presented snapshot for resuming, and the attempt
/// history once (and only once) the session is completed.
#[derive(Debug, Serialize)]
pub struct SessionDetail {
    pub session: SessionSummary,
    pub questions: item::PresentedBatch,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<Vec<attempt::Attempt>>,
}
