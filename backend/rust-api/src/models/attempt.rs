use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable record of one scored submission, written at most once per
/// `(session_id, item_id)`. `correct_answer_text` is denormalized at
/// scoring time so the audit trail stays stable even if the bank entry
/// later changes or disappears.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    #[serde(rename = "_id")]
    pub id: String,
    pub session_id: String,
    pub item_id: String,
    pub user_id: String,
    pub selected_answer_text: String,
    pub is_correct: bool,
    pub correct_answer_text: String,
    pub time_spent_seconds: f64,
    pub created_at: DateTime<Utc>,
}
