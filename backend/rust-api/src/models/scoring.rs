use serde::{Deserialize, Serialize};
use validator::Validate;

/// The user's answer for one snapshot item. Matching is on the submitted
/// text: presented choice identifiers are re-minted on every render and
/// deliberately unusable as submission keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub item_id: String,
    pub selected_answer_text: String,
}

/// Container for one scoring call.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmissionBatch {
    #[validate(length(min = 1, message = "batch contains no submissions"))]
    pub submissions: Vec<AnswerSubmission>,

    /// Wall-clock seconds the user spent on this batch.
    #[serde(default)]
    pub elapsed_seconds: f64,
}

/// Result for a single scored item.
#[derive(Debug, Serialize)]
pub struct ItemScore {
    pub item_id: String,
    pub is_correct: bool,
    pub correct_answer_text: String,
    pub feedback: String,
}

/// A submission turned away without being scored (replayed item). The rest
/// of the batch is still scored.
#[derive(Debug, Serialize)]
pub struct RejectedSubmission {
    pub item_id: String,
    pub reason: String,
}

/// Outcome of one scoring call. The `batch_*` fields and
/// `score_percentage` cover only the batch just scored; the `total_*`
/// fields are the session's updated cumulative counters.
#[derive(Debug, Serialize)]
pub struct ScoreSummary {
    pub batch_submitted: u32,
    pub batch_correct: u32,
    pub score_percentage: f64,
    pub results: Vec<ItemScore>,
    pub rejected: Vec<RejectedSubmission>,

    pub total_submitted: u32,
    pub total_correct: u32,
    pub total_time_seconds: f64,
    pub is_completed: bool,
}
