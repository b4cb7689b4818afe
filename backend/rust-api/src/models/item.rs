use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Difficulty;

/// A generated multiple-choice item as stored in the `quiz_items`
/// collection. The bank is written by the external generation pipeline and
/// read-only from this engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub course_id: String,
    pub quiz_text: String,
    pub correct_answer: String,
    pub distractor_1: String,
    pub distractor_2: String,
    pub distractor_3: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub source_chunk_id: String,
    pub created_at: DateTime<Utc>,
}

impl QuizItem {
    /// The four answer texts, correct answer first. Presentation shuffles
    /// this; nothing user-facing may rely on the order here.
    pub fn choice_texts(&self) -> [&str; 4] {
        [
            &self.correct_answer,
            &self.distractor_1,
            &self.distractor_2,
            &self.distractor_3,
        ]
    }
}

/// One selectable answer as shown to the user. `choice_id` is minted fresh
/// for every presentation and carries no relationship to the item id, the
/// text, or correctness.
#[derive(Debug, Clone, Serialize)]
pub struct PresentedChoice {
    pub choice_id: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PresentedQuestion {
    pub item_id: String,
    pub quiz_text: String,
    pub choices: Vec<PresentedChoice>,
}

#[derive(Debug, Serialize)]
pub struct PresentedBatch {
    pub data: Vec<PresentedQuestion>,
    pub count: usize,
}
