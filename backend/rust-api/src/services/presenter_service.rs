use mongodb::Database;
use rand::seq::SliceRandom;
use uuid::Uuid;

use super::item_bank::ItemBank;
use crate::error::EngineResult;
use crate::models::item::{PresentedBatch, PresentedChoice, PresentedQuestion, QuizItem};

/// Renders bank items into user-facing questions. Choice order is drawn
/// from the process CSPRNG on every call and each choice gets a freshly
/// minted opaque identifier, so nothing about a choice id or position can
/// be correlated with correctness across presentations.
pub struct PresenterService {
    bank: ItemBank,
}

impl PresenterService {
    pub fn new(mongo: Database) -> Self {
        Self {
            bank: ItemBank::new(mongo),
        }
    }

    /// Presents a session's snapshot in snapshot order. Ids whose bank
    /// entry has been removed (document deletion cascade) are skipped:
    /// re-presentation is for display, and the scorer reports missing
    /// entries on its own terms.
    pub async fn present(&self, item_ids: &[String]) -> EngineResult<PresentedBatch> {
        let lookup = self.bank.get_items(item_ids).await?;

        let mut data = Vec::with_capacity(item_ids.len());
        for item_id in item_ids {
            if let Some(item) = lookup.get(item_id) {
                data.push(present_item(item));
            } else {
                tracing::warn!("snapshot item {} no longer in bank, skipping", item_id);
            }
        }

        Ok(PresentedBatch {
            count: data.len(),
            data,
        })
    }
}

fn present_item(item: &QuizItem) -> PresentedQuestion {
    let mut texts = item.choice_texts().to_vec();
    texts.shuffle(&mut rand::rng());

    let choices = texts
        .into_iter()
        .map(|text| PresentedChoice {
            choice_id: Uuid::new_v4().to_string(),
            text: text.to_string(),
        })
        .collect();

    PresentedQuestion {
        item_id: item.id.clone(),
        quiz_text: item.quiz_text.clone(),
        choices,
    }
}
