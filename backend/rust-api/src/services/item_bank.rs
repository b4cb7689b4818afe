use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};
use std::collections::HashMap;

use super::ITEMS_COLLECTION;
use crate::error::{EngineError, EngineResult};
use crate::models::item::QuizItem;
use crate::models::Difficulty;

/// Read-only view of the generated item bank. The generation pipeline
/// owns writes; this engine only selects and resolves items.
pub struct ItemBank {
    mongo: Database,
}

impl ItemBank {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn collection(&self) -> Collection<QuizItem> {
        self.mongo.collection(ITEMS_COLLECTION)
    }

    /// Items of a course at a difficulty, oldest first so repeated
    /// selections page deterministically. `Difficulty::All` places no
    /// difficulty restriction.
    pub async fn list_items(
        &self,
        course_id: &str,
        difficulty: Difficulty,
        limit: u32,
    ) -> EngineResult<Vec<QuizItem>> {
        let mut filter = doc! { "course_id": course_id };
        if let Some(level) = difficulty.bank_filter() {
            filter.insert("difficulty", level);
        }

        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1 })
            .limit(i64::from(limit))
            .build();

        let mut cursor = self
            .collection()
            .find(filter)
            .with_options(options)
            .await
            .map_err(EngineError::Storage)?;

        let mut items = Vec::new();
        while let Some(item) = cursor.try_next().await.map_err(EngineError::Storage)? {
            items.push(item);
        }

        Ok(items)
    }

    /// Resolves a set of item ids into bank entries. Ids whose entry has
    /// been removed from the bank are simply absent from the map; the
    /// caller decides whether that is tolerable.
    pub async fn get_items(&self, item_ids: &[String]) -> EngineResult<HashMap<String, QuizItem>> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut cursor = self
            .collection()
            .find(doc! { "_id": { "$in": item_ids.to_vec() } })
            .await
            .map_err(EngineError::Storage)?;

        let mut lookup = HashMap::with_capacity(item_ids.len());
        while let Some(item) = cursor.try_next().await.map_err(EngineError::Storage)? {
            lookup.insert(item.id.clone(), item);
        }

        Ok(lookup)
    }
}
