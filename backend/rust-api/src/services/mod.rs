use crate::config::Config;
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client as MongoClient, Database, IndexModel};

pub const ITEMS_COLLECTION: &str = "quiz_items";
pub const SESSIONS_COLLECTION: &str = "quiz_sessions";
pub const ATTEMPTS_COLLECTION: &str = "quiz_attempts";

pub struct AppState {
    pub config: Config,
    pub mongo: Database,
}

impl AppState {
    pub async fn new(config: Config, mongo_client: MongoClient) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);

        ensure_indexes(&mongo).await?;

        Ok(Self { config, mongo })
    }
}

/// Creates the indexes the engine's invariants lean on. Idempotent:
/// MongoDB treats re-creating an identical index as a no-op.
async fn ensure_indexes(mongo: &Database) -> anyhow::Result<()> {
    // At most one incomplete session per (user, course). The partial
    // filter keeps completed history out of the constraint.
    let active_session_index = IndexModel::builder()
        .keys(doc! { "user_id": 1, "course_id": 1 })
        .options(
            IndexOptions::builder()
                .unique(true)
                .partial_filter_expression(doc! { "is_completed": false })
                .name("uniq_incomplete_session_per_user_course".to_string())
                .build(),
        )
        .build();
    mongo
        .collection::<mongodb::bson::Document>(SESSIONS_COLLECTION)
        .create_index(active_session_index)
        .await?;

    // At most one attempt per (session, item): replays are rejected at
    // the storage layer even if two batches race past the in-transaction
    // duplicate check.
    let attempt_index = IndexModel::builder()
        .keys(doc! { "session_id": 1, "item_id": 1 })
        .options(
            IndexOptions::builder()
                .unique(true)
                .name("uniq_attempt_per_session_item".to_string())
                .build(),
        )
        .build();
    mongo
        .collection::<mongodb::bson::Document>(ATTEMPTS_COLLECTION)
        .create_index(attempt_index)
        .await?;

    // Selector query: items of a course at a difficulty, oldest first.
    let bank_index = IndexModel::builder()
        .keys(doc! { "course_id": 1, "difficulty": 1, "created_at": 1 })
        .options(
            IndexOptions::builder()
                .name("bank_course_difficulty_created".to_string())
                .build(),
        )
        .build();
    mongo
        .collection::<mongodb::bson::Document>(ITEMS_COLLECTION)
        .create_index(bank_index)
        .await?;

    tracing::info!("MongoDB indexes ensured");

    Ok(())
}

/// Unique-index violation on a single write (MongoDB error code 11000).
pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(ref we))
            if we.code == 11000
    )
}

pub mod completion;
pub mod item_bank;
pub mod presenter_service;
pub mod scoring_service;
pub mod session_service;
