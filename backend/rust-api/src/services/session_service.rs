use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use mongodb::{ClientSession, Collection, Database};
use uuid::Uuid;
use validator::Validate;

use super::item_bank::ItemBank;
use super::{is_duplicate_key, ATTEMPTS_COLLECTION, SESSIONS_COLLECTION};
use crate::error::{EngineError, EngineResult};
use crate::metrics::{SESSIONS_ACTIVE, SESSIONS_TOTAL, STORE_TXN_RETRIES_TOTAL};
use crate::models::attempt::Attempt;
use crate::models::{QuizSession, SessionSummary, StartSessionRequest};
use crate::utils::retry::{commit_with_retry, is_transient_txn_error, TxnRetryConfig};

/// Session selection and storage. Creation is the one place two requests
/// from the same user can race; everything here funnels through a single
/// transaction backed by the partial unique index on
/// `(user_id, course_id, is_completed = false)`.
pub struct SessionService {
    mongo: Database,
    bank: ItemBank,
}

impl SessionService {
    pub fn new(mongo: Database) -> Self {
        let bank = ItemBank::new(mongo.clone());
        Self { mongo, bank }
    }

    fn sessions(&self) -> Collection<QuizSession> {
        self.mongo.collection(SESSIONS_COLLECTION)
    }

    fn attempts(&self) -> Collection<Attempt> {
        self.mongo.collection(ATTEMPTS_COLLECTION)
    }

    /// Creates a new session: selects the item snapshot and persists it
    /// with zeroed counters. Fails with a conflict if the user already has
    /// an incomplete session for the course — the caller must resume or
    /// finish that one first, a retry will not help.
    pub async fn start_session(
        &self,
        user_id: &str,
        course_id: &str,
        req: &StartSessionRequest,
    ) -> EngineResult<QuizSession> {
        req.validate()?;

        let items = self
            .bank
            .list_items(course_id, req.difficulty, req.count)
            .await?;

        if items.is_empty() {
            return Err(EngineError::not_found(format!(
                "no quiz items found for course {} at difficulty {}",
                course_id,
                req.difficulty.as_str()
            )));
        }

        let item_ids: Vec<String> = items.into_iter().map(|item| item.id).collect();

        let now = Utc::now();
        let session = QuizSession {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            item_ids,
            total_submitted: 0,
            total_correct: 0,
            total_time_seconds: 0.0,
            is_completed: false,
            created_at: now,
            updated_at: now,
        };

        let client = self.mongo.client().clone();
        let mut txn = client.start_session().await.map_err(EngineError::Storage)?;

        let retry = TxnRetryConfig::default();
        let mut attempt_no = 0;
        loop {
            match self.insert_session_txn(&mut txn, &session).await {
                Ok(()) => break,
                Err(EngineError::Storage(err))
                    if is_transient_txn_error(&err) && attempt_no + 1 < retry.max_attempts =>
                {
                    attempt_no += 1;
                    STORE_TXN_RETRIES_TOTAL.inc();
                    tracing::warn!("session insert retried after transient error: {}", err);
                    retry.sleep_for(attempt_no).await;
                }
                Err(err) => return Err(err),
            }
        }

        SESSIONS_TOTAL.with_label_values(&["created"]).inc();
        SESSIONS_ACTIVE.inc();

        tracing::info!(
            "Session created: {} for user {} on course {} ({} items)",
            session.id,
            user_id,
            course_id,
            session.item_ids.len()
        );

        Ok(session)
    }

    /// Precondition read and insert in one transaction. The unique index
    /// is the backstop: if two starts race past the read, one insert dies
    /// with a duplicate key and surfaces the same conflict.
    async fn insert_session_txn(
        &self,
        txn: &mut ClientSession,
        session: &QuizSession,
    ) -> EngineResult<()> {
        txn.start_transaction().await.map_err(EngineError::Storage)?;

        let existing = self
            .sessions()
            .find_one(doc! {
                "user_id": &session.user_id,
                "course_id": &session.course_id,
                "is_completed": false,
            })
            .session(&mut *txn)
            .await;

        match existing {
            Ok(Some(_)) => {
                let _ = txn.abort_transaction().await;
                return Err(duplicate_session_conflict());
            }
            Ok(None) => {}
            Err(err) => {
                let _ = txn.abort_transaction().await;
                return Err(EngineError::Storage(err));
            }
        }

        if let Err(err) = self.sessions().insert_one(session).session(&mut *txn).await {
            let _ = txn.abort_transaction().await;
            if is_duplicate_key(&err) {
                return Err(duplicate_session_conflict());
            }
            return Err(EngineError::Storage(err));
        }

        commit_with_retry(txn).await.map_err(EngineError::Storage)
    }

    /// The user's incomplete sessions for a course, most recently touched
    /// first.
    pub async fn list_incomplete(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> EngineResult<Vec<SessionSummary>> {
        let options = FindOptions::builder()
            .sort(doc! { "updated_at": -1 })
            .build();

        let mut cursor = self
            .sessions()
            .find(doc! {
                "user_id": user_id,
                "course_id": course_id,
                "is_completed": false,
            })
            .with_options(options)
            .await
            .map_err(EngineError::Storage)?;

        let mut summaries = Vec::new();
        while let Some(session) = cursor.try_next().await.map_err(EngineError::Storage)? {
            summaries.push(SessionSummary::from(&session));
        }

        Ok(summaries)
    }

    /// Loads a session and enforces ownership for reads: the owner always,
    /// a superuser may also look.
    pub async fn get_owned_session(
        &self,
        session_id: &str,
        user_id: &str,
        is_superuser: bool,
    ) -> EngineResult<QuizSession> {
        let session = self
            .sessions()
            .find_one(doc! { "_id": session_id })
            .await
            .map_err(EngineError::Storage)?
            .ok_or_else(|| {
                EngineError::not_found(format!("quiz session {} not found", session_id))
            })?;

        if session.user_id != user_id && !is_superuser {
            return Err(EngineError::forbidden(
                "permission denied to access this session",
            ));
        }

        Ok(session)
    }

    /// The session's attempt history, oldest first.
    pub async fn attempts_for(&self, session_id: &str) -> EngineResult<Vec<Attempt>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1 })
            .build();

        let mut cursor = self
            .attempts()
            .find(doc! { "session_id": session_id })
            .with_options(options)
            .await
            .map_err(EngineError::Storage)?;

        let mut attempts = Vec::new();
        while let Some(attempt) = cursor.try_next().await.map_err(EngineError::Storage)? {
            attempts.push(attempt);
        }

        Ok(attempts)
    }
}

fn duplicate_session_conflict() -> EngineError {
    EngineError::conflict(
        "an incomplete quiz session already exists for this course; resume or finish it first",
    )
}
