use chrono::{DateTime, Utc};
use mongodb::bson::{doc, to_bson, Bson, Document};
use mongodb::{ClientSession, Collection, Database};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;
use validator::Validate;

use super::completion::completion_due;
use super::item_bank::ItemBank;
use super::{ATTEMPTS_COLLECTION, SESSIONS_COLLECTION};
use crate::error::{EngineError, EngineResult};
use crate::metrics::{
    record_scored_submission, SESSIONS_ACTIVE, SESSIONS_TOTAL, STORE_TXN_RETRIES_TOTAL,
};
use crate::models::attempt::Attempt;
use crate::models::item::QuizItem;
use crate::models::scoring::{
    AnswerSubmission, ItemScore, RejectedSubmission, ScoreSummary, SubmissionBatch,
};
use crate::models::QuizSession;
use crate::utils::retry::{commit_with_retry, is_transient_txn_error, TxnRetryConfig};
use crate::utils::text::{is_blank, normalize_answer};

const FEEDBACK_CORRECT: &str = "Correct! Well done.";
const FEEDBACK_INCORRECT: &str = "Incorrect. Review the material.";
const REASON_ALREADY_ATTEMPTED: &str = "item already has a recorded attempt in this session";

/// Scores answer batches against a session's snapshot. Every call runs as
/// one MongoDB transaction: attempts, counters and the completion flag
/// land together or not at all. Overlapping calls against the same session
/// conflict on the session-document write; the loser retries and then sees
/// the winner's attempts.
pub struct ScoringService {
    mongo: Database,
    bank: ItemBank,
}

impl ScoringService {
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

    pub async fn score_batch(
        &self,
        session_id: &str,
        user_id: &str,
        batch: &SubmissionBatch,
    ) -> EngineResult<ScoreSummary> {
        batch.validate()?;
        if !batch.elapsed_seconds.is_finite() || batch.elapsed_seconds < 0.0 {
            return Err(EngineError::validation(
                "elapsed_seconds must be a non-negative number",
            ));
        }

        let client = self.mongo.client().clone();
        let mut txn = client.start_session().await.map_err(EngineError::Storage)?;

        let retry = TxnRetryConfig::default();
        let mut attempt_no = 0;
        let summary = loop {
            match self
                .score_batch_txn(&mut txn, session_id, user_id, batch)
                .await
            {
                Ok(summary) => break summary,
                Err(EngineError::Storage(err))
                    if is_transient_txn_error(&err) && attempt_no + 1 < retry.max_attempts =>
                {
                    attempt_no += 1;
                    STORE_TXN_RETRIES_TOTAL.inc();
                    tracing::warn!("scoring transaction retried after conflict: {}", err);
                    retry.sleep_for(attempt_no).await;
                }
                Err(err) => return Err(err),
            }
        };

        for result in &summary.results {
            record_scored_submission(result.is_correct);
        }
        if summary.is_completed {
            SESSIONS_TOTAL.with_label_values(&["completed"]).inc();
            SESSIONS_ACTIVE.dec();
        }

        tracing::info!(
            "Batch scored: session={}, accepted={}, correct={}, rejected={}, completed={}",
            session_id,
            summary.batch_submitted,
            summary.batch_correct,
            summary.rejected.len(),
            summary.is_completed
        );

        Ok(summary)
    }

    async fn score_batch_txn(
        &self,
        txn: &mut ClientSession,
        session_id: &str,
        user_id: &str,
        batch: &SubmissionBatch,
    ) -> EngineResult<ScoreSummary> {
        txn.start_transaction().await.map_err(EngineError::Storage)?;

        match self.score_batch_in_txn(txn, session_id, user_id, batch).await {
            Ok(summary) => {
                commit_with_retry(txn).await.map_err(EngineError::Storage)?;
                Ok(summary)
            }
            Err(err) => {
                let _ = txn.abort_transaction().await;
                Err(err)
            }
        }
    }

    async fn score_batch_in_txn(
        &self,
        txn: &mut ClientSession,
        session_id: &str,
        user_id: &str,
        batch: &SubmissionBatch,
    ) -> EngineResult<ScoreSummary> {
        let session = self
            .sessions()
            .find_one(doc! { "_id": session_id })
            .session(&mut *txn)
            .await
            .map_err(EngineError::Storage)?
            .ok_or_else(|| {
                EngineError::not_found(format!("quiz session {} not found", session_id))
            })?;

        if session.user_id != user_id {
            return Err(EngineError::forbidden(
                "permission denied to score this session",
            ));
        }

        if session.is_completed {
            return Err(EngineError::conflict(
                "quiz session is already completed; no further scoring is permitted",
            ));
        }

        let mut attempted: HashSet<String> = HashSet::new();
        let mut cursor = self
            .attempts()
            .find(doc! { "session_id": session_id })
            .session(&mut *txn)
            .await
            .map_err(EngineError::Storage)?;
        while let Some(attempt) = cursor.next(&mut *txn).await {
            attempted.insert(attempt.map_err(EngineError::Storage)?.item_id);
        }

        // The bank is read-only for this engine; resolving the correct
        // answers needs no transactional read.
        let submitted_ids: Vec<String> = batch
            .submissions
            .iter()
            .map(|sub| sub.item_id.clone())
            .collect();
        let bank = self.bank.get_items(&submitted_ids).await?;

        let now = Utc::now();
        let plan = plan_batch(
            &session,
            &batch.submissions,
            &attempted,
            &bank,
            batch.elapsed_seconds,
            now,
        )?;

        if !plan.attempts.is_empty() {
            self.attempts()
                .insert_many(&plan.attempts)
                .session(&mut *txn)
                .await
                .map_err(EngineError::Storage)?;
        }

        let distinct_after = attempted.len() + plan.attempts.len();
        let completed_now = completion_due(distinct_after, session.item_ids.len());

        let updated_at = to_bson(&now).unwrap_or_else(|_| Bson::String(now.to_rfc3339()));
        let mut set_doc = doc! { "updated_at": updated_at };
        if completed_now {
            // Monotonic: only ever set to true, never written back.
            set_doc.insert("is_completed", true);
        }

        let update: Document = doc! {
            "$inc": {
                "total_submitted": i64::from(plan.accepted()),
                "total_correct": i64::from(plan.correct()),
                "total_time_seconds": batch.elapsed_seconds,
            },
            "$set": set_doc,
        };

        self.sessions()
            .update_one(doc! { "_id": &session.id }, update)
            .session(&mut *txn)
            .await
            .map_err(EngineError::Storage)?;

        Ok(summarize(&session, plan, batch.elapsed_seconds, completed_now))
    }
}

#[derive(Debug)]
struct BatchPlan {
    attempts: Vec<Attempt>,
    results: Vec<ItemScore>,
    rejected: Vec<RejectedSubmission>,
}

impl BatchPlan {
    fn accepted(&self) -> u32 {
        self.attempts.len() as u32
    }

    fn correct(&self) -> u32 {
        self.attempts.iter().filter(|a| a.is_correct).count() as u32
    }
}

/// Pure scoring pass over one batch. Malformed input (an item outside the
/// snapshot, blank answer text) rejects the whole batch; replayed items
/// are turned away individually while the remainder is scored.
fn plan_batch(
    session: &QuizSession,
    submissions: &[AnswerSubmission],
    already_attempted: &HashSet<String>,
    bank: &HashMap<String, QuizItem>,
    elapsed_seconds: f64,
    now: DateTime<Utc>,
) -> EngineResult<BatchPlan> {
    let snapshot: HashSet<&str> = session.item_ids.iter().map(String::as_str).collect();

    for sub in submissions {
        if !snapshot.contains(sub.item_id.as_str()) {
            return Err(EngineError::validation(format!(
                "item {} is not part of this session",
                sub.item_id
            )));
        }
        if is_blank(&sub.selected_answer_text) {
            return Err(EngineError::validation(format!(
                "empty answer text for item {}",
                sub.item_id
            )));
        }
    }

    let mut missing: Vec<&str> = submissions
        .iter()
        .map(|sub| sub.item_id.as_str())
        .filter(|id| !bank.contains_key(*id))
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        missing.dedup();
        return Err(EngineError::not_found(format!(
            "quiz items no longer in the bank: {}",
            missing.join(", ")
        )));
    }

    let mut scorable: Vec<&AnswerSubmission> = Vec::with_capacity(submissions.len());
    let mut rejected = Vec::new();
    let mut seen_in_batch: HashSet<&str> = HashSet::new();

    for sub in submissions {
        let id = sub.item_id.as_str();
        if already_attempted.contains(id) || !seen_in_batch.insert(id) {
            rejected.push(RejectedSubmission {
                item_id: sub.item_id.clone(),
                reason: REASON_ALREADY_ATTEMPTED.to_string(),
            });
        } else {
            scorable.push(sub);
        }
    }

    let time_per_item = if scorable.is_empty() {
        0.0
    } else {
        elapsed_seconds / scorable.len() as f64
    };

    let mut attempts = Vec::with_capacity(scorable.len());
    let mut results = Vec::with_capacity(scorable.len());

    for sub in scorable {
        let item = &bank[sub.item_id.as_str()];
        let correct_text = item.correct_answer.trim().to_string();
        let is_correct =
            normalize_answer(&sub.selected_answer_text) == normalize_answer(&item.correct_answer);

        let feedback = if is_correct {
            FEEDBACK_CORRECT
        } else {
            FEEDBACK_INCORRECT
        };

        results.push(ItemScore {
            item_id: sub.item_id.clone(),
            is_correct,
            correct_answer_text: correct_text.clone(),
            feedback: feedback.to_string(),
        });

        attempts.push(Attempt {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            item_id: sub.item_id.clone(),
            user_id: session.user_id.clone(),
            selected_answer_text: sub.selected_answer_text.clone(),
            is_correct,
            correct_answer_text: correct_text,
            time_spent_seconds: time_per_item,
            created_at: now,
        });
    }

    Ok(BatchPlan {
        attempts,
        results,
        rejected,
    })
}

fn summarize(
    session: &QuizSession,
    plan: BatchPlan,
    elapsed_seconds: f64,
    completed_now: bool,
) -> ScoreSummary {
    let accepted = plan.accepted();
    let correct = plan.correct();

    let score_percentage = if accepted > 0 {
        round2(f64::from(correct) / f64::from(accepted) * 100.0)
    } else {
        0.0
    };

    ScoreSummary {
        batch_submitted: accepted,
        batch_correct: correct,
        score_percentage,
        results: plan.results,
        rejected: plan.rejected,
        total_submitted: session.total_submitted + accepted,
        total_correct: session.total_correct + correct,
        total_time_seconds: session.total_time_seconds + elapsed_seconds,
        is_completed: completed_now,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
