//! Queue item claim: the single contention point between waiting humans.
//!
//! The item's conversation lock serializes claimants. The item state is
//! re-read after acquiring the lock, so of two concurrent claims exactly one
//! finds `queued` and wins; the loser gets [`EngineError::AlreadyClaimed`].

use crate::lifecycle::transitions;
use crate::orchestrator::Orchestrator;
use crate::store::TxnBuffer;
use convoy_core::{
    Assignment, EngineError, EngineResult, EntityId, EntityKind, QueueItemState,
    TransitionContext,
};
use chrono::Utc;
use serde_json::json;

/// Input for claiming a queued item.
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    pub queue_item_id: EntityId,
    pub actor_id: EntityId,
    pub assignment_user_id: EntityId,
    pub assignment_metadata: Option<serde_json::Value>,
}

impl Orchestrator {
    /// Atomically claim a queued item: mark it hot, move the conversation to
    /// `assigned`, and open an assignment for the claiming user.
    pub async fn claim_queue_item(&self, req: ClaimRequest) -> EngineResult<Assignment> {
        // The pre-lock read only discovers which conversation to lock; every
        // decision below is re-made from state read under the lock.
        let head = self
            .store()
            .queue_item(req.queue_item_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::QueueItem, req.queue_item_id))?;

        let lock = self.store().lock_handle(head.conversation_id);
        let assignment;
        let audit_events;
        {
            let _guard = lock.lock().await;
            let mut item = self
                .store()
                .queue_item(req.queue_item_id)
                .ok_or_else(|| EngineError::not_found(EntityKind::QueueItem, req.queue_item_id))?;
            if item.state != QueueItemState::Queued {
                return Err(EngineError::AlreadyClaimed {
                    id: req.queue_item_id,
                });
            }

            let mut conversation = self.conversation(item.conversation_id)?;
            let now = Utc::now();
            let mut txn = TxnBuffer::default();

            let ctx = TransitionContext::new(now)
                .with_actor(Some(req.actor_id))
                .with_value("queue_item_id", json!(item.queue_item_id.to_string()))
                .with_value("user_id", json!(req.assignment_user_id.to_string()));
            self.machine()
                .apply(&mut conversation, transitions::ASSIGN_HUMAN, &mut txn, &ctx)?;

            item.state = QueueItemState::Hot;
            item.dequeued_at = Some(now);

            assignment = Assignment::claim(
                item.conversation_id,
                item.queue_id,
                req.assignment_user_id,
                now,
                req.assignment_metadata,
            );
            txn.queue_items.push(item);
            txn.assignments.push(assignment.clone());

            audit_events = self.store().commit(conversation, txn);
        }

        self.dispatch_audit(audit_events);
        Ok(assignment)
    }
}
