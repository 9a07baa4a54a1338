//! Assignment lifecycle: accept, release, resolve.
//!
//! Assignment status and conversation status move together inside one
//! commit, so readers never see them disagree. A release always routes the
//! conversation back to the agent; re-queueing takes a fresh handoff.

use crate::lifecycle::transitions;
use crate::orchestrator::Orchestrator;
use crate::store::TxnBuffer;
use convoy_core::{
    Assignment, AssignmentStatus, EngineError, EngineResult, EntityId, TransitionContext,
};
use chrono::Utc;
use serde_json::json;

impl Orchestrator {
    /// Accept a claimed assignment, putting the human to work.
    pub async fn accept_assignment(
        &self,
        assignment_id: EntityId,
        actor: EntityId,
    ) -> EngineResult<Assignment> {
        let head = self.assignment(assignment_id)?;
        let lock = self.store().lock_handle(head.conversation_id);
        let accepted;
        let audit_events;
        {
            let _guard = lock.lock().await;
            let mut assignment = self.assignment(assignment_id)?;
            if assignment.status != AssignmentStatus::Assigned {
                return Err(assignment_conflict(&assignment, "accept", "assigned"));
            }

            let mut conversation = self.conversation(assignment.conversation_id)?;
            let now = Utc::now();
            let mut txn = TxnBuffer::default();

            let ctx = TransitionContext::new(now)
                .with_actor(Some(actor))
                .with_value("assignment_id", json!(assignment_id.to_string()));
            self.machine().apply(
                &mut conversation,
                transitions::HUMAN_ACCEPTS,
                &mut txn,
                &ctx,
            )?;

            assignment.status = AssignmentStatus::HumanWorking;
            assignment.accepted_at = Some(now);
            accepted = assignment.clone();
            txn.assignments.push(assignment);

            audit_events = self.store().commit(conversation, txn);
        }

        self.dispatch_audit(audit_events);
        Ok(accepted)
    }

    /// Release an assignment and route the conversation back to the agent.
    ///
    /// A release before acceptance first applies `human_accepts` and then
    /// `return_to_agent` in the same commit; observers only ever see the
    /// committed `back_to_agent` state.
    pub async fn release_assignment(
        &self,
        assignment_id: EntityId,
        actor: EntityId,
        reason: Option<String>,
    ) -> EngineResult<Assignment> {
        let head = self.assignment(assignment_id)?;
        let lock = self.store().lock_handle(head.conversation_id);
        let released;
        let audit_events;
        {
            let _guard = lock.lock().await;
            let mut assignment = self.assignment(assignment_id)?;
            if !assignment.is_current() {
                return Err(assignment_conflict(
                    &assignment,
                    "release",
                    "assigned or human_working",
                ));
            }

            let mut conversation = self.conversation(assignment.conversation_id)?;
            let now = Utc::now();
            let mut txn = TxnBuffer::default();
            let ctx = TransitionContext::new(now)
                .with_actor(Some(actor))
                .with_value("assignment_id", json!(assignment_id.to_string()));

            if assignment.status == AssignmentStatus::Assigned {
                self.machine().apply(
                    &mut conversation,
                    transitions::HUMAN_ACCEPTS,
                    &mut txn,
                    &ctx,
                )?;
            }
            self.machine().apply(
                &mut conversation,
                transitions::RETURN_TO_AGENT,
                &mut txn,
                &ctx,
            )?;

            assignment.status = AssignmentStatus::Released;
            assignment.released_at = Some(now);
            assignment.release_reason = reason;
            released = assignment.clone();
            txn.assignments.push(assignment);

            self.complete_active_queue_item(conversation.conversation_id, now, &mut txn);

            audit_events = self.store().commit(conversation, txn);
        }

        self.dispatch_audit(audit_events);
        Ok(released)
    }

    /// Resolve the conversation through its assignment.
    pub async fn resolve_assignment(
        &self,
        assignment_id: EntityId,
        actor: EntityId,
        summary: String,
    ) -> EngineResult<Assignment> {
        if summary.trim().is_empty() {
            return Err(EngineError::validation("summary", "must not be blank"));
        }

        let head = self.assignment(assignment_id)?;
        let lock = self.store().lock_handle(head.conversation_id);
        let resolved;
        let audit_events;
        {
            let _guard = lock.lock().await;
            let mut assignment = self.assignment(assignment_id)?;
            if assignment.status != AssignmentStatus::HumanWorking {
                return Err(assignment_conflict(&assignment, "resolve", "human_working"));
            }

            let mut conversation = self.conversation(assignment.conversation_id)?;
            let now = Utc::now();
            let mut txn = TxnBuffer::default();

            let ctx = TransitionContext::new(now)
                .with_actor(Some(actor))
                .with_value("resolution_summary", json!(summary));
            self.machine()
                .apply(&mut conversation, transitions::RESOLVE, &mut txn, &ctx)?;
            if self.machine().can_apply(&conversation, transitions::ARCHIVE) {
                let archive_ctx = TransitionContext::new(now).with_actor(Some(actor));
                self.machine().apply(
                    &mut conversation,
                    transitions::ARCHIVE,
                    &mut txn,
                    &archive_ctx,
                )?;
            }

            assignment.status = AssignmentStatus::Resolved;
            assignment.resolved_at = Some(now);
            assignment.resolution_summary = Some(summary);
            resolved = assignment.clone();
            txn.assignments.push(assignment);

            self.complete_active_queue_item(conversation.conversation_id, now, &mut txn);

            audit_events = self.store().commit(conversation, txn);
        }

        self.dispatch_audit(audit_events);
        Ok(resolved)
    }
}

fn assignment_conflict(assignment: &Assignment, action: &str, required: &str) -> EngineError {
    EngineError::AssignmentStateConflict {
        id: assignment.assignment_id,
        current: assignment.status.to_string(),
        action: action.to_string(),
        required: required.to_string(),
    }
}
