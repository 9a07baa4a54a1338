//! The orchestrator: composes multi-step conversation operations.
//!
//! Every operation here follows the same shape: acquire the conversation's
//! exclusive lock, guard-check against the state read under that lock, stage
//! mutations on a working copy plus a [`TxnBuffer`], publish with one
//! [`Store::commit`], drop the lock, then dispatch collaborators. A failed
//! sub-step aborts before commit and the store is untouched.

use crate::collaborators::{AgentScheduler, AuditSink};
use crate::lifecycle::{transitions, ConversationMachine};
use crate::store::{Store, TxnBuffer};
use convoy_core::{
    AssignmentStatus, AuditEvent, Channel, Conversation, ConversationPriority, EngineError,
    EngineResult, EntityId, EntityKind, Handoff, Message, MessageSender, Queue, QueueItem,
    QueueItemState, Requester, TransitionContext,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

// ============================================================================
// REQUEST / VIEW TYPES
// ============================================================================

/// Input for appending a message to a conversation.
#[derive(Debug, Clone)]
pub struct AppendMessage {
    pub conversation_id: EntityId,
    pub sender: MessageSender,
    pub content: String,
    pub channel: Option<Channel>,
    pub metadata: Option<serde_json::Value>,
}

/// Input for escalating a conversation to a human queue.
#[derive(Debug, Clone)]
pub struct HandoffRequest {
    pub conversation_id: EntityId,
    pub queue_id: EntityId,
    pub reason_code: String,
    pub confidence: Option<f64>,
    pub policy_hits: Vec<String>,
    pub required_skills: Vec<String>,
    pub handoff_metadata: Option<serde_json::Value>,
    pub queue_item_metadata: Option<serde_json::Value>,
    pub channel: Option<Channel>,
}

/// Input for resolving a conversation directly.
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    pub conversation_id: EntityId,
    pub summary: String,
    pub actor: Option<EntityId>,
}

/// Full read model of one conversation aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ConversationView {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
    pub queue_items: Vec<QueueItem>,
    pub handoffs: Vec<Handoff>,
    pub current_assignment: Option<convoy_core::Assignment>,
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

pub struct Orchestrator {
    store: Arc<Store>,
    machine: ConversationMachine,
    scheduler: Arc<dyn AgentScheduler>,
    audit: Arc<dyn AuditSink>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<Store>,
        scheduler: Arc<dyn AgentScheduler>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            machine: crate::lifecycle::conversation_machine(),
            scheduler,
            audit,
        }
    }

    /// Swap in a different machine. Used by tests running reduced tables.
    pub fn with_machine(mut self, machine: ConversationMachine) -> Self {
        self.machine = machine;
        self
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub(crate) fn machine(&self) -> &ConversationMachine {
        &self.machine
    }

    pub(crate) fn dispatch_audit(&self, events: Vec<AuditEvent>) {
        for event in events {
            self.audit.record(event);
        }
    }

    // ------------------------------------------------------------------
    // Creation & reads
    // ------------------------------------------------------------------

    pub fn create_conversation(
        &self,
        requester: Requester,
        priority: ConversationPriority,
        metadata: Option<serde_json::Value>,
    ) -> Conversation {
        let mut conversation = Conversation::new(requester, priority);
        if let Some(metadata) = metadata {
            conversation = conversation.with_metadata(metadata);
        }
        self.store.insert_conversation(conversation.clone());
        tracing::info!(
            conversation_id = %conversation.conversation_id,
            "conversation created"
        );
        conversation
    }

    pub fn create_queue(
        &self,
        name: impl Into<String>,
        metadata: Option<serde_json::Value>,
    ) -> Queue {
        let mut queue = Queue::new(name);
        queue.metadata = metadata;
        self.store.insert_queue(queue.clone());
        queue
    }

    pub fn conversation(&self, id: EntityId) -> EngineResult<Conversation> {
        self.store
            .conversation(id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Conversation, id))
    }

    pub fn queue(&self, id: EntityId) -> EngineResult<Queue> {
        self.store
            .queue(id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Queue, id))
    }

    pub fn assignment(&self, id: EntityId) -> EngineResult<convoy_core::Assignment> {
        self.store
            .assignment(id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Assignment, id))
    }

    pub fn conversation_view(&self, id: EntityId) -> EngineResult<ConversationView> {
        let conversation = self.conversation(id)?;
        Ok(ConversationView {
            messages: self.store.messages_for(id),
            queue_items: self.store.queue_items_for(id),
            handoffs: self.store.handoffs_for(id),
            current_assignment: self.store.current_assignment(id),
            conversation,
        })
    }

    // ------------------------------------------------------------------
    // Message append
    // ------------------------------------------------------------------

    /// Append a message and make sure the automated agent is working the
    /// conversation. The `agent_begins` guard is re-checked under the lock,
    /// so two concurrent appends schedule at most one agent run.
    pub async fn append_message(&self, req: AppendMessage) -> EngineResult<Message> {
        if req.content.trim().is_empty() {
            return Err(EngineError::validation("content", "must not be blank"));
        }

        let lock = self.store.lock_handle(req.conversation_id);
        let mut schedule_agent = false;
        let message;
        let audit_events;
        {
            let _guard = lock.lock().await;
            let mut conversation = self.conversation(req.conversation_id)?;
            let now = Utc::now();

            message = Message {
                message_id: convoy_core::new_entity_id(),
                conversation_id: req.conversation_id,
                sequence: self.store.next_sequence(req.conversation_id),
                sender: req.sender,
                content: req.content,
                channel: req.channel,
                metadata: req.metadata,
                created_at: now,
            };
            self.store.insert_message(message.clone());

            if self.machine.can_apply(&conversation, transitions::AGENT_BEGINS) {
                let mut txn = TxnBuffer::default();
                let ctx = TransitionContext::new(now).with_channel(req.channel);
                self.machine.apply(
                    &mut conversation,
                    transitions::AGENT_BEGINS,
                    &mut txn,
                    &ctx,
                )?;
                audit_events = self.store.commit(conversation, txn);
                schedule_agent = true;
            } else {
                conversation.touch(now);
                self.store.insert_conversation(conversation);
                audit_events = Vec::new();
            }
        }

        self.dispatch_audit(audit_events);
        if schedule_agent {
            // Post-commit dispatch: a scheduler outage must not fail the
            // append, the committed state stands either way.
            if let Err(err) = self.scheduler.schedule(req.conversation_id) {
                tracing::error!(
                    conversation_id = %req.conversation_id,
                    error = %err,
                    "agent scheduling failed after commit"
                );
            }
        }
        Ok(message)
    }

    // ------------------------------------------------------------------
    // Handoff
    // ------------------------------------------------------------------

    /// Escalate a conversation to a human queue: `handoff_required` then
    /// `enqueue_for_human`, both staged in one transaction so a reader never
    /// observes "handed off but not enqueued".
    pub async fn trigger_handoff(&self, req: HandoffRequest) -> EngineResult<ConversationView> {
        if req.reason_code.trim().is_empty() {
            return Err(EngineError::validation("reason_code", "must not be blank"));
        }
        if let Some(c) = req.confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err(EngineError::validation(
                    "confidence",
                    "must be within [0, 1]",
                ));
            }
        }

        let lock = self.store.lock_handle(req.conversation_id);
        let audit_events;
        {
            let _guard = lock.lock().await;
            let mut conversation = self.conversation(req.conversation_id)?;
            self.queue(req.queue_id)?;

            let now = Utc::now();
            let mut txn = TxnBuffer::default();

            let mut handoff_ctx = TransitionContext::new(now)
                .with_channel(req.channel)
                .with_value("reason_code", json!(req.reason_code))
                .with_value("policy_hits", json!(req.policy_hits))
                .with_value("required_skills", json!(req.required_skills));
            if let Some(c) = req.confidence {
                handoff_ctx = handoff_ctx.with_value("confidence", json!(c));
            }
            if let Some(m) = req.handoff_metadata {
                handoff_ctx = handoff_ctx.with_value("handoff_metadata", m);
            }
            self.machine.apply(
                &mut conversation,
                transitions::HANDOFF_REQUIRED,
                &mut txn,
                &handoff_ctx,
            )?;

            let mut enqueue_ctx = TransitionContext::new(now)
                .with_channel(req.channel)
                .with_value("queue_id", json!(req.queue_id.to_string()));
            if let Some(m) = req.queue_item_metadata {
                enqueue_ctx = enqueue_ctx.with_value("queue_item_metadata", m);
            }
            self.machine.apply(
                &mut conversation,
                transitions::ENQUEUE_FOR_HUMAN,
                &mut txn,
                &enqueue_ctx,
            )?;

            audit_events = self.store.commit(conversation, txn);
        }

        self.dispatch_audit(audit_events);
        self.conversation_view(req.conversation_id)
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Resolve a conversation, closing out any open assignment and queue
    /// item in the same commit, then archive if the table allows it.
    pub async fn resolve_conversation(
        &self,
        req: ResolutionRequest,
    ) -> EngineResult<Conversation> {
        if req.summary.trim().is_empty() {
            return Err(EngineError::validation("summary", "must not be blank"));
        }

        let lock = self.store.lock_handle(req.conversation_id);
        let resolved;
        let audit_events;
        {
            let _guard = lock.lock().await;
            let mut conversation = self.conversation(req.conversation_id)?;
            let now = Utc::now();
            let mut txn = TxnBuffer::default();

            let ctx = TransitionContext::new(now)
                .with_actor(req.actor)
                .with_value("resolution_summary", json!(req.summary));
            self.machine
                .apply(&mut conversation, transitions::RESOLVE, &mut txn, &ctx)?;

            if let Some(mut assignment) = self.store.current_assignment(req.conversation_id) {
                assignment.status = AssignmentStatus::Resolved;
                assignment.resolved_at = Some(now);
                assignment.resolution_summary = Some(req.summary.clone());
                txn.assignments.push(assignment);
            }
            self.complete_active_queue_item(req.conversation_id, now, &mut txn);

            // Archive is best effort: resolution stands even when the table
            // has no archive row.
            if self.machine.can_apply(&conversation, transitions::ARCHIVE) {
                let archive_ctx = TransitionContext::new(now).with_actor(req.actor);
                self.machine.apply(
                    &mut conversation,
                    transitions::ARCHIVE,
                    &mut txn,
                    &archive_ctx,
                )?;
            }

            resolved = conversation.clone();
            audit_events = self.store.commit(conversation, txn);
        }

        self.dispatch_audit(audit_events);
        Ok(resolved)
    }

    /// Stage completion of the conversation's active queue item, if any.
    /// Callers hold the conversation lock.
    pub(crate) fn complete_active_queue_item(
        &self,
        conversation_id: EntityId,
        now: convoy_core::Timestamp,
        txn: &mut TxnBuffer,
    ) {
        if let Some(mut item) = self.store.active_queue_item(conversation_id) {
            item.state = QueueItemState::Completed;
            item.completed_at = Some(now);
            txn.queue_items.push(item);
        }
    }
}
