//! In-memory store with per-conversation exclusive locks.
//!
//! The conversation row is the single source of truth for "what may happen
//! next": every multi-step operation takes the conversation's lock before
//! checking any guard, and keeps it until its transaction buffer is
//! committed. Reads return clones; mutations only land through
//! [`Store::commit`], so an aborted composite operation leaves no trace.

use convoy_core::{
    Assignment, AuditEvent, Conversation, EntityId, Handoff, Message, Queue, QueueItem,
};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

// ============================================================================
// TRANSACTION BUFFER
// ============================================================================

/// Staged writes for one logical operation on a conversation aggregate.
///
/// Lifecycle effects and orchestration code push records here instead of
/// writing to the store; [`Store::commit`] publishes everything at once.
/// Entries keyed by an existing id overwrite that row (queue item state
/// changes, assignment updates).
#[derive(Debug, Default)]
pub struct TxnBuffer {
    pub handoffs: Vec<Handoff>,
    pub queue_items: Vec<QueueItem>,
    pub assignments: Vec<Assignment>,
    pub audit: Vec<AuditEvent>,
}

// ============================================================================
// STORE
// ============================================================================

/// Embedded storage for all Convoy entities.
#[derive(Debug, Default)]
pub struct Store {
    conversations: DashMap<EntityId, Conversation>,
    queues: DashMap<EntityId, Queue>,
    queue_items: DashMap<EntityId, QueueItem>,
    assignments: DashMap<EntityId, Assignment>,
    handoffs: DashMap<EntityId, Handoff>,
    messages: DashMap<EntityId, Message>,
    message_seq: DashMap<EntityId, i64>,
    locks: DashMap<EntityId, Arc<Mutex<()>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// The exclusive lock guarding one conversation aggregate. Lock order is
    /// conversation first, then queue item: items are only ever mutated while
    /// their conversation's lock is held.
    pub fn lock_handle(&self, conversation_id: EntityId) -> Arc<Mutex<()>> {
        self.locks
            .entry(conversation_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // ------------------------------------------------------------------
    // Conversations
    // ------------------------------------------------------------------

    pub fn insert_conversation(&self, conversation: Conversation) {
        self.conversations
            .insert(conversation.conversation_id, conversation);
    }

    pub fn conversation(&self, id: EntityId) -> Option<Conversation> {
        self.conversations.get(&id).map(|c| c.clone())
    }

    // ------------------------------------------------------------------
    // Queues & queue items
    // ------------------------------------------------------------------

    pub fn insert_queue(&self, queue: Queue) {
        self.queues.insert(queue.queue_id, queue);
    }

    pub fn queue(&self, id: EntityId) -> Option<Queue> {
        self.queues.get(&id).map(|q| q.clone())
    }

    pub fn queue_item(&self, id: EntityId) -> Option<QueueItem> {
        self.queue_items.get(&id).map(|i| i.clone())
    }

    /// All queue items for a conversation, oldest first.
    pub fn queue_items_for(&self, conversation_id: EntityId) -> Vec<QueueItem> {
        let mut items: Vec<QueueItem> = self
            .queue_items
            .iter()
            .filter(|entry| entry.conversation_id == conversation_id)
            .map(|entry| entry.clone())
            .collect();
        items.sort_by_key(|i| i.enqueued_at);
        items
    }

    /// The conversation's single active (non-completed) item, if any.
    pub fn active_queue_item(&self, conversation_id: EntityId) -> Option<QueueItem> {
        self.queue_items
            .iter()
            .find(|entry| entry.conversation_id == conversation_id && entry.state.is_active())
            .map(|entry| entry.clone())
    }

    // ------------------------------------------------------------------
    // Assignments
    // ------------------------------------------------------------------

    pub fn assignment(&self, id: EntityId) -> Option<Assignment> {
        self.assignments.get(&id).map(|a| a.clone())
    }

    /// All assignments for a conversation, oldest first (audit history).
    pub fn assignments_for(&self, conversation_id: EntityId) -> Vec<Assignment> {
        let mut assignments: Vec<Assignment> = self
            .assignments
            .iter()
            .filter(|entry| entry.conversation_id == conversation_id)
            .map(|entry| entry.clone())
            .collect();
        assignments.sort_by_key(|a| a.assigned_at);
        assignments
    }

    /// The conversation's current assignment: neither released nor resolved.
    /// At most one exists at any time.
    pub fn current_assignment(&self, conversation_id: EntityId) -> Option<Assignment> {
        self.assignments
            .iter()
            .find(|entry| entry.conversation_id == conversation_id && entry.is_current())
            .map(|entry| entry.clone())
    }

    // ------------------------------------------------------------------
    // Handoffs & messages
    // ------------------------------------------------------------------

    pub fn handoffs_for(&self, conversation_id: EntityId) -> Vec<Handoff> {
        let mut handoffs: Vec<Handoff> = self
            .handoffs
            .iter()
            .filter(|entry| entry.conversation_id == conversation_id)
            .map(|entry| entry.clone())
            .collect();
        handoffs.sort_by_key(|h| h.created_at);
        handoffs
    }

    pub fn insert_message(&self, message: Message) {
        self.messages.insert(message.message_id, message);
    }

    pub fn messages_for(&self, conversation_id: EntityId) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .messages
            .iter()
            .filter(|entry| entry.conversation_id == conversation_id)
            .map(|entry| entry.clone())
            .collect();
        messages.sort_by_key(|m| m.sequence);
        messages
    }

    /// Next message sequence number for a conversation (1-based). Callers
    /// hold the conversation lock while appending.
    pub fn next_sequence(&self, conversation_id: EntityId) -> i64 {
        let mut entry = self.message_seq.entry(conversation_id).or_insert(0);
        *entry += 1;
        *entry
    }

    // ------------------------------------------------------------------
    // Commit
    // ------------------------------------------------------------------

    /// Publish one logical operation: the updated conversation plus every
    /// staged record, in one pass while the caller still holds the
    /// conversation lock. Returns the buffered audit events for post-commit
    /// dispatch.
    pub fn commit(&self, conversation: Conversation, txn: TxnBuffer) -> Vec<AuditEvent> {
        for handoff in txn.handoffs {
            self.handoffs.insert(handoff.handoff_id, handoff);
        }
        for item in txn.queue_items {
            self.queue_items.insert(item.queue_item_id, item);
        }
        for assignment in txn.assignments {
            self.assignments.insert(assignment.assignment_id, assignment);
        }
        self.insert_conversation(conversation);
        txn.audit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use convoy_core::{ConversationPriority, QueueItemState, Requester, RequesterKind};
    use uuid::Uuid;

    fn conversation() -> Conversation {
        Conversation::new(
            Requester {
                kind: RequesterKind::Customer,
                external_ref: "test".to_string(),
            },
            ConversationPriority::Normal,
        )
    }

    #[test]
    fn test_commit_publishes_staged_records() {
        let store = Store::new();
        let conv = conversation();
        let id = conv.conversation_id;
        store.insert_conversation(conv.clone());

        let mut txn = TxnBuffer::default();
        txn.queue_items
            .push(QueueItem::enqueue(id, Uuid::now_v7(), Utc::now(), None));

        store.commit(conv, txn);
        assert_eq!(store.queue_items_for(id).len(), 1);
        assert!(store.active_queue_item(id).is_some());
    }

    #[test]
    fn test_active_queue_item_ignores_completed() {
        let store = Store::new();
        let conv_id = Uuid::now_v7();
        let mut item = QueueItem::enqueue(conv_id, Uuid::now_v7(), Utc::now(), None);
        item.state = QueueItemState::Completed;
        item.completed_at = Some(Utc::now());
        store.queue_items.insert(item.queue_item_id, item);

        assert!(store.active_queue_item(conv_id).is_none());
    }

    #[test]
    fn test_sequence_is_monotonic() {
        let store = Store::new();
        let id = Uuid::now_v7();
        assert_eq!(store.next_sequence(id), 1);
        assert_eq!(store.next_sequence(id), 2);
        assert_eq!(store.next_sequence(Uuid::now_v7()), 1);
    }

    #[test]
    fn test_lock_handle_is_shared_per_conversation() {
        let store = Store::new();
        let id = Uuid::now_v7();
        let a = store.lock_handle(id);
        let b = store.lock_handle(id);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
