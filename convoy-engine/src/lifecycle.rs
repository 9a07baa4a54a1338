//! The conversation lifecycle: transition table and bound effects.
//!
//! The table is configuration handed to the generic engine, not hard-coded
//! logic; tests are free to build alternative tables (for instance, one
//! without `archive`) and run the same orchestrator against them.

use crate::store::TxnBuffer;
use convoy_core::{
    AuditEvent, Conversation, ConversationStatus, EngineError, EngineResult, Handoff, Machine,
    QueueItem, TransitionContext, TransitionTable,
};
use uuid::Uuid;

/// Transition names for the conversation lifecycle.
pub mod transitions {
    pub const AGENT_BEGINS: &str = "agent_begins";
    pub const HANDOFF_REQUIRED: &str = "handoff_required";
    pub const ENQUEUE_FOR_HUMAN: &str = "enqueue_for_human";
    pub const ASSIGN_HUMAN: &str = "assign_human";
    pub const HUMAN_ACCEPTS: &str = "human_accepts";
    pub const RETURN_TO_AGENT: &str = "return_to_agent";
    pub const HUMAN_RECLAIM: &str = "human_reclaim";
    pub const RESOLVE: &str = "resolve";
    pub const ARCHIVE: &str = "archive";

    pub const ALL: [&str; 9] = [
        AGENT_BEGINS,
        HANDOFF_REQUIRED,
        ENQUEUE_FOR_HUMAN,
        ASSIGN_HUMAN,
        HUMAN_ACCEPTS,
        RETURN_TO_AGENT,
        HUMAN_RECLAIM,
        RESOLVE,
        ARCHIVE,
    ];
}

/// A machine over conversations staging side effects in a [`TxnBuffer`].
pub type ConversationMachine = Machine<Conversation, TxnBuffer>;

/// The full conversation transition table.
pub fn conversation_table() -> TransitionTable<ConversationStatus> {
    use ConversationStatus::*;

    TransitionTable::builder()
        .transition(transitions::AGENT_BEGINS, &[New, BackToAgent], AgentWorking)
        .transition(transitions::HANDOFF_REQUIRED, &[AgentWorking], NeedsHuman)
        .transition(transitions::ENQUEUE_FOR_HUMAN, &[NeedsHuman], Queued)
        .transition(transitions::ASSIGN_HUMAN, &[Queued], Assigned)
        .transition(transitions::HUMAN_ACCEPTS, &[Assigned], HumanWorking)
        .transition(transitions::RETURN_TO_AGENT, &[HumanWorking], BackToAgent)
        .transition(
            transitions::HUMAN_RECLAIM,
            &[BackToAgent, AgentWorking],
            HumanWorking,
        )
        .transition(transitions::RESOLVE, &[AgentWorking, HumanWorking], Resolved)
        .transition(transitions::ARCHIVE, &[Resolved], Archived)
        .build()
}

/// Build the conversation machine with its lifecycle effects registered.
///
/// Per transition, effect order is: transition-specific effects first
/// (handoff log append, queue item creation), then the activity-timestamp
/// effect, then the audit effect, so audit records always see the final
/// entity state of the transition.
pub fn conversation_machine() -> ConversationMachine {
    build_machine(conversation_table())
}

/// Wire the standard effects onto an arbitrary conversation table. Exposed
/// so tests can run the orchestrator against reduced tables.
pub fn build_machine(table: TransitionTable<ConversationStatus>) -> ConversationMachine {
    let mut machine = Machine::new(table)
        .on(transitions::HANDOFF_REQUIRED, append_handoff_record)
        .on(transitions::ENQUEUE_FOR_HUMAN, create_queue_item);

    for name in transitions::ALL {
        machine = machine
            .on(name, |conversation, _txn, ctx| {
                conversation.touch(ctx.occurred_at);
                Ok(())
            })
            .on(name, audit_effect(name));
    }

    machine
}

/// Effect bound to `handoff_required`: append a Handoff log record built
/// from the transition context.
fn append_handoff_record(
    conversation: &mut Conversation,
    txn: &mut TxnBuffer,
    ctx: &TransitionContext,
) -> EngineResult<()> {
    let reason_code = ctx.require_str("reason_code")?.to_string();
    let confidence = ctx.value("confidence").and_then(|v| v.as_f64());
    if let Some(c) = confidence {
        if !(0.0..=1.0).contains(&c) {
            return Err(EngineError::validation(
                "confidence",
                "must be within [0, 1]",
            ));
        }
    }

    txn.handoffs.push(Handoff {
        handoff_id: Uuid::now_v7(),
        conversation_id: conversation.conversation_id,
        reason_code,
        confidence,
        policy_hits: string_list(ctx, "policy_hits"),
        required_skills: string_list(ctx, "required_skills"),
        metadata: ctx.value("handoff_metadata").cloned(),
        created_at: ctx.occurred_at,
    });
    Ok(())
}

/// Effect bound to `enqueue_for_human`: create the QueueItem in `queued`
/// state for the queue named in the context.
fn create_queue_item(
    conversation: &mut Conversation,
    txn: &mut TxnBuffer,
    ctx: &TransitionContext,
) -> EngineResult<()> {
    let queue_id = ctx.require_id("queue_id")?;
    txn.queue_items.push(QueueItem::enqueue(
        conversation.conversation_id,
        queue_id,
        ctx.occurred_at,
        ctx.value("queue_item_metadata").cloned(),
    ));
    Ok(())
}

/// Effect registered on every transition: stage an audit event reflecting
/// the committed transition.
fn audit_effect(
    name: &'static str,
) -> impl Fn(&mut Conversation, &mut TxnBuffer, &TransitionContext) -> EngineResult<()> {
    move |conversation, txn, ctx| {
        txn.audit.push(AuditEvent {
            conversation_id: conversation.conversation_id,
            transition: name.to_string(),
            status_after: conversation.status,
            occurred_at: ctx.occurred_at,
            context: ctx.data().clone(),
        });
        Ok(())
    }
}

fn string_list(ctx: &TransitionContext, key: &str) -> Vec<String> {
    ctx.value(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use convoy_core::{ConversationPriority, Requester, RequesterKind};
    use serde_json::json;

    fn conversation_in(status: ConversationStatus) -> Conversation {
        let mut conv = Conversation::new(
            Requester {
                kind: RequesterKind::Customer,
                external_ref: "test".to_string(),
            },
            ConversationPriority::Normal,
        );
        conv.status = status;
        conv
    }

    #[test]
    fn test_table_matches_lifecycle() {
        let table = conversation_table();
        assert!(table.can_apply(ConversationStatus::New, transitions::AGENT_BEGINS));
        assert!(table.can_apply(ConversationStatus::BackToAgent, transitions::AGENT_BEGINS));
        assert!(table.can_apply(ConversationStatus::AgentWorking, transitions::HUMAN_RECLAIM));
        assert!(!table.can_apply(ConversationStatus::Queued, transitions::RESOLVE));
        assert!(!table.can_apply(ConversationStatus::Archived, transitions::AGENT_BEGINS));
    }

    #[test]
    fn test_handoff_effect_stages_record() {
        let machine = conversation_machine();
        let mut conv = conversation_in(ConversationStatus::AgentWorking);
        let mut txn = TxnBuffer::default();
        let ctx = TransitionContext::new(Utc::now())
            .with_value("reason_code", json!("low_confidence"))
            .with_value("confidence", json!(0.2))
            .with_value("policy_hits", json!(["rule-1"]));

        machine
            .apply(&mut conv, transitions::HANDOFF_REQUIRED, &mut txn, &ctx)
            .unwrap();

        assert_eq!(conv.status, ConversationStatus::NeedsHuman);
        assert_eq!(txn.handoffs.len(), 1);
        assert_eq!(txn.handoffs[0].reason_code, "low_confidence");
        assert_eq!(txn.handoffs[0].policy_hits, vec!["rule-1".to_string()]);
        // Audit effect ran last and saw the post-transition status.
        assert_eq!(txn.audit.len(), 1);
        assert_eq!(txn.audit[0].status_after, ConversationStatus::NeedsHuman);
    }

    #[test]
    fn test_handoff_effect_requires_reason_code() {
        let machine = conversation_machine();
        let mut conv = conversation_in(ConversationStatus::AgentWorking);
        let mut txn = TxnBuffer::default();
        let ctx = TransitionContext::new(Utc::now());

        let err = machine
            .apply(&mut conv, transitions::HANDOFF_REQUIRED, &mut txn, &ctx)
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
        // Aborted effect leaves nothing staged for commit.
        assert!(txn.handoffs.is_empty());
        assert!(txn.audit.is_empty());
    }

    #[test]
    fn test_enqueue_effect_creates_queue_item() {
        let machine = conversation_machine();
        let mut conv = conversation_in(ConversationStatus::NeedsHuman);
        let mut txn = TxnBuffer::default();
        let queue_id = Uuid::now_v7();
        let ctx = TransitionContext::new(Utc::now())
            .with_value("queue_id", json!(queue_id.to_string()));

        machine
            .apply(&mut conv, transitions::ENQUEUE_FOR_HUMAN, &mut txn, &ctx)
            .unwrap();

        assert_eq!(conv.status, ConversationStatus::Queued);
        assert_eq!(txn.queue_items.len(), 1);
        assert_eq!(txn.queue_items[0].queue_id, queue_id);
    }

    #[test]
    fn test_out_of_range_confidence_aborts() {
        let machine = conversation_machine();
        let mut conv = conversation_in(ConversationStatus::AgentWorking);
        let mut txn = TxnBuffer::default();
        let ctx = TransitionContext::new(Utc::now())
            .with_value("reason_code", json!("x"))
            .with_value("confidence", json!(1.5));

        assert!(machine
            .apply(&mut conv, transitions::HANDOFF_REQUIRED, &mut txn, &ctx)
            .is_err());
    }
}
