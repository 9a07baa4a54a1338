//! End-to-end orchestration tests over the in-memory store.

use convoy_engine::{
    build_machine, transitions, AppendMessage, ClaimRequest, HandoffRequest, MemoryAuditSink,
    Orchestrator, RecordingScheduler, ResolutionRequest, Store,
};
use convoy_core::{
    AssignmentStatus, Channel, ConversationPriority, ConversationStatus, EngineError,
    MessageSender, QueueItemState, Requester, RequesterKind, TransitionTable,
};
use serde_json::json;
use std::sync::Arc;

struct Rig {
    orchestrator: Arc<Orchestrator>,
    scheduler: Arc<RecordingScheduler>,
    audit: Arc<MemoryAuditSink>,
    store: Arc<Store>,
}

fn rig() -> Rig {
    rig_with(RecordingScheduler::new())
}

fn rig_with(scheduler: RecordingScheduler) -> Rig {
    let store = Arc::new(Store::new());
    let scheduler = Arc::new(scheduler);
    let audit = Arc::new(MemoryAuditSink::new());
    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        scheduler.clone(),
        audit.clone(),
    ));
    Rig {
        orchestrator,
        scheduler,
        audit,
        store,
    }
}

fn requester() -> Requester {
    Requester {
        kind: RequesterKind::Customer,
        external_ref: "cust-42".to_string(),
    }
}

fn append(conversation_id: convoy_core::EntityId, content: &str) -> AppendMessage {
    AppendMessage {
        conversation_id,
        sender: MessageSender::Requester,
        content: content.to_string(),
        channel: Some(Channel::Web),
        metadata: None,
    }
}

fn handoff(
    conversation_id: convoy_core::EntityId,
    queue_id: convoy_core::EntityId,
) -> HandoffRequest {
    HandoffRequest {
        conversation_id,
        queue_id,
        reason_code: "low_confidence".to_string(),
        confidence: Some(0.31),
        policy_hits: vec!["confidence_below_threshold".to_string()],
        required_skills: vec!["billing".to_string()],
        handoff_metadata: None,
        queue_item_metadata: None,
        channel: Some(Channel::Web),
    }
}

#[tokio::test]
async fn test_full_lifecycle_scenario() {
    let rig = rig();
    let orch = &rig.orchestrator;
    let user = convoy_core::new_entity_id();

    let conv = orch.create_conversation(requester(), ConversationPriority::High, None);
    assert_eq!(conv.status, ConversationStatus::New);

    // Append puts the agent to work and schedules exactly one run.
    let msg = orch
        .append_message(append(conv.conversation_id, "my invoice is wrong"))
        .await
        .unwrap();
    assert_eq!(msg.sequence, 1);
    let conv1 = orch.conversation(conv.conversation_id).unwrap();
    assert_eq!(conv1.status, ConversationStatus::AgentWorking);
    assert_eq!(rig.scheduler.runs(), vec![conv.conversation_id]);

    // Handoff escalates: one Handoff record plus one queued item, atomically.
    let queue = orch.create_queue("billing", None);
    let view = orch
        .trigger_handoff(handoff(conv.conversation_id, queue.queue_id))
        .await
        .unwrap();
    assert_eq!(view.conversation.status, ConversationStatus::Queued);
    assert_eq!(view.handoffs.len(), 1);
    assert_eq!(view.handoffs[0].reason_code, "low_confidence");
    assert_eq!(view.queue_items.len(), 1);
    assert_eq!(view.queue_items[0].state, QueueItemState::Queued);

    // Claim moves item to hot and opens one assignment.
    let assignment = orch
        .claim_queue_item(ClaimRequest {
            queue_item_id: view.queue_items[0].queue_item_id,
            actor_id: user,
            assignment_user_id: user,
            assignment_metadata: None,
        })
        .await
        .unwrap();
    assert_eq!(assignment.status, AssignmentStatus::Assigned);
    let view = orch.conversation_view(conv.conversation_id).unwrap();
    assert_eq!(view.conversation.status, ConversationStatus::Assigned);
    assert_eq!(view.queue_items[0].state, QueueItemState::Hot);
    assert!(view.queue_items[0].dequeued_at.is_some());
    assert!(view.current_assignment.is_some());

    // Accept, then resolve through the assignment.
    let accepted = orch
        .accept_assignment(assignment.assignment_id, user)
        .await
        .unwrap();
    assert_eq!(accepted.status, AssignmentStatus::HumanWorking);
    assert_eq!(
        orch.conversation(conv.conversation_id).unwrap().status,
        ConversationStatus::HumanWorking
    );

    let resolved = orch
        .resolve_assignment(assignment.assignment_id, user, "refund issued".to_string())
        .await
        .unwrap();
    assert_eq!(resolved.status, AssignmentStatus::Resolved);
    assert_eq!(resolved.resolution_summary.as_deref(), Some("refund issued"));

    let final_view = orch.conversation_view(conv.conversation_id).unwrap();
    // Archive was legal, so the opportunistic archive landed too.
    assert_eq!(final_view.conversation.status, ConversationStatus::Archived);
    assert_eq!(final_view.queue_items[0].state, QueueItemState::Completed);
    assert!(final_view.current_assignment.is_none());

    // Audit trail covers every committed transition in order.
    let trail: Vec<String> = rig
        .audit
        .events()
        .iter()
        .map(|e| e.transition.clone())
        .collect();
    assert_eq!(
        trail,
        vec![
            transitions::AGENT_BEGINS,
            transitions::HANDOFF_REQUIRED,
            transitions::ENQUEUE_FOR_HUMAN,
            transitions::ASSIGN_HUMAN,
            transitions::HUMAN_ACCEPTS,
            transitions::RESOLVE,
            transitions::ARCHIVE,
        ]
    );
}

#[tokio::test]
async fn test_concurrent_claims_one_winner() {
    let rig = rig();
    let orch = &rig.orchestrator;

    let conv = orch.create_conversation(requester(), ConversationPriority::Normal, None);
    orch.append_message(append(conv.conversation_id, "help"))
        .await
        .unwrap();
    let queue = orch.create_queue("support", None);
    let view = orch
        .trigger_handoff(handoff(conv.conversation_id, queue.queue_id))
        .await
        .unwrap();
    let item_id = view.queue_items[0].queue_item_id;

    let a = {
        let orch = rig.orchestrator.clone();
        tokio::spawn(async move {
            orch.claim_queue_item(ClaimRequest {
                queue_item_id: item_id,
                actor_id: convoy_core::new_entity_id(),
                assignment_user_id: convoy_core::new_entity_id(),
                assignment_metadata: None,
            })
            .await
        })
    };
    let b = {
        let orch = rig.orchestrator.clone();
        tokio::spawn(async move {
            orch.claim_queue_item(ClaimRequest {
                queue_item_id: item_id,
                actor_id: convoy_core::new_entity_id(),
                assignment_user_id: convoy_core::new_entity_id(),
                assignment_metadata: None,
            })
            .await
        })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    let loss = results.iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(
        loss.as_ref().unwrap_err(),
        EngineError::AlreadyClaimed { .. }
    ));

    assert_eq!(
        rig.store.queue_item(item_id).unwrap().state,
        QueueItemState::Hot
    );
    assert_eq!(rig.store.assignments_for(conv.conversation_id).len(), 1);
}

#[tokio::test]
async fn test_concurrent_appends_schedule_agent_once() {
    let rig = rig();
    let conv = rig
        .orchestrator
        .create_conversation(requester(), ConversationPriority::Normal, None);

    let a = {
        let orch = rig.orchestrator.clone();
        let id = conv.conversation_id;
        tokio::spawn(async move { orch.append_message(append(id, "first")).await })
    };
    let b = {
        let orch = rig.orchestrator.clone();
        let id = conv.conversation_id;
        tokio::spawn(async move { orch.append_message(append(id, "second")).await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(rig.scheduler.runs(), vec![conv.conversation_id]);
    let messages = rig.store.messages_for(conv.conversation_id);
    assert_eq!(messages.len(), 2);
    assert_eq!(
        messages.iter().map(|m| m.sequence).collect::<Vec<_>>(),
        vec![1, 2]
    );
}

#[tokio::test]
async fn test_handoff_missing_queue_leaves_state_unchanged() {
    let rig = rig();
    let orch = &rig.orchestrator;
    let conv = orch.create_conversation(requester(), ConversationPriority::Normal, None);
    orch.append_message(append(conv.conversation_id, "hi"))
        .await
        .unwrap();

    let err = orch
        .trigger_handoff(handoff(
            conv.conversation_id,
            convoy_core::new_entity_id(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));

    let view = orch.conversation_view(conv.conversation_id).unwrap();
    assert_eq!(view.conversation.status, ConversationStatus::AgentWorking);
    assert!(view.handoffs.is_empty());
    assert!(view.queue_items.is_empty());
}

#[tokio::test]
async fn test_handoff_enqueue_failure_discards_whole_handoff() {
    // Table without `enqueue_for_human`: the first sub-transition succeeds in
    // the working copy, the second fails, and nothing may commit.
    let table = TransitionTable::builder()
        .transition(
            transitions::AGENT_BEGINS,
            &[ConversationStatus::New, ConversationStatus::BackToAgent],
            ConversationStatus::AgentWorking,
        )
        .transition(
            transitions::HANDOFF_REQUIRED,
            &[ConversationStatus::AgentWorking],
            ConversationStatus::NeedsHuman,
        )
        .build();

    let rig = rig();
    let orch = Orchestrator::new(rig.store.clone(), rig.scheduler.clone(), rig.audit.clone())
        .with_machine(build_machine(table));

    let conv = orch.create_conversation(requester(), ConversationPriority::Normal, None);
    let queue = orch.create_queue("support", None);
    orch.append_message(append(conv.conversation_id, "hi"))
        .await
        .unwrap();

    let err = orch
        .trigger_handoff(handoff(conv.conversation_id, queue.queue_id))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownTransition { .. }));

    let view = orch.conversation_view(conv.conversation_id).unwrap();
    assert_eq!(view.conversation.status, ConversationStatus::AgentWorking);
    assert!(view.handoffs.is_empty());
    assert!(view.queue_items.is_empty());
    // Only the append's transition made it into the audit trail.
    assert_eq!(rig.audit.events().len(), 1);
}

#[tokio::test]
async fn test_handoff_from_wrong_state_is_conflict() {
    let rig = rig();
    let orch = &rig.orchestrator;
    let conv = orch.create_conversation(requester(), ConversationPriority::Normal, None);
    let queue = orch.create_queue("support", None);

    // Still `new`: handoff_required does not apply.
    let err = orch
        .trigger_handoff(handoff(conv.conversation_id, queue.queue_id))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert!(rig.audit.events().is_empty());
}

#[tokio::test]
async fn test_scheduler_failure_does_not_fail_append() {
    let rig = rig_with(RecordingScheduler::failing());
    let conv = rig
        .orchestrator
        .create_conversation(requester(), ConversationPriority::Normal, None);

    rig.orchestrator
        .append_message(append(conv.conversation_id, "hello"))
        .await
        .unwrap();

    // The transition committed even though scheduling failed afterwards.
    assert_eq!(
        rig.orchestrator
            .conversation(conv.conversation_id)
            .unwrap()
            .status,
        ConversationStatus::AgentWorking
    );
    assert_eq!(rig.scheduler.runs(), vec![conv.conversation_id]);
}

#[tokio::test]
async fn test_release_returns_conversation_to_agent() {
    let rig = rig();
    let orch = &rig.orchestrator;
    let user = convoy_core::new_entity_id();

    let conv = orch.create_conversation(requester(), ConversationPriority::Normal, None);
    orch.append_message(append(conv.conversation_id, "hi"))
        .await
        .unwrap();
    let queue = orch.create_queue("support", None);
    let view = orch
        .trigger_handoff(handoff(conv.conversation_id, queue.queue_id))
        .await
        .unwrap();
    let assignment = orch
        .claim_queue_item(ClaimRequest {
            queue_item_id: view.queue_items[0].queue_item_id,
            actor_id: user,
            assignment_user_id: user,
            assignment_metadata: None,
        })
        .await
        .unwrap();

    // Release straight from `assigned`, before acceptance.
    let released = orch
        .release_assignment(assignment.assignment_id, user, Some("shift end".to_string()))
        .await
        .unwrap();
    assert_eq!(released.status, AssignmentStatus::Released);
    assert_eq!(released.release_reason.as_deref(), Some("shift end"));

    let view = orch.conversation_view(conv.conversation_id).unwrap();
    assert_eq!(view.conversation.status, ConversationStatus::BackToAgent);
    assert!(view.current_assignment.is_none());
    assert_eq!(view.queue_items[0].state, QueueItemState::Completed);

    // A released assignment cannot be released again.
    let err = orch
        .release_assignment(assignment.assignment_id, user, None)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    // Never two current assignments for one conversation.
    assert!(rig
        .store
        .assignments_for(conv.conversation_id)
        .iter()
        .filter(|a| a.is_current())
        .count()
        <= 1);
}

#[tokio::test]
async fn test_accept_requires_assigned_state() {
    let rig = rig();
    let orch = &rig.orchestrator;
    let user = convoy_core::new_entity_id();

    let conv = orch.create_conversation(requester(), ConversationPriority::Normal, None);
    orch.append_message(append(conv.conversation_id, "hi"))
        .await
        .unwrap();
    let queue = orch.create_queue("support", None);
    let view = orch
        .trigger_handoff(handoff(conv.conversation_id, queue.queue_id))
        .await
        .unwrap();
    let assignment = orch
        .claim_queue_item(ClaimRequest {
            queue_item_id: view.queue_items[0].queue_item_id,
            actor_id: user,
            assignment_user_id: user,
            assignment_metadata: None,
        })
        .await
        .unwrap();

    orch.accept_assignment(assignment.assignment_id, user)
        .await
        .unwrap();
    let err = orch
        .accept_assignment(assignment.assignment_id, user)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::AssignmentStateConflict { .. }
    ));
}

#[tokio::test]
async fn test_resolve_conversation_closes_open_work() {
    let rig = rig();
    let orch = &rig.orchestrator;
    let user = convoy_core::new_entity_id();

    let conv = orch.create_conversation(requester(), ConversationPriority::Normal, None);
    orch.append_message(append(conv.conversation_id, "hi"))
        .await
        .unwrap();
    let queue = orch.create_queue("support", None);
    let view = orch
        .trigger_handoff(handoff(conv.conversation_id, queue.queue_id))
        .await
        .unwrap();
    let assignment = orch
        .claim_queue_item(ClaimRequest {
            queue_item_id: view.queue_items[0].queue_item_id,
            actor_id: user,
            assignment_user_id: user,
            assignment_metadata: None,
        })
        .await
        .unwrap();
    orch.accept_assignment(assignment.assignment_id, user)
        .await
        .unwrap();

    // Conversation-level resolution also closes the assignment and item.
    orch.resolve_conversation(ResolutionRequest {
        conversation_id: conv.conversation_id,
        summary: "handled".to_string(),
        actor: Some(user),
    })
    .await
    .unwrap();

    let view = orch.conversation_view(conv.conversation_id).unwrap();
    assert_eq!(view.conversation.status, ConversationStatus::Archived);
    assert!(view.current_assignment.is_none());
    assert_eq!(view.queue_items[0].state, QueueItemState::Completed);
    assert_eq!(
        rig.store.assignment(assignment.assignment_id).unwrap().status,
        AssignmentStatus::Resolved
    );
}

#[tokio::test]
async fn test_resolve_without_archive_row_still_succeeds() {
    // Same table minus `archive`: resolution must not depend on it.
    let table = TransitionTable::builder()
        .transition(
            transitions::AGENT_BEGINS,
            &[ConversationStatus::New, ConversationStatus::BackToAgent],
            ConversationStatus::AgentWorking,
        )
        .transition(
            transitions::RESOLVE,
            &[
                ConversationStatus::AgentWorking,
                ConversationStatus::HumanWorking,
            ],
            ConversationStatus::Resolved,
        )
        .build();

    let rig = rig();
    let store = rig.store.clone();
    let orch = Orchestrator::new(store, rig.scheduler.clone(), rig.audit.clone())
        .with_machine(build_machine(table));

    let conv = orch.create_conversation(requester(), ConversationPriority::Normal, None);
    orch.append_message(append(conv.conversation_id, "hi"))
        .await
        .unwrap();

    let resolved = orch
        .resolve_conversation(ResolutionRequest {
            conversation_id: conv.conversation_id,
            summary: "done".to_string(),
            actor: None,
        })
        .await
        .unwrap();
    assert_eq!(resolved.status, ConversationStatus::Resolved);
}

#[tokio::test]
async fn test_append_rejects_blank_content() {
    let rig = rig();
    let conv = rig
        .orchestrator
        .create_conversation(requester(), ConversationPriority::Normal, None);

    let err = rig
        .orchestrator
        .append_message(append(conv.conversation_id, "   "))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { .. }));
    assert!(rig.store.messages_for(conv.conversation_id).is_empty());
}

#[tokio::test]
async fn test_handoff_with_metadata_round_trips() {
    let rig = rig();
    let orch = &rig.orchestrator;
    let conv = orch.create_conversation(requester(), ConversationPriority::Normal, None);
    orch.append_message(append(conv.conversation_id, "hi"))
        .await
        .unwrap();
    let queue = orch.create_queue("support", None);

    let mut req = handoff(conv.conversation_id, queue.queue_id);
    req.handoff_metadata = Some(json!({"model": "triage-v2"}));
    req.queue_item_metadata = Some(json!({"sla": "gold"}));
    let view = orch.trigger_handoff(req).await.unwrap();

    assert_eq!(
        view.handoffs[0].metadata,
        Some(json!({"model": "triage-v2"}))
    );
    assert_eq!(view.queue_items[0].metadata, Some(json!({"sla": "gold"})));
}
