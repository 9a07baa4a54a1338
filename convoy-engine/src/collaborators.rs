//! Collaborator seams: agent scheduling and audit emission.
//!
//! Both are post-commit concerns. The orchestrator calls them only after the
//! store commit, never while holding a conversation lock, and a scheduling
//! failure is logged rather than propagated (the committed state stands).

use convoy_core::{AuditEvent, EntityId};
use std::sync::Mutex;
use thiserror::Error;

/// Failure reported by an [`AgentScheduler`] implementation.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("agent scheduling failed: {reason}")]
pub struct ScheduleError {
    pub reason: String,
}

impl ScheduleError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Hands a conversation to the automated agent runtime for a work turn.
pub trait AgentScheduler: Send + Sync {
    fn schedule(&self, conversation_id: EntityId) -> Result<(), ScheduleError>;
}

/// Default scheduler: log the request and do nothing else. Stands in until a
/// real agent runtime is attached.
#[derive(Debug, Default)]
pub struct LoggingScheduler;

impl AgentScheduler for LoggingScheduler {
    fn schedule(&self, conversation_id: EntityId) -> Result<(), ScheduleError> {
        tracing::info!(%conversation_id, "scheduling agent turn");
        Ok(())
    }
}

/// Test scheduler recording every scheduled conversation.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    runs: Mutex<Vec<EntityId>>,
    fail: bool,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scheduler whose every call fails, for exercising the post-commit
    /// error path.
    pub fn failing() -> Self {
        Self {
            runs: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn runs(&self) -> Vec<EntityId> {
        self.runs.lock().unwrap().clone()
    }
}

impl AgentScheduler for RecordingScheduler {
    fn schedule(&self, conversation_id: EntityId) -> Result<(), ScheduleError> {
        self.runs.lock().unwrap().push(conversation_id);
        if self.fail {
            return Err(ScheduleError::new("scheduler offline"));
        }
        Ok(())
    }
}

/// Receives committed audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Discards audit events.
#[derive(Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: AuditEvent) {}
}

/// Keeps audit events in memory, for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use convoy_core::ConversationStatus;
    use uuid::Uuid;

    #[test]
    fn test_recording_scheduler_captures_runs() {
        let scheduler = RecordingScheduler::new();
        let id = Uuid::now_v7();
        scheduler.schedule(id).unwrap();
        assert_eq!(scheduler.runs(), vec![id]);
    }

    #[test]
    fn test_failing_scheduler_still_records() {
        let scheduler = RecordingScheduler::failing();
        let id = Uuid::now_v7();
        assert!(scheduler.schedule(id).is_err());
        assert_eq!(scheduler.runs(), vec![id]);
    }

    #[test]
    fn test_memory_audit_sink_collects() {
        let sink = MemoryAuditSink::new();
        sink.record(AuditEvent {
            conversation_id: Uuid::now_v7(),
            transition: "agent_begins".to_string(),
            status_after: ConversationStatus::AgentWorking,
            occurred_at: Utc::now(),
            context: serde_json::Map::new(),
        });
        assert_eq!(sink.events().len(), 1);
    }
}
