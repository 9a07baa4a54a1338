//! Convoy Engine - Conversation Orchestration
//!
//! The concurrency layer around `convoy-core`:
//! - In-memory store with one exclusive async lock per conversation aggregate
//! - The conversation transition machine wired with lifecycle effects
//! - Queue admission and atomic claim
//! - Assignment lifecycle (accept / release / resolve)
//! - The orchestrator composing multi-step operations atomically
//! - Collaborator seams for agent scheduling and audit emission
//!
//! Every multi-step operation (claim, handoff+enqueue, resolve+archive,
//! accept, release) holds the conversation lock across the whole guard-check
//! and mutation sequence, stages its writes in a transaction buffer, and
//! publishes them in one commit. No lock is ever held across a collaborator
//! call.

pub mod assignment;
pub mod collaborators;
pub mod lifecycle;
pub mod orchestrator;
pub mod queue;
pub mod store;

pub use collaborators::{
    AgentScheduler, AuditSink, LoggingScheduler, MemoryAuditSink, NoopAuditSink,
    RecordingScheduler, ScheduleError,
};
pub use lifecycle::{
    build_machine, conversation_machine, conversation_table, transitions, ConversationMachine,
};
pub use orchestrator::{
    AppendMessage, ConversationView, HandoffRequest, Orchestrator, ResolutionRequest,
};
pub use queue::ClaimRequest;
pub use store::{Store, TxnBuffer};
