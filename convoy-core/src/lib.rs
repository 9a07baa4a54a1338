//! Convoy Core - Domain Types & Transition Engine
//!
//! Pure domain logic with no I/O and no async:
//! - Identity and timestamp aliases
//! - Conversation/queue/assignment entity structures
//! - The generic, configuration-driven transition engine
//! - Handoff policy rule schema, validation, and normalization
//! - The domain error taxonomy
//!
//! Everything concurrency-related (locks, stores, orchestration) lives in
//! `convoy-engine`; this crate stays deterministic and unit-testable.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod entities;
pub mod enums;
pub mod error;
pub mod machine;
pub mod policy;

pub use entities::*;
pub use enums::*;
pub use error::*;
pub use machine::*;
pub use policy::*;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
/// UUIDv7 embeds a Unix timestamp, making IDs naturally sortable by creation time.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}
