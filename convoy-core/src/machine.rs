//! Generic, configuration-driven transition engine.
//!
//! A [`TransitionTable`] is data: a set of named transitions, each with a
//! finite from-state set and a single target state. One [`Machine`] evaluates
//! any such table for any entity type, so unit tests can define minimal
//! synthetic machines instead of exercising the whole conversation lifecycle.
//!
//! Post-transition effects are bound by transition name in an ordered
//! registry resolved at startup. Effects run synchronously in registration
//! order; an effect failure propagates and aborts the whole transition (the
//! caller's transaction never commits a half-applied composite).

use crate::{Channel, EngineError, EngineResult, EntityId, Timestamp};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// STATE HOLDER
// ============================================================================

/// An entity whose lifecycle is governed by a transition table.
pub trait StateHolder {
    type State: Copy + Eq + fmt::Debug;

    fn state(&self) -> Self::State;
    fn set_state(&mut self, next: Self::State);
}

// ============================================================================
// TRANSITION TABLE
// ============================================================================

/// A single named transition: legal source states and one target state.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionDef<S> {
    pub name: String,
    pub from: Vec<S>,
    pub to: S,
}

/// The set of transitions governing one entity type.
///
/// The table is configuration, not logic: callers build it at startup and
/// the engine evaluates it. Transition names are unique within a table.
#[derive(Debug, Clone, Default)]
pub struct TransitionTable<S> {
    transitions: HashMap<String, TransitionDef<S>>,
}

impl<S: Copy + Eq + fmt::Debug> TransitionTable<S> {
    pub fn builder() -> TransitionTableBuilder<S> {
        TransitionTableBuilder {
            transitions: HashMap::new(),
        }
    }

    /// Look up a transition by name.
    pub fn get(&self, name: &str) -> Option<&TransitionDef<S>> {
        self.transitions.get(name)
    }

    /// True iff the transition exists and `current` is in its from-set.
    pub fn can_apply(&self, current: S, name: &str) -> bool {
        self.transitions
            .get(name)
            .map(|def| def.from.contains(&current))
            .unwrap_or(false)
    }

    /// Resolve the transition and check its guard, reporting exactly why it
    /// cannot apply. Callers surface `InvalidTransition` as a conflict, which
    /// is what stops a second caller from silently mutating state after a
    /// concurrent request already moved the entity.
    pub fn guard(&self, current: S, name: &str) -> EngineResult<&TransitionDef<S>> {
        let def = self
            .transitions
            .get(name)
            .ok_or_else(|| EngineError::UnknownTransition {
                name: name.to_string(),
            })?;
        if !def.from.contains(&current) {
            return Err(EngineError::InvalidTransition {
                name: name.to_string(),
                current: format!("{:?}", current),
                expected: def.from.iter().map(|s| format!("{:?}", s)).collect(),
            });
        }
        Ok(def)
    }
}

/// Builder for [`TransitionTable`].
pub struct TransitionTableBuilder<S> {
    transitions: HashMap<String, TransitionDef<S>>,
}

impl<S: Copy + Eq + fmt::Debug> TransitionTableBuilder<S> {
    /// Declare a transition. Redeclaring a name replaces the earlier entry.
    pub fn transition(mut self, name: &str, from: &[S], to: S) -> Self {
        self.transitions.insert(
            name.to_string(),
            TransitionDef {
                name: name.to_string(),
                from: from.to_vec(),
                to,
            },
        );
        self
    }

    pub fn build(self) -> TransitionTable<S> {
        TransitionTable {
            transitions: self.transitions,
        }
    }
}

// ============================================================================
// TRANSITION CONTEXT
// ============================================================================

/// Request-provided payload passed to every effect of a transition: typed
/// common fields plus a free-form key/value map for transition-specific data
/// (reason codes, queue ids, summaries, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionContext {
    pub occurred_at: Timestamp,
    pub channel: Option<Channel>,
    pub actor: Option<EntityId>,
    data: serde_json::Map<String, serde_json::Value>,
}

impl TransitionContext {
    pub fn new(occurred_at: Timestamp) -> Self {
        Self {
            occurred_at,
            channel: None,
            actor: None,
            data: serde_json::Map::new(),
        }
    }

    pub fn with_channel(mut self, channel: Option<Channel>) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_actor(mut self, actor: Option<EntityId>) -> Self {
        self.actor = actor;
        self
    }

    /// Attach a transition-specific value.
    pub fn with_value(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    pub fn value(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Fetch a required string value, failing validation when absent or blank.
    pub fn require_str(&self, key: &str) -> EngineResult<&str> {
        match self.data.get(key).and_then(|v| v.as_str()) {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(EngineError::validation(key, "required non-blank string")),
        }
    }

    /// Fetch a required UUID value.
    pub fn require_id(&self, key: &str) -> EngineResult<EntityId> {
        self.require_str(key)?
            .parse()
            .map_err(|_| EngineError::validation(key, "must be a valid UUID"))
    }

    /// Snapshot of the free-form payload, for audit records.
    pub fn data(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.data
    }
}

// ============================================================================
// MACHINE (table + effect registry)
// ============================================================================

/// A post-transition effect. `X` is caller-supplied transaction scratch:
/// effects stage side-effect records there instead of touching storage, so
/// an aborted composite leaves no trace.
pub type EffectFn<E, X> =
    Box<dyn Fn(&mut E, &mut X, &TransitionContext) -> EngineResult<()> + Send + Sync>;

/// One transition table plus the effects registered against it.
pub struct Machine<E: StateHolder, X> {
    table: TransitionTable<E::State>,
    effects: HashMap<String, Vec<EffectFn<E, X>>>,
}

impl<E: StateHolder, X> Machine<E, X> {
    pub fn new(table: TransitionTable<E::State>) -> Self {
        Self {
            table,
            effects: HashMap::new(),
        }
    }

    /// Register an effect for a transition. Effects run in registration order.
    pub fn on(
        mut self,
        transition: &str,
        effect: impl Fn(&mut E, &mut X, &TransitionContext) -> EngineResult<()>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.effects
            .entry(transition.to_string())
            .or_default()
            .push(Box::new(effect));
        self
    }

    pub fn table(&self) -> &TransitionTable<E::State> {
        &self.table
    }

    /// True iff the transition's guard holds for the entity's current state.
    pub fn can_apply(&self, entity: &E, name: &str) -> bool {
        self.table.can_apply(entity.state(), name)
    }

    /// Apply a transition: re-check the guard, move to the target state, then
    /// run every registered effect in order. Never a silent no-op: a failed
    /// guard is an `InvalidTransition` error.
    ///
    /// The guard re-check is what makes check-then-apply race-free when the
    /// caller holds the aggregate lock: the precondition is evaluated against
    /// the state at lock-acquisition time, not request-arrival time.
    pub fn apply(
        &self,
        entity: &mut E,
        name: &str,
        scratch: &mut X,
        ctx: &TransitionContext,
    ) -> EngineResult<()> {
        let def = self.table.guard(entity.state(), name)?;
        entity.set_state(def.to);
        if let Some(effects) = self.effects.get(name) {
            for effect in effects {
                effect(entity, scratch, ctx)?;
            }
        }
        Ok(())
    }
}
