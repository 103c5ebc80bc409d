//! Append-only store of applied operations.
//!
//! Operations are indexed by [`OpId`]; the id lookup is the only
//! edge-following primitive, so the history can share predecessors freely
//! without reference cycles. The store tracks the *head set*: applied
//! operations that no other applied operation lists as a predecessor. Heads
//! drive both resolution and the predecessor sets of new local operations.
//!
//! Duplicate inserts (same id) are silently skipped, which makes delivery
//! idempotent at the storage layer.

use std::collections::{BTreeSet, HashMap};

use crate::op::{Op, OpId};

/// Applied-operation store with head tracking.
#[derive(Debug, Clone)]
pub struct OpGraph<V> {
    applied: HashMap<OpId, Op<V>>,
    heads: BTreeSet<OpId>,
    last_op: Option<OpId>,
}

impl<V> OpGraph<V> {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            applied: HashMap::new(),
            heads: BTreeSet::new(),
            last_op: None,
        }
    }

    /// `true` when every predecessor of `op` is applied. Trivially true for
    /// an empty predecessor set.
    #[must_use]
    pub fn is_ready(&self, op: &Op<V>) -> bool {
        op.preds.iter().all(|pred| self.applied.contains_key(pred))
    }

    /// Insert an applied operation.
    ///
    /// The caller must have established causal readiness; the lobby holds
    /// anything that is not ready yet. Re-inserting an already-applied id is
    /// a no-op. The op's predecessors leave the head set and the op joins it.
    pub fn insert(&mut self, op: Op<V>) {
        if self.applied.contains_key(&op.id) {
            return;
        }
        debug_assert!(self.is_ready(&op), "insert requires applied predecessors");

        for pred in &op.preds {
            self.heads.remove(pred);
        }
        self.heads.insert(op.id.clone());

        if self.last_op.as_ref().is_none_or(|last| op.id > *last) {
            self.last_op = Some(op.id.clone());
        }

        self.applied.insert(op.id.clone(), op);
    }

    /// Look up an applied operation.
    #[must_use]
    pub fn get(&self, id: &OpId) -> Option<&Op<V>> {
        self.applied.get(id)
    }

    /// `true` if `id` has been applied.
    #[must_use]
    pub fn contains(&self, id: &OpId) -> bool {
        self.applied.contains_key(id)
    }

    /// The current head set, in ascending id order.
    #[must_use]
    pub fn heads(&self) -> &BTreeSet<OpId> {
        &self.heads
    }

    /// The greatest applied op id, if any.
    #[must_use]
    pub fn last_op(&self) -> Option<&OpId> {
        self.last_op.as_ref()
    }

    /// Number of applied operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.applied.len()
    }

    /// `true` when nothing has been applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

impl<V> Default for OpGraph<V> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
