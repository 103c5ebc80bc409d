//! Buffer for received operations that are not yet causally ready.
//!
//! Delivery order is not guaranteed, so an operation can arrive before its
//! predecessors. Such ops wait here; after every admission the replica drains
//! the lobby to a fixed point, so a single late predecessor can release an
//! arbitrarily long parked chain.

use std::collections::HashMap;

use tracing::trace;

use crate::graph::OpGraph;
use crate::op::{Op, OpId};

/// Parked operations keyed by id.
#[derive(Debug, Clone)]
pub struct Lobby<V> {
    parked: HashMap<OpId, Op<V>>,
}

impl<V> Lobby<V> {
    /// An empty lobby.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parked: HashMap::new(),
        }
    }

    /// Park an operation until its predecessors arrive. Re-parking the same
    /// id keeps the original entry.
    pub fn park(&mut self, op: Op<V>) {
        self.parked.entry(op.id.clone()).or_insert(op);
    }

    /// Remove and return every parked op whose predecessors are now all
    /// applied, in ascending id order. Admitting the returned batch can make
    /// further parked ops ready, so callers loop until this comes back empty.
    #[must_use]
    pub fn take_ready(&mut self, graph: &OpGraph<V>) -> Vec<Op<V>> {
        let mut ready_ids: Vec<OpId> = self
            .parked
            .values()
            .filter(|op| graph.is_ready(op))
            .map(|op| op.id.clone())
            .collect();
        ready_ids.sort();

        let mut ready = Vec::with_capacity(ready_ids.len());
        for id in ready_ids {
            if let Some(op) = self.parked.remove(&id) {
                trace!(op = %op.id, "released from lobby");
                ready.push(op);
            }
        }
        ready
    }

    /// `true` if `id` is parked.
    #[must_use]
    pub fn contains(&self, id: &OpId) -> bool {
        self.parked.contains_key(id)
    }

    /// Number of parked operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parked.len()
    }

    /// `true` when nothing is parked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parked.is_empty()
    }
}

impl<V> Default for Lobby<V> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
