//! The replica facade: op generation, application, and the local undo/redo
//! stacks.
//!
//! A replica owns one actor identity and consumes a stream of operations.
//! Locally generated ops (from [`Replica::set`], [`Replica::delete`],
//! [`Replica::undo`], [`Replica::redo`]) and received ops (through
//! [`Replica::apply`]) take the same admission path; only their provenance
//! differs. Admission is synchronous and runs to completion: check
//! readiness, insert into the graph, advance the clock, re-resolve the
//! register, then drain the lobby to a fixed point.
//!
//! # Undo locality
//!
//! The undo and redo stacks hold only operations this actor authored.
//! Remote writes interleave freely with local ones in the graph, but they
//! never enter the stacks, so an actor can only ever revert its own edits.
//! `undo` pops the newest own terminal write and emits a restore anchored at
//! it; `redo` pops the newest own undo and emits a restore anchored at
//! *that*. After a redo, the restore is resolved down to its terminal write
//! and that terminal goes back onto the undo stack, so the next undo reverts
//! the value the redo just brought back. Any new local write clears the redo
//! stack.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::cache::ResolutionCache;
use crate::clock::LamportClock;
use crate::error::HistoryError;
use crate::graph::OpGraph;
use crate::lobby::Lobby;
use crate::op::{ActorId, Op, OpId, OpKind};
use crate::resolve::{resolve, resolve_terminal, ResolutionMeta};

/// A single replica of the register.
#[derive(Debug, Clone)]
pub struct Replica<V> {
    clock: LamportClock,
    graph: OpGraph<V>,
    lobby: Lobby<V>,
    undo_stack: Vec<Op<V>>,
    redo_stack: Vec<Op<V>>,
    terminal_heads: Vec<(Op<V>, ResolutionMeta)>,
    values: Vec<V>,
    cache: Option<ResolutionCache>,
}

impl<V: Clone> Replica<V> {
    /// A fresh replica for `actor` with no history.
    #[must_use]
    pub fn new(actor: impl Into<ActorId>) -> Self {
        Self {
            clock: LamportClock::new(actor),
            graph: OpGraph::new(),
            lobby: Lobby::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            terminal_heads: Vec::new(),
            values: Vec::new(),
            cache: None,
        }
    }

    /// Like [`Replica::new`], with restore resolutions memoised.
    #[must_use]
    pub fn with_cache(actor: impl Into<ActorId>) -> Self {
        let mut replica = Self::new(actor);
        replica.cache = Some(ResolutionCache::new());
        replica
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// This replica's actor identity.
    #[must_use]
    pub fn actor(&self) -> &ActorId {
        self.clock.actor()
    }

    /// The register's current ordered values.
    #[must_use]
    pub fn get(&self) -> &[V] {
        &self.values
    }

    /// The resolved terminal writes behind [`Replica::get`], with their walk
    /// metadata, in the same order.
    #[must_use]
    pub fn terminal_heads(&self) -> &[(Op<V>, ResolutionMeta)] {
        &self.terminal_heads
    }

    /// Snapshot of the undo stack: this actor's own terminal writes, oldest
    /// first.
    #[must_use]
    pub fn undo_stack(&self) -> &[Op<V>] {
        &self.undo_stack
    }

    /// Snapshot of the redo stack: this actor's own undo restores, oldest
    /// first.
    #[must_use]
    pub fn redo_stack(&self) -> &[Op<V>] {
        &self.redo_stack
    }

    /// Current heads of the applied graph.
    #[must_use]
    pub fn heads(&self) -> &BTreeSet<OpId> {
        self.graph.heads()
    }

    /// Greatest applied op id, if anything has been applied.
    #[must_use]
    pub fn last_op(&self) -> Option<&OpId> {
        self.graph.last_op()
    }

    /// Number of applied operations.
    #[must_use]
    pub fn applied_len(&self) -> usize {
        self.graph.len()
    }

    /// Number of received ops still waiting for predecessors.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.lobby.len()
    }

    /// The resolution cache, when this replica was created with one.
    #[must_use]
    pub fn resolution_cache(&self) -> Option<&ResolutionCache> {
        self.cache.as_ref()
    }

    // -----------------------------------------------------------------------
    // Application
    // -----------------------------------------------------------------------

    /// Apply a batch of operations, skipping empty entries.
    ///
    /// Already-applied ids are ignored, ops with missing predecessors wait in
    /// the lobby, and each admission re-resolves the register and releases
    /// any newly-ready parked ops. Delivery order does not affect the final
    /// state.
    ///
    /// # Errors
    ///
    /// [`HistoryError::DanglingAnchor`] when a causally-ready restore names
    /// an anchor that is not applied (a malformed stream). Only the offending
    /// op is dropped: every other op in the batch is still processed, and the
    /// first error is returned once the whole batch has been worked through.
    pub fn apply<I>(&mut self, ops: I) -> Result<(), HistoryError>
    where
        I: IntoIterator<Item = Option<Op<V>>>,
    {
        let mut first_error = None;
        for op in ops.into_iter().flatten() {
            if let Err(err) = self.ingest(op) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    fn ingest(&mut self, op: Op<V>) -> Result<(), HistoryError> {
        if self.graph.contains(&op.id) {
            trace!(op = %op.id, "duplicate delivery ignored");
            return Ok(());
        }
        if !self.graph.is_ready(&op) {
            trace!(op = %op.id, "parked until predecessors arrive");
            self.lobby.park(op);
            return Ok(());
        }
        self.admit(op)?;
        self.drain_lobby()
    }

    /// Admit newly-ready parked ops until none are left. A malformed op in a
    /// ready batch is dropped and remembered; its siblings are admitted
    /// regardless, so one bad peer cannot starve well-formed ops.
    fn drain_lobby(&mut self) -> Result<(), HistoryError> {
        let mut first_error = None;
        loop {
            let ready = self.lobby.take_ready(&self.graph);
            if ready.is_empty() {
                break;
            }
            for op in ready {
                if let Err(err) = self.admit(op) {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Insert one causally-ready op and refresh the register.
    fn admit(&mut self, op: Op<V>) -> Result<(), HistoryError> {
        if let OpKind::Restore { anchor } = &op.kind {
            if !self.graph.contains(anchor) {
                return Err(HistoryError::DanglingAnchor {
                    restore: op.id.clone(),
                    anchor: anchor.clone(),
                });
            }
        }

        let id = op.id.clone();
        self.clock.observe(id.counter);
        self.graph.insert(op);

        let resolved = resolve(&self.graph, self.cache.as_mut())?;
        let mut terminal_heads = Vec::with_capacity(resolved.len());
        let mut values = Vec::new();
        for entry in resolved {
            let terminal = self
                .graph
                .get(&entry.terminal)
                .cloned()
                .ok_or_else(|| HistoryError::UnknownOp(entry.terminal.clone()))?;
            if let Some(value) = terminal.value() {
                values.push(value.clone());
            }
            terminal_heads.push((terminal, entry.meta));
        }
        self.terminal_heads = terminal_heads;
        self.values = values;

        debug!(op = %id, heads = self.graph.heads().len(), "admitted");
        Ok(())
    }

    /// Admission of a locally generated op cannot fail: its predecessors are
    /// the current heads and its anchor (if any) is applied.
    fn apply_local(&mut self, op: Op<V>) {
        if let Err(err) = self.ingest(op) {
            panic!("locally generated operation failed to apply: {err}");
        }
    }

    // -----------------------------------------------------------------------
    // Local mutation
    // -----------------------------------------------------------------------

    /// Write a value. Returns the generated op for broadcast.
    pub fn set(&mut self, value: V) -> Op<V> {
        let op = Op::set(
            self.clock.next_id(),
            self.graph.heads().clone(),
            Some(value),
        );
        self.undo_stack.push(op.clone());
        self.redo_stack.clear();
        self.apply_local(op.clone());
        op
    }

    /// Delete the register's value. Returns `None` (and generates nothing)
    /// when the register is already empty.
    pub fn delete(&mut self) -> Option<Op<V>> {
        if self.values.is_empty() {
            return None;
        }
        let op = Op::set(self.clock.next_id(), self.graph.heads().clone(), None);
        self.undo_stack.push(op.clone());
        self.redo_stack.clear();
        self.apply_local(op.clone());
        Some(op)
    }

    /// Revert this actor's newest unreverted write. Returns `None` when
    /// there is nothing of this actor's to undo.
    pub fn undo(&mut self) -> Option<Op<V>> {
        let anchor = self.undo_stack.pop()?;
        let op = Op::restore(self.clock.next_id(), self.graph.heads().clone(), anchor.id);
        self.redo_stack.push(op.clone());
        self.apply_local(op.clone());
        Some(op)
    }

    /// Revert this actor's newest undo. Returns `None` when there is no undo
    /// to revert.
    pub fn redo(&mut self) -> Option<Op<V>> {
        let anchor = self.redo_stack.pop()?;

        // The next undo must revert the value this redo brings back, so the
        // restore's terminal write goes onto the undo stack, not the restore.
        let terminal = match resolve_terminal(&self.graph, &anchor.id) {
            Ok(terminal) => terminal.clone(),
            Err(err) => panic!("redo anchor failed to resolve: {err}"),
        };

        let op = Op::restore(self.clock.next_id(), self.graph.heads().clone(), anchor.id);
        self.undo_stack.push(terminal);
        self.apply_local(op.clone());
        Some(op)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
