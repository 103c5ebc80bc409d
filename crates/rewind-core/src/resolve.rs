//! Resolution of the visible register state from the head set.
//!
//! The register's value list is a pure function of the applied operation
//! set: walk from every head down to the terminal `Set` operations it
//! reveals, then order the terminals globally.
//!
//! # Walk
//!
//! Each head is traversed breadth-first. A `Set` node is emitted as a
//! result. A `Restore` node reverts its anchor, which means "show the state
//! that existed just before the anchor", so the walk continues at the
//! *anchor's* predecessors, not the restore's own. A restore whose anchor
//! has no predecessors contributes nothing; undoing the very first write
//! correctly empties the register.
//!
//! Every result carries the id trace of the walk that produced it and the
//! traversal depth. The concatenated results are sorted by trace, descending
//! under [`compare_traces`], with a stable sort: the path through the
//! greatest ids wins the front of the list. Duplicates are kept; two walks
//! converging on the same terminal emit it twice by design.
//!
//! # Trace comparison
//!
//! [`compare_traces`] compares element-wise over the shared prefix only and
//! calls traces with an equal shared prefix equal. This is deliberately
//! coarser than full lexicographic comparison: cached resolutions splice in
//! entries whose traces are truncated at the restore they were memoised for,
//! and the coarse rule keeps truncated and full traces mutually ordered the
//! same way.

use std::cmp::Ordering;
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::cache::{CachedResolution, ResolutionCache};
use crate::error::HistoryError;
use crate::graph::OpGraph;
use crate::op::{Op, OpId, OpKind};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// How a terminal was reached from a head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionMeta {
    /// Ids visited from the head to the terminal, head first. Truncated at a
    /// restore when the tail came from the cache.
    pub trace: Vec<OpId>,
    /// Number of operations visited on the path, including head and
    /// terminal. Unaffected by cache truncation.
    pub depth: usize,
}

/// One resolved terminal together with its walk metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Id of the terminal `Set` operation.
    pub terminal: OpId,
    pub meta: ResolutionMeta,
}

// ---------------------------------------------------------------------------
// Trace comparator
// ---------------------------------------------------------------------------

/// Compare two id traces element-wise over their shared prefix.
///
/// The first unequal position decides. Traces whose shared prefix is fully
/// equal compare equal even when their lengths differ; with a stable sort
/// this leaves such entries in insertion order.
#[must_use]
pub fn compare_traces(a: &[OpId], b: &[OpId]) -> Ordering {
    for (left, right) in a.iter().zip(b.iter()) {
        match left.cmp(right) {
            Ordering::Equal => continue,
            unequal => return unequal,
        }
    }
    Ordering::Equal
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolve the current heads of `graph` to the ordered terminal list.
///
/// With a cache, restore nodes whose resolution is already memoised are
/// spliced instead of expanded, and a restore resolved as a head memoises
/// its own result for later walks.
///
/// # Errors
///
/// [`HistoryError`] when the walk meets an id that is not applied; the
/// replica's admission rules make this unreachable for well-formed input.
pub fn resolve<V>(
    graph: &OpGraph<V>,
    mut cache: Option<&mut ResolutionCache>,
) -> Result<Vec<Resolution>, HistoryError> {
    let mut results = Vec::new();
    for head in graph.heads() {
        results.extend(walk_head(graph, head, cache.as_deref_mut())?);
    }
    results.sort_by(|left, right| compare_traces(&right.meta.trace, &left.meta.trace));
    Ok(results)
}

/// Breadth-first walk from a single head, returning its results sorted in
/// descending trace order.
fn walk_head<V>(
    graph: &OpGraph<V>,
    head: &OpId,
    mut cache: Option<&mut ResolutionCache>,
) -> Result<Vec<Resolution>, HistoryError> {
    let mut results = Vec::new();
    let mut queue: VecDeque<(OpId, Vec<OpId>, usize)> = VecDeque::new();
    queue.push_back((head.clone(), Vec::new(), 0));

    while let Some((id, mut trace, depth)) = queue.pop_front() {
        let op = graph
            .get(&id)
            .ok_or_else(|| HistoryError::UnknownOp(id.clone()))?;
        trace.push(id.clone());
        let depth = depth + 1;

        match &op.kind {
            OpKind::Set { .. } => {
                results.push(Resolution {
                    terminal: id,
                    meta: ResolutionMeta { trace, depth },
                });
            }
            OpKind::Restore { anchor } => {
                if let Some(memoised) = cache.as_deref().and_then(|c| c.get(&id)) {
                    // Splice: trace ends at this restore, depth composes.
                    for entry in memoised {
                        results.push(Resolution {
                            terminal: entry.terminal.clone(),
                            meta: ResolutionMeta {
                                trace: trace.clone(),
                                depth: depth - 1 + entry.depth,
                            },
                        });
                    }
                    continue;
                }

                let anchor_op = graph.get(anchor).ok_or_else(|| HistoryError::DanglingAnchor {
                    restore: id.clone(),
                    anchor: anchor.clone(),
                })?;
                for pred in &anchor_op.preds {
                    queue.push_back((pred.clone(), trace.clone(), depth));
                }
            }
        }
    }

    results.sort_by(|left, right| compare_traces(&right.meta.trace, &left.meta.trace));

    if let Some(cache) = cache.as_deref_mut() {
        let head_is_restore = graph.get(head).is_some_and(Op::is_restore);
        if head_is_restore && !cache.contains(head) {
            let terminals = results
                .iter()
                .map(|r| CachedResolution {
                    terminal: r.terminal.clone(),
                    depth: r.meta.depth,
                })
                .collect();
            cache.insert(head.clone(), terminals);
        }
    }

    Ok(results)
}

// ---------------------------------------------------------------------------
// Restore-to-terminal walk
// ---------------------------------------------------------------------------

/// Follow a restore's anchor chain down to its terminal `Set`.
///
/// `anchor` is the anchor of the restore in question. Restores chain through
/// restores until a `Set` is reached; with the local stack discipline a redo
/// anchors a restore whose own anchor is a `Set`, so the chain is at most two
/// hops long in practice. The loop terminates regardless because every
/// anchor was applied strictly before the restore that names it.
///
/// # Errors
///
/// [`HistoryError::UnknownOp`] when the chain leaves the applied store,
/// which indicates a corrupt history.
pub fn resolve_terminal<'a, V>(
    graph: &'a OpGraph<V>,
    anchor: &OpId,
) -> Result<&'a Op<V>, HistoryError> {
    let mut current = graph
        .get(anchor)
        .ok_or_else(|| HistoryError::UnknownOp(anchor.clone()))?;
    loop {
        match &current.kind {
            OpKind::Set { .. } => return Ok(current),
            OpKind::Restore { anchor } => {
                current = graph
                    .get(anchor)
                    .ok_or_else(|| HistoryError::UnknownOp(anchor.clone()))?;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
