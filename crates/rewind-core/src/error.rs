//! Fatal engine errors.
//!
//! Only broken input streams surface as errors. Duplicate delivery, causal
//! deferral, and empty undo/redo/delete are all ordinary control flow and
//! never produce a [`HistoryError`].

use std::fmt;

use crate::op::OpId;

/// Unrecoverable violation of the history invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// Resolution expected an operation in the applied store and it was
    /// missing. Indicates a corrupt graph.
    UnknownOp(OpId),
    /// A restore became causally ready while its anchor was still not
    /// applied. The sender failed to include the anchor among the restore's
    /// transitive predecessors; the op is rejected without being applied.
    DanglingAnchor { restore: OpId, anchor: OpId },
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOp(id) => write!(f, "operation {id} is not in the applied store"),
            Self::DanglingAnchor { restore, anchor } => write!(
                f,
                "restore {restore} anchors {anchor}, which is not applied; \
                 the anchor must be causally prior to the restore"
            ),
        }
    }
}

impl std::error::Error for HistoryError {}
