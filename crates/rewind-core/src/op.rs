//! Operation identity and the two operation shapes.
//!
//! Every mutation of the register is an [`Op`]: an [`OpId`] (a Lamport pair),
//! the set of operation ids that were heads when the op was created, and a
//! payload that is either a terminal [`OpKind::Set`] (a present value writes,
//! an absent value deletes) or an [`OpKind::Restore`] that reverts the effect
//! of an earlier operation.
//!
//! Undo and redo are *not* distinct kinds. Both emit a `Restore`; whether a
//! restore acts as an undo or a redo is derived entirely from whether its
//! anchor resolves to a `Set` or to another `Restore`.
//!
//! # Wire identity
//!
//! `OpId` has a stable text form `"<counter>@<actor>"`. The counter is the
//! base-10 digits before the *first* `@`; everything after it is the raw
//! actor identifier (which may itself contain `@`). [`OpId`] serialises as
//! this string and parsing it back is lossless.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// ActorId
// ---------------------------------------------------------------------------

/// Opaque identifier of a replica, stable for the lifetime of its history.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    /// View the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActorId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for ActorId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// OpId
// ---------------------------------------------------------------------------

/// Lamport timestamp identifying a single operation.
///
/// Totally ordered: counters compare first, equal counters break the tie
/// lexicographically on the actor. The derived `Ord` relies on field order,
/// so `counter` must stay the first field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpId {
    /// Monotonic per-actor counter, advanced by the replica clock.
    pub counter: u64,
    /// The authoring actor.
    pub actor: ActorId,
}

impl OpId {
    /// Build an id from a counter and anything convertible to an actor.
    #[must_use]
    pub fn new(counter: u64, actor: impl Into<ActorId>) -> Self {
        Self {
            counter,
            actor: actor.into(),
        }
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.counter, self.actor)
    }
}

/// Error returned when parsing an operation id from its text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOpIdError {
    /// No `@` separator between counter and actor.
    MissingSeparator(String),
    /// The counter part is not a base-10 unsigned integer.
    InvalidCounter(String),
    /// The actor part is empty.
    EmptyActor(String),
}

impl fmt::Display for ParseOpIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSeparator(raw) => {
                write!(f, "malformed op id '{raw}': expected '<counter>@<actor>'")
            }
            Self::InvalidCounter(raw) => {
                write!(f, "malformed op id '{raw}': counter is not a base-10 integer")
            }
            Self::EmptyActor(raw) => write!(f, "malformed op id '{raw}': actor is empty"),
        }
    }
}

impl std::error::Error for ParseOpIdError {}

impl FromStr for OpId {
    type Err = ParseOpIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((counter, actor)) = s.split_once('@') else {
            return Err(ParseOpIdError::MissingSeparator(s.to_string()));
        };
        let counter = counter
            .parse::<u64>()
            .map_err(|_| ParseOpIdError::InvalidCounter(s.to_string()))?;
        if actor.is_empty() {
            return Err(ParseOpIdError::EmptyActor(s.to_string()));
        }
        Ok(Self::new(counter, actor))
    }
}

impl Serialize for OpId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OpId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Op
// ---------------------------------------------------------------------------

/// The payload of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OpKind<V> {
    /// Terminal write. `Some` sets the register; `None` deletes it.
    Set { value: Option<V> },
    /// Revert the effect of `anchor`. The anchor may be a `Set` (the restore
    /// acts as an undo) or another `Restore` (it acts as a redo).
    Restore { anchor: OpId },
}

/// A single immutable operation in the history.
///
/// `preds` holds the ids that were heads of the authoring replica when the
/// operation was generated. It is empty only for an actor's very first
/// operation on an empty register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Op<V> {
    pub id: OpId,
    pub preds: BTreeSet<OpId>,
    #[serde(flatten)]
    pub kind: OpKind<V>,
}

impl<V> Op<V> {
    /// Build a terminal write (or delete, when `value` is `None`).
    #[must_use]
    pub fn set(id: OpId, preds: BTreeSet<OpId>, value: Option<V>) -> Self {
        Self {
            id,
            preds,
            kind: OpKind::Set { value },
        }
    }

    /// Build a restore anchored at `anchor`.
    #[must_use]
    pub fn restore(id: OpId, preds: BTreeSet<OpId>, anchor: OpId) -> Self {
        Self {
            id,
            preds,
            kind: OpKind::Restore { anchor },
        }
    }

    /// `true` for terminal writes (including deletes).
    #[must_use]
    pub fn is_set(&self) -> bool {
        matches!(self.kind, OpKind::Set { .. })
    }

    /// `true` for restores.
    #[must_use]
    pub fn is_restore(&self) -> bool {
        matches!(self.kind, OpKind::Restore { .. })
    }

    /// The written value, if this op is a `Set` with a present value.
    #[must_use]
    pub fn value(&self) -> Option<&V> {
        match &self.kind {
            OpKind::Set { value } => value.as_ref(),
            OpKind::Restore { .. } => None,
        }
    }

    /// The anchor, if this op is a `Restore`.
    #[must_use]
    pub fn anchor(&self) -> Option<&OpId> {
        match &self.kind {
            OpKind::Set { .. } => None,
            OpKind::Restore { anchor } => Some(anchor),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
