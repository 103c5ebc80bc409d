//! Per-replica Lamport clock.
//!
//! The clock never advances on its own. [`LamportClock::next_id`] is a pure
//! peek at the id a new local operation would get; the counter moves only
//! through [`LamportClock::observe`], which the replica calls with every
//! applied operation's counter (local ones included). A freshly generated id
//! therefore always exceeds the counter of every operation applied before it.

use serde::{Deserialize, Serialize};

use crate::op::{ActorId, OpId};

/// Monotonic `(counter, actor)` clock for one replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LamportClock {
    counter: u64,
    actor: ActorId,
}

impl LamportClock {
    /// A clock at zero for the given actor.
    #[must_use]
    pub fn new(actor: impl Into<ActorId>) -> Self {
        Self {
            counter: 0,
            actor: actor.into(),
        }
    }

    /// The id the next local operation would carry. Does not advance the
    /// counter; the replica advances it by observing the op once applied.
    #[must_use]
    pub fn next_id(&self) -> OpId {
        OpId {
            counter: self.counter + 1,
            actor: self.actor.clone(),
        }
    }

    /// Merge a counter seen on an applied operation (max semantics).
    pub fn observe(&mut self, counter: u64) {
        self.counter = self.counter.max(counter);
    }

    /// Current counter value.
    #[must_use]
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// The actor this clock stamps ids for.
    #[must_use]
    pub fn actor(&self) -> &ActorId {
        &self.actor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let clock = LamportClock::new("a");
        assert_eq!(clock.counter(), 0);
        assert_eq!(clock.next_id(), OpId::new(1, "a"));
    }

    #[test]
    fn next_id_does_not_advance() {
        let clock = LamportClock::new("a");
        assert_eq!(clock.next_id(), clock.next_id());
        assert_eq!(clock.counter(), 0);
    }

    #[test]
    fn observe_takes_max() {
        let mut clock = LamportClock::new("a");
        clock.observe(4);
        assert_eq!(clock.counter(), 4);
        clock.observe(2);
        assert_eq!(clock.counter(), 4);
        clock.observe(9);
        assert_eq!(clock.counter(), 9);
        assert_eq!(clock.next_id(), OpId::new(10, "a"));
    }

    #[test]
    fn observing_own_ids_produces_a_monotone_sequence() {
        let mut clock = LamportClock::new("a");
        let first = clock.next_id();
        clock.observe(first.counter);
        let second = clock.next_id();
        clock.observe(second.counter);
        assert!(second > first);
        assert_eq!(second, OpId::new(2, "a"));
    }

    #[test]
    fn remote_counters_push_local_ids_past_them() {
        let mut clock = LamportClock::new("a");
        clock.observe(7); // a remote op's counter
        assert_eq!(clock.next_id(), OpId::new(8, "a"));
    }
}
