#![forbid(unsafe_code)]
//! Replicated single-value register with per-actor undo and redo.
//!
//! Replicas edit independently and exchange immutable operations in any
//! order; every replica that has applied the same operation set shows the
//! same value list. Concurrent writes are all kept (multi-value register
//! semantics) rather than arbitrated away, and each actor keeps a coherent
//! undo/redo history over its *own* edits without breaking convergence.
//!
//! The engine is a pure in-memory library. Transport and persistence live
//! outside: [`Replica::set`], [`Replica::delete`], [`Replica::undo`] and
//! [`Replica::redo`] hand back the generated [`Op`] for broadcast, and
//! received ops go into [`Replica::apply`].
//!
//! ```
//! use rewind_core::Replica;
//!
//! let mut alice = Replica::new("alice");
//! let mut bob = Replica::new("bob");
//!
//! let a1 = alice.set("draft");
//! bob.apply([Some(a1)]).unwrap();
//! let b1 = bob.set("edited");
//! alice.apply([Some(b1)]).unwrap();
//! assert_eq!(alice.get(), ["edited"]);
//!
//! // Undo is local: alice reverts her own write, not bob's.
//! let undo = alice.undo().unwrap();
//! bob.apply([Some(undo)]).unwrap();
//! assert_eq!(alice.get(), bob.get());
//! ```

pub mod cache;
pub mod clock;
pub mod error;
pub mod graph;
pub mod lobby;
pub mod op;
pub mod replica;
pub mod resolve;

pub use cache::ResolutionCache;
pub use error::HistoryError;
pub use op::{ActorId, Op, OpId, OpKind, ParseOpIdError};
pub use replica::Replica;
pub use resolve::{compare_traces, Resolution, ResolutionMeta};
