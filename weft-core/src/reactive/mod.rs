//! Reactive Primitives
//!
//! This module implements the reactive data model: publishers, observable
//! containers, computed properties, dependency tracking, and the sequence
//! diff engine that turns arbitrary mutations into ordered structural
//! events.
//!
//! # Concepts
//!
//! ## Publisher
//!
//! The leaf primitive: named channels with ordered subscriber lists.
//! Records publish property changes on per-property channels; sequences
//! publish `"add"`/`"remove"` structural events.
//!
//! ## Observable containers
//!
//! An [`ObservableMap`] holds named properties, an [`ObservableArray`]
//! holds an ordered sequence. Both wrap nested plain containers
//! recursively, forming a scope tree with weak parent links.
//!
//! ## Computed properties
//!
//! A [`Computed`] descriptor derives a value from a getter. Dependencies
//! are detected, not declared: while the getter runs, every property read
//! is recorded by the [`DependencyTracker`], and the descriptor subscribes
//! to exactly the properties read during its last evaluation.
//!
//! # Update model
//!
//! Everything is synchronous and single-threaded: a write publishes inline
//! on the caller's stack, subscribers fire in subscription order, and
//! structural events fire in diff order. There is no batching, no deferred
//! flush, and no transactional grouping of writes.

mod computed;
mod diff;
mod publisher;
mod record;
mod sequence;
mod tracker;

pub use computed::{computed, computed_with_setter, Computed, Getter, Setter};
pub use diff::{sequence_diff, DiffOp, DiffStatus};
pub use publisher::{Handle, Publisher, SubscriberId};
pub use record::{Change, ObservableMap, RecordId};
pub use sequence::{ObservableArray, Splice, CHANNEL_ADD, CHANNEL_REMOVE};
pub use tracker::DependencyTracker;

use crate::value::Value;

/// Capability of producing a plain, fully unwrapped copy of a container's
/// current contents.
///
/// Implemented by both observable containers; combined with
/// [`Value::to_json`] this is the serialization surface of the runtime.
pub trait Snapshot {
    /// Recursively unwrap to plain `Object`/`List`/scalar values.
    fn to_plain(&self) -> Value;
}
