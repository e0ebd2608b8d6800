//! Weft Core
//!
//! This crate provides the reactive data model at the heart of the Weft
//! data-binding framework. It turns plain nested data (maps, sequences,
//! scalars) into observable containers whose mutations propagate
//! automatically to dependents.
//!
//! It implements:
//!
//! - Named-channel subscribe/publish primitives
//! - Observable records and sequences with recursive wrapping
//! - Computed properties with automatic dependency tracking
//! - A minimal-edit sequence diff producing ordered add/remove events
//!
//! Template compilation, rendering, and attribute binders live in separate
//! crates; they consume this core through the record/sequence surface and
//! the [`ObservableMap::detect`](reactive::ObservableMap::detect)
//! introspection hook.
//!
//! # Architecture
//!
//! - `value`: the dynamic plain-data model and identity semantics
//! - `reactive`: publishers, containers, computed properties, diffing
//! - `registry`: explicit id-to-record lookup for rendering collaborators
//! - `error`: the crate's error type
//!
//! # Example
//!
//! ```rust
//! use weft_core::{computed, ObservableMap, Value};
//!
//! let cart = ObservableMap::from_entries([
//!     ("price", Value::from(5)),
//!     ("count", Value::from(0)),
//!     (
//!         "amount",
//!         computed(|scope| {
//!             let price = scope.get("price").as_i64().unwrap_or(0);
//!             let count = scope.get("count").as_i64().unwrap_or(0);
//!             Value::from(price * count)
//!         })
//!         .into(),
//!     ),
//! ]);
//!
//! assert_eq!(cart.get("amount"), Value::from(0));
//!
//! cart.set("count", Value::from(2))?;
//! assert_eq!(cart.get("amount"), Value::from(10));
//! # Ok::<(), weft_core::Error>(())
//! ```

pub mod error;
pub mod reactive;
pub mod registry;
pub mod value;

pub use error::{Error, Result};
pub use reactive::{
    computed, computed_with_setter, sequence_diff, Change, Computed, DependencyTracker, DiffOp,
    DiffStatus, Handle, ObservableArray, ObservableMap, Publisher, RecordId, Snapshot, Splice,
    SubscriberId, CHANNEL_ADD, CHANNEL_REMOVE,
};
pub use registry::Registry;
pub use value::Value;
