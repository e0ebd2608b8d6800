//! Observable Record
//!
//! An [`ObservableMap`] is a named-property container whose writes publish
//! to per-property channels. It is the scope type of the runtime: computed
//! getters evaluate against it, nested plain containers wrapped under it
//! point back to it, and the (external) rendering layer resolves bindings
//! against it by identity.
//!
//! # Wrapping
//!
//! Assigning a plain `List` or `Object` always produces a fresh wrapped
//! child whose `parent`/`scope` is this record; assigning an already
//! wrapped or non-plain value stores it as-is. Construction populates
//! properties silently, so building a record never emits notifications.
//!
//! # Identity
//!
//! Every record gets a monotonically assigned [`RecordId`]. The reactive
//! semantics never consult it; it exists so a collaborator holding a
//! [`Registry`](crate::registry::Registry) can resolve bindings by id.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::value::Value;

use super::computed::Computed;
use super::publisher::{Handle, Publisher};
use super::sequence::ObservableArray;
use super::tracker::DependencyTracker;
use super::Snapshot;

/// Counter for assigning record identities.
static RECORD_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Stable process-wide identity of one record.
///
/// Serializable so rendering layers can stamp it into visual-node
/// attributes and resolve the record back through a
/// [`Registry`](crate::registry::Registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RecordId(u64);

impl RecordId {
    fn next() -> Self {
        Self(RECORD_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// The payload published on a property channel.
#[derive(Debug, Clone)]
pub struct Change {
    pub new: Value,
    pub old: Value,
}

/// A named-property observable container.
///
/// Always lives behind an `Rc`; children hold weak back-references and
/// never keep the tree alive.
pub struct ObservableMap {
    id: RecordId,
    /// Self-reference for handing out `Rc`s from `&self` methods (wrap
    /// links, descriptor scopes). Set once by `Rc::new_cyclic`.
    weak_self: Weak<ObservableMap>,
    /// Non-owning link to the record that contained this one at wrap time.
    parent: Weak<ObservableMap>,
    /// Shared down the scope tree so nested computed evaluations all record
    /// into the same frame stack.
    tracker: Rc<DependencyTracker>,
    publisher: Publisher<Change>,
    properties: RefCell<IndexMap<String, Value>>,
    descriptors: RefCell<IndexMap<String, Computed>>,
}

impl ObservableMap {
    /// Build a record from a plain `Object` value.
    ///
    /// Nested plain containers are wrapped recursively; entries carrying a
    /// computed descriptor are installed as such. Initial population is
    /// silent.
    pub fn new(value: Value) -> Result<Rc<Self>> {
        match value {
            Value::Object(entries) => Ok(Self::from_object(entries, None)),
            other => Err(Error::NotAMap(other.type_name())),
        }
    }

    /// Build a top-level record directly from `(name, value)` pairs.
    pub fn from_entries<K, I>(entries: I) -> Rc<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut object = IndexMap::new();
        for (key, value) in entries {
            object.insert(key.into(), value);
        }
        Self::from_object(object, None)
    }

    pub(crate) fn from_object(
        entries: IndexMap<String, Value>,
        parent: Option<&Rc<ObservableMap>>,
    ) -> Rc<Self> {
        let map = Rc::new_cyclic(|weak_self| Self {
            id: RecordId::next(),
            weak_self: weak_self.clone(),
            parent: parent.map_or_else(Weak::new, Rc::downgrade),
            tracker: parent.map_or_else(
                || Rc::new(DependencyTracker::new()),
                |p| Rc::clone(&p.tracker),
            ),
            publisher: Publisher::new(),
            properties: RefCell::new(IndexMap::new()),
            descriptors: RefCell::new(IndexMap::new()),
        });
        debug!(id = map.id.raw(), entries = entries.len(), "record created");
        for (property, value) in entries {
            match value {
                Value::Computed(descriptor) => map.set_descriptor(&property, descriptor),
                value => {
                    map.store(&property, value, true);
                }
            }
        }
        map
    }

    /// The `Rc` this record lives behind.
    fn rc(&self) -> Rc<ObservableMap> {
        self.weak_self
            .upgrade()
            .expect("record is alive while a method runs on it")
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    /// The record that contained this one when it was wrapped, if it is
    /// still alive. Top-level records have no parent.
    pub fn parent(&self) -> Option<Rc<ObservableMap>> {
        self.parent.upgrade()
    }

    pub(crate) fn tracker(&self) -> &Rc<DependencyTracker> {
        &self.tracker
    }

    /// Read a property.
    ///
    /// Notes the read with the dependency tracker, then returns the
    /// descriptor's computed value if one is installed, the stored value
    /// otherwise, or `Null` when the property does not exist.
    pub fn get(&self, property: &str) -> Value {
        self.tracker.note_read(property);
        let descriptor = self.descriptors.borrow().get(property).cloned();
        if let Some(descriptor) = descriptor {
            return descriptor.compute(&self.rc());
        }
        self.properties
            .borrow()
            .get(property)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Write a property, publishing on its channel if the value changed by
    /// identity. Returns the (possibly wrapped) stored value.
    ///
    /// If a computed descriptor owns the property, the write goes through
    /// its setter path instead and fails with
    /// [`Error::ReadOnlyComputed`] when the descriptor has no setter.
    ///
    /// Assigning a [`Value::Computed`] installs the descriptor rather than
    /// storing a value; nothing lands in the property table and the call
    /// returns `Null`.
    pub fn set(&self, property: &str, value: Value) -> Result<Value> {
        self.assign(property, value, false)
    }

    /// Write a property without notifying subscribers, regardless of
    /// whether the value changed.
    pub fn set_silent(&self, property: &str, value: Value) -> Result<Value> {
        self.assign(property, value, true)
    }

    fn assign(&self, property: &str, value: Value, silent: bool) -> Result<Value> {
        let descriptor = self.descriptors.borrow().get(property).cloned();
        if let Some(descriptor) = descriptor {
            return descriptor.set(&self.rc(), value);
        }
        if let Value::Computed(descriptor) = value {
            // Descriptors never land in the property table, even when they
            // arrive through a plain assignment.
            self.set_descriptor(property, descriptor);
            return Ok(Value::Null);
        }
        Ok(self.store(property, value, silent))
    }

    /// Plain-property write path: wrap, store, publish unless silent or
    /// unchanged. Re-assigning an identical value is notification-free.
    fn store(&self, property: &str, value: Value, silent: bool) -> Value {
        let new = self.wrap(value);
        let old = {
            let mut properties = self.properties.borrow_mut();
            let old = properties.get(property).cloned();
            properties.insert(property.to_owned(), new.clone());
            old
        };
        let old = old.unwrap_or(Value::Null);
        if !new.same(&old) && !silent {
            trace!(id = self.id.raw(), property, "property changed");
            self.publisher.publish(
                property,
                &Change {
                    new: new.clone(),
                    old,
                },
            );
        }
        new
    }

    /// Install a computed descriptor for `property`, wiring it to this
    /// record. Overwrites any prior plain value or descriptor.
    pub fn set_descriptor(&self, property: &str, descriptor: Computed) {
        descriptor.install(&self.rc(), property);
        self.properties.borrow_mut().shift_remove(property);
        self.descriptors
            .borrow_mut()
            .insert(property.to_owned(), descriptor);
    }

    /// The descriptor installed for `property`, if any.
    pub fn descriptor(&self, property: &str) -> Option<Computed> {
        self.descriptors.borrow().get(property).cloned()
    }

    /// The live property mapping, without dependency tracking.
    ///
    /// Intended for serialization and introspection; reactive reads go
    /// through [`ObservableMap::get`].
    pub fn peek(&self) -> Ref<'_, IndexMap<String, Value>> {
        self.properties.borrow()
    }

    /// Subscribe to changes on one property channel.
    pub fn subscribe(&self, channel: &str, callback: impl Fn(&Change) + 'static) -> Handle<Change> {
        self.publisher.subscribe(channel, callback)
    }

    /// Publish directly on a property channel.
    ///
    /// Computed descriptors use this to make their own change observable;
    /// it is public for collaborators implementing the same pattern.
    pub fn publish(&self, channel: &str, change: &Change) {
        self.publisher.publish(channel, change);
    }

    /// Run `f` against this record and report which properties it read.
    ///
    /// This is the introspection surface a rendering layer uses to
    /// auto-subscribe a presentation binding to exactly the properties it
    /// rendered.
    pub fn detect<R>(&self, f: impl FnOnce(&Rc<ObservableMap>) -> R) -> (R, Vec<String>) {
        let scope = self.rc();
        self.tracker.detect(move || f(&scope))
    }

    /// Wrap a plain container into a fresh observable child of this record;
    /// anything else passes through unchanged.
    pub(crate) fn wrap(&self, value: Value) -> Value {
        match value {
            Value::List(items) => Value::Seq(ObservableArray::from_items(items, Some(&self.rc()))),
            Value::Object(entries) => Value::Map(Self::from_object(entries, Some(&self.rc()))),
            other => other,
        }
    }
}

impl Snapshot for ObservableMap {
    fn to_plain(&self) -> Value {
        Value::Object(
            self.peek()
                .iter()
                .map(|(key, value)| (key.clone(), value.to_plain()))
                .collect(),
        )
    }
}

impl fmt::Debug for ObservableMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableMap")
            .field("id", &self.id)
            .field("properties", &self.properties.borrow().len())
            .field("descriptors", &self.descriptors.borrow().len())
            .finish()
    }
}
