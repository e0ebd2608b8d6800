//! Computed Properties
//!
//! A computed property derives its value from a getter evaluated against
//! the owning record. Dependencies are never declared: every evaluation
//! runs under the record's [`DependencyTracker`](super::DependencyTracker),
//! and the descriptor re-subscribes to exactly the properties the getter
//! read this time. A getter that branches re-converges on the right
//! dependency set the next time it runs.
//!
//! # Protocol
//!
//! - **Read**: evaluate the getter under detection, reconcile the
//!   dependency set (keep common channels, detach stale ones, subscribe
//!   new ones), return the fresh value. Reads never touch the cache; there
//!   is no memoization between reads.
//!
//! - **Dependency changed**: the refresh callback recomputes and, if the
//!   value changed by identity, publishes on the owning property's own
//!   channel before updating the cache.
//!
//! - **Write**: only valid with a setter. The setter typically writes to
//!   other plain properties on the same scope, which cascades through the
//!   dependency graph; the descriptor then force-publishes its own change
//!   so it is observable synchronously, independent of that cascade.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::trace;

use crate::error::{Error, Result};
use crate::value::Value;

use super::publisher::Handle;
use super::record::{Change, ObservableMap};

/// Getter: derives the property's value from the owning scope.
pub type Getter = Rc<dyn Fn(&Rc<ObservableMap>) -> Value>;

/// Setter: receives the scope, the incoming value, and the previous cached
/// value, and is expected to write through to other properties.
pub type Setter = Rc<dyn Fn(&Rc<ObservableMap>, &Value, &Value)>;

struct Descriptor {
    getter: Getter,
    setter: Option<Setter>,
    /// Owning record; set at installation. Weak, the descriptor never
    /// keeps its scope alive.
    scope: RefCell<Weak<ObservableMap>>,
    property: RefCell<String>,
    /// Last value seen by the refresh/write paths. Reads do not update it.
    value: RefCell<Value>,
    /// Property names read during the most recent evaluation, in read order.
    deps: RefCell<Vec<String>>,
    /// Live subscription per dependency channel.
    handles: RefCell<IndexMap<String, Handle<Change>>>,
}

/// An installable computed-property descriptor.
///
/// Cheap to clone; clones share the same descriptor state.
#[derive(Clone)]
pub struct Computed {
    inner: Rc<Descriptor>,
}

/// Create a read-only computed property from a getter.
pub fn computed<G>(getter: G) -> Computed
where
    G: Fn(&Rc<ObservableMap>) -> Value + 'static,
{
    Computed::build(Rc::new(getter), None)
}

/// Create a writable computed property from a getter/setter pair.
pub fn computed_with_setter<G, S>(getter: G, setter: S) -> Computed
where
    G: Fn(&Rc<ObservableMap>) -> Value + 'static,
    S: Fn(&Rc<ObservableMap>, &Value, &Value) + 'static,
{
    Computed::build(Rc::new(getter), Some(Rc::new(setter)))
}

impl Computed {
    fn build(getter: Getter, setter: Option<Setter>) -> Self {
        Self {
            inner: Rc::new(Descriptor {
                getter,
                setter,
                scope: RefCell::new(Weak::new()),
                property: RefCell::new(String::new()),
                value: RefCell::new(Value::Null),
                deps: RefCell::new(Vec::new()),
                handles: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Wire the descriptor to its owning record and property name.
    pub(crate) fn install(&self, scope: &Rc<ObservableMap>, property: &str) {
        *self.inner.scope.borrow_mut() = Rc::downgrade(scope);
        *self.inner.property.borrow_mut() = property.to_owned();
    }

    /// The property name this descriptor is installed under.
    pub fn property(&self) -> String {
        self.inner.property.borrow().clone()
    }

    /// The dependency channels from the most recent evaluation.
    pub fn dependencies(&self) -> Vec<String> {
        self.inner.deps.borrow().clone()
    }

    /// Whether a write to this property can succeed.
    pub fn is_writable(&self) -> bool {
        self.inner.setter.is_some()
    }

    /// Evaluate the getter under dependency detection and reconcile the
    /// subscription set to what was actually read.
    pub(crate) fn compute(&self, scope: &Rc<ObservableMap>) -> Value {
        let getter = Rc::clone(&self.inner.getter);
        let getter_scope = Rc::clone(scope);
        let (value, deps) = scope.tracker().detect(move || getter(&getter_scope));
        self.replace_dependencies(scope, deps);
        value
    }

    /// Reconcile subscriptions with a fresh dependency set: channels in
    /// both sets keep their handle, dropped channels are detached, new
    /// channels are subscribed to the refresh callback.
    fn replace_dependencies(&self, scope: &Rc<ObservableMap>, new_deps: Vec<String>) {
        let old_deps = self.inner.deps.borrow().clone();
        {
            let mut handles = self.inner.handles.borrow_mut();

            for dep in &old_deps {
                if !new_deps.contains(dep) {
                    if let Some(handle) = handles.shift_remove(dep) {
                        trace!(property = %self.inner.property.borrow(), dep, "dependency dropped");
                        handle.detach();
                    }
                }
            }

            for dep in &new_deps {
                if handles.contains_key(dep) {
                    continue;
                }
                trace!(property = %self.inner.property.borrow(), dep, "dependency gained");
                let descriptor = self.clone();
                let refresh_scope = Rc::downgrade(scope);
                let handle = scope.subscribe(dep, move |_| {
                    if let Some(scope) = refresh_scope.upgrade() {
                        descriptor.refresh(&scope);
                    }
                });
                handles.insert(dep.clone(), handle);
            }
        }
        *self.inner.deps.borrow_mut() = new_deps;
    }

    /// Dependency-change path: recompute and, if the value changed by
    /// identity, publish on the owning property's channel, then cache.
    fn refresh(&self, scope: &Rc<ObservableMap>) {
        let new = self.compute(scope);
        let old = self.inner.value.borrow().clone();
        if !new.same(&old) {
            let property = self.inner.property.borrow().clone();
            trace!(property = %property, "computed value changed");
            scope.publish(
                &property,
                &Change {
                    new: new.clone(),
                    old,
                },
            );
            *self.inner.value.borrow_mut() = new;
        }
    }

    /// Write path. Fails when the descriptor has no setter.
    ///
    /// When the incoming value differs from the cache by identity: run the
    /// setter, then publish the descriptor's own change directly: the
    /// computed property's change must be observable synchronously, even
    /// before the dependency cascade the setter started has settled.
    pub(crate) fn set(&self, scope: &Rc<ObservableMap>, new: Value) -> Result<Value> {
        let Some(setter) = self.inner.setter.clone() else {
            return Err(Error::ReadOnlyComputed(self.inner.property.borrow().clone()));
        };
        let old = self.inner.value.borrow().clone();
        if !new.same(&old) {
            setter(scope, &new, &old);
            let property = self.inner.property.borrow().clone();
            scope.publish(
                &property,
                &Change {
                    new: new.clone(),
                    old,
                },
            );
            *self.inner.value.borrow_mut() = new.clone();
        }
        Ok(new)
    }
}

impl PartialEq for Computed {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("property", &*self.inner.property.borrow())
            .field("deps", &*self.inner.deps.borrow())
            .field("writable", &self.is_writable())
            .finish()
    }
}
