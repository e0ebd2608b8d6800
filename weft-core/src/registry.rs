//! Record Registry
//!
//! Rendering layers resolve bindings by record identity: a visual node
//! remembers the [`RecordId`] it was bound against and later needs the
//! record back. The reactive core itself never consults the registry (it
//! only mints identities), so the registry is an explicit object the
//! collaborator owns and passes by reference, not ambient global state.
//!
//! Entries hold weak references: registering a record never extends its
//! lifetime, and resolving a dropped record simply returns `None`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::reactive::{ObservableMap, RecordId};

/// An id-to-record lookup table with weak entries.
#[derive(Default)]
pub struct Registry {
    records: RefCell<HashMap<RecordId, Weak<ObservableMap>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record under its own identity.
    pub fn register(&self, record: &Rc<ObservableMap>) {
        self.records
            .borrow_mut()
            .insert(record.id(), Rc::downgrade(record));
    }

    /// Resolve an identity to a live record, if it still exists.
    pub fn resolve(&self, id: RecordId) -> Option<Rc<ObservableMap>> {
        self.records.borrow().get(&id).and_then(Weak::upgrade)
    }

    /// Remove one entry.
    pub fn unregister(&self, id: RecordId) {
        self.records.borrow_mut().remove(&id);
    }

    /// Drop entries whose records are gone.
    pub fn prune(&self) {
        self.records
            .borrow_mut()
            .retain(|_, record| record.upgrade().is_some());
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}
