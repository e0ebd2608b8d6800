//! Observable Sequence
//!
//! An [`ObservableArray`] keeps parity with a conventional ordered-container
//! mutation surface (push/pop/shift/unshift/splice/reverse/sort) while
//! publishing one `"add"` or `"remove"` event per structural change.
//!
//! # Commit protocol
//!
//! Every mutation follows the same four steps:
//!
//! 1. snapshot the current order,
//! 2. perform the native mutation on the backing vector,
//! 3. diff snapshot against the new order ([`sequence_diff`]),
//! 4. flush: for each `add` op, wrap the raw value (recursively, under the
//!    sequence's owning scope) and install it at the op's index, then
//!    publish the events in the diff's forward order.
//!
//! Wrapping during flush rather than before the mutation means values
//! placed by the native mutation are replaced in place by their observable
//! counterparts, so subscribers always receive the wrapped value.
//!
//! # Scope
//!
//! A sequence created under a record wraps inserted plain containers as
//! children of that record, so an item pushed into a sequence belonging to
//! record `R` becomes a child scope of `R` rather than an orphan. The link
//! is weak; the sequence never keeps its owner alive.

use std::cell::{Ref, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::value::Value;

use super::diff::{sequence_diff, DiffOp, DiffStatus};
use super::publisher::{Handle, Publisher};
use super::record::ObservableMap;
use super::Snapshot;

/// Channel on which insertions are published.
pub const CHANNEL_ADD: &str = "add";
/// Channel on which removals are published.
pub const CHANNEL_REMOVE: &str = "remove";

/// The payload published on the `"add"` and `"remove"` channels.
#[derive(Debug, Clone)]
pub struct Splice {
    /// The wrapped inserted value, or the removed value.
    pub value: Value,
    /// Index stamp from the diff engine (see the diff module docs for the
    /// removal semantics).
    pub index: usize,
}

/// An ordered, index-addressable observable container.
pub struct ObservableArray {
    /// Owning record used when wrapping newly inserted plain elements.
    scope: Weak<ObservableMap>,
    publisher: Publisher<Splice>,
    items: RefCell<Vec<Value>>,
}

impl ObservableArray {
    /// Build a top-level sequence, wrapping each element.
    pub fn new(items: Vec<Value>) -> Rc<Self> {
        Self::from_items(items, None)
    }

    pub(crate) fn from_items(items: Vec<Value>, scope: Option<&Rc<ObservableMap>>) -> Rc<Self> {
        let seq = Rc::new(Self {
            scope: scope.map_or_else(Weak::new, Rc::downgrade),
            publisher: Publisher::new(),
            items: RefCell::new(Vec::new()),
        });
        let wrapped: Vec<Value> = items.into_iter().map(|item| seq.wrap(item)).collect();
        *seq.items.borrow_mut() = wrapped;
        seq
    }

    /// Wrap a plain container under the owning scope; anything else passes
    /// through unchanged.
    fn wrap(&self, value: Value) -> Value {
        let scope = self.scope.upgrade();
        match value {
            Value::List(items) => Value::Seq(ObservableArray::from_items(items, scope.as_ref())),
            Value::Object(entries) => {
                Value::Map(ObservableMap::from_object(entries, scope.as_ref()))
            }
            other => other,
        }
    }

    /// The owning record, if it is still alive.
    pub fn scope(&self) -> Option<Rc<ObservableMap>> {
        self.scope.upgrade()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// The element at `index`, if in bounds.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).cloned()
    }

    /// The live backing vector, without copying.
    pub fn peek(&self) -> Ref<'_, Vec<Value>> {
        self.items.borrow()
    }

    /// Subscribe to [`CHANNEL_ADD`] or [`CHANNEL_REMOVE`].
    pub fn subscribe(&self, channel: &str, callback: impl Fn(&Splice) + 'static) -> Handle<Splice> {
        self.publisher.subscribe(channel, callback)
    }

    /// Append one element.
    pub fn push(&self, value: Value) -> usize {
        self.extend([value])
    }

    /// Append several elements in a single commit: one diff, one event per
    /// element, in order.
    pub fn extend<I: IntoIterator<Item = Value>>(&self, values: I) -> usize {
        self.commit(|items| {
            items.extend(values);
            items.len()
        })
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        self.commit(|items| items.pop())
    }

    /// Prepend one element.
    pub fn unshift(&self, value: Value) -> usize {
        self.commit(|items| {
            items.insert(0, value);
            items.len()
        })
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Value> {
        self.commit(|items| {
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        })
    }

    /// Remove `delete_count` elements starting at `start` and insert
    /// `insert` in their place. Out-of-range bounds are clamped. Returns
    /// the removed elements.
    pub fn splice(&self, start: usize, delete_count: usize, insert: Vec<Value>) -> Vec<Value> {
        self.commit(|items| {
            let start = start.min(items.len());
            let end = start.saturating_add(delete_count).min(items.len());
            items.splice(start..end, insert).collect()
        })
    }

    /// Reverse the sequence in place.
    pub fn reverse(&self) {
        self.commit(|items| items.reverse());
    }

    /// Sort the sequence in place with the given comparator.
    pub fn sort_by(&self, compare: impl FnMut(&Value, &Value) -> Ordering) {
        self.commit(|items| items.sort_by(compare));
    }

    /// Remove the first element identical to `item`.
    ///
    /// Returns the removed element, or `None` when the item is absent
    /// (never an error).
    pub fn remove(&self, item: &Value) -> Option<Value> {
        let index = self
            .items
            .borrow()
            .iter()
            .position(|existing| existing.same(item));
        index.and_then(|index| self.splice(index, 1, Vec::new()).into_iter().next())
    }

    /// Snapshot, mutate, diff, flush.
    fn commit<R>(&self, mutate: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        let snapshot = self.items.borrow().clone();
        let ret = {
            let mut items = self.items.borrow_mut();
            mutate(&mut items)
        };
        let current = self.items.borrow().clone();
        let diff = sequence_diff(&snapshot, &current, Value::same);
        trace!(ops = diff.len(), len = current.len(), "sequence commit");
        self.flush(diff);
        ret
    }

    /// Wrap added values in place and publish the diff, in order.
    ///
    /// A subscriber may mutate this same sequence from inside a publish, so
    /// an op's index can be stale by the time the flush reaches it. The
    /// install is guarded: an out-of-range slot is skipped and the event is
    /// still published with the wrapped value.
    fn flush(&self, diff: Vec<DiffOp<Value>>) {
        for op in diff {
            match op.status {
                DiffStatus::Add => {
                    let wrapped = self.wrap(op.value);
                    if let Some(slot) = self.items.borrow_mut().get_mut(op.index) {
                        *slot = wrapped.clone();
                    }
                    self.publisher.publish(
                        CHANNEL_ADD,
                        &Splice {
                            value: wrapped,
                            index: op.index,
                        },
                    );
                }
                DiffStatus::Remove => {
                    self.publisher.publish(
                        CHANNEL_REMOVE,
                        &Splice {
                            value: op.value,
                            index: op.index,
                        },
                    );
                }
            }
        }
    }
}

impl Snapshot for ObservableArray {
    fn to_plain(&self) -> Value {
        Value::List(self.peek().iter().map(Value::to_plain).collect())
    }
}

impl fmt::Debug for ObservableArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableArray")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, PartialEq)]
    enum Event {
        Add(Value, usize),
        Remove(Value, usize),
    }

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|&n| Value::from(n)).collect()
    }

    /// Sequence of [1, 2, 3] with both channels logged.
    fn tracked() -> (Rc<ObservableArray>, Rc<RefCell<Vec<Event>>>) {
        let seq = ObservableArray::new(ints(&[1, 2, 3]));
        let log = Rc::new(RefCell::new(Vec::new()));

        let adds = log.clone();
        seq.subscribe(CHANNEL_ADD, move |splice| {
            adds.borrow_mut()
                .push(Event::Add(splice.value.clone(), splice.index));
        });
        let removes = log.clone();
        seq.subscribe(CHANNEL_REMOVE, move |splice| {
            removes
                .borrow_mut()
                .push(Event::Remove(splice.value.clone(), splice.index));
        });

        (seq, log)
    }

    fn drain(log: &Rc<RefCell<Vec<Event>>>) -> Vec<Event> {
        log.borrow_mut().drain(..).collect()
    }

    #[test]
    fn mutations_emit_the_native_event_script() {
        let (seq, log) = tracked();

        seq.extend(ints(&[4, 5]));
        assert_eq!(
            drain(&log),
            vec![
                Event::Add(Value::from(4), 3),
                Event::Add(Value::from(5), 4)
            ]
        );

        seq.pop();
        seq.pop();
        assert_eq!(
            drain(&log),
            vec![
                Event::Remove(Value::from(5), 4),
                Event::Remove(Value::from(4), 3)
            ]
        );

        seq.splice(0, 0, ints(&[-1, 0]));
        assert_eq!(
            drain(&log),
            vec![
                Event::Add(Value::from(-1), 0),
                Event::Add(Value::from(0), 1)
            ]
        );

        seq.shift();
        seq.shift();
        assert_eq!(
            drain(&log),
            vec![
                Event::Remove(Value::from(-1), 0),
                Event::Remove(Value::from(0), 0)
            ]
        );

        seq.reverse();
        assert_eq!(
            drain(&log),
            vec![
                Event::Remove(Value::from(1), 0),
                Event::Remove(Value::from(2), 0),
                Event::Add(Value::from(2), 1),
                Event::Add(Value::from(1), 2)
            ]
        );

        seq.sort_by(|a, b| a.as_i64().cmp(&b.as_i64()));
        assert_eq!(
            drain(&log),
            vec![
                Event::Remove(Value::from(3), 0),
                Event::Remove(Value::from(2), 0),
                Event::Add(Value::from(2), 1),
                Event::Add(Value::from(3), 2)
            ]
        );

        seq.splice(1, 2, Vec::new());
        seq.splice(1, 0, ints(&[2, 3]));
        assert_eq!(
            drain(&log),
            vec![
                Event::Remove(Value::from(2), 1),
                Event::Remove(Value::from(3), 1),
                Event::Add(Value::from(2), 1),
                Event::Add(Value::from(3), 2)
            ]
        );
    }

    #[test]
    fn push_and_unshift_single_elements() {
        let (seq, log) = tracked();

        seq.push(Value::from(4));
        seq.unshift(Value::from(0));
        assert_eq!(
            drain(&log),
            vec![
                Event::Add(Value::from(4), 3),
                Event::Add(Value::from(0), 0)
            ]
        );
        assert_eq!(seq.len(), 5);
    }

    #[test]
    fn splice_returns_the_removed_run() {
        let seq = ObservableArray::new(ints(&[1, 2, 3, 4]));
        let removed = seq.splice(1, 2, Vec::new());
        assert_eq!(removed, ints(&[2, 3]));
        assert_eq!(seq.to_plain(), Value::List(ints(&[1, 4])));
    }

    #[test]
    fn remove_by_identity() {
        let (seq, log) = tracked();

        let removed = seq.remove(&Value::from(2));
        assert_eq!(removed, Some(Value::from(2)));
        assert_eq!(drain(&log), vec![Event::Remove(Value::from(2), 1)]);

        assert_eq!(seq.remove(&Value::from(99)), None);
        assert!(drain(&log).is_empty());
    }

    #[test]
    fn pop_and_shift_on_empty_are_noops() {
        let seq = ObservableArray::new(Vec::new());
        assert_eq!(seq.pop(), None);
        assert_eq!(seq.shift(), None);
        assert!(seq.is_empty());
    }

    #[test]
    fn elements_are_wrapped_on_construction_and_insertion() {
        let seq = ObservableArray::new(vec![Value::from(serde_json::json!({ "name": "a" }))]);
        assert!(seq.get(0).unwrap().as_map().is_some());

        seq.push(Value::from(serde_json::json!([1, 2])));
        assert!(seq.get(1).unwrap().as_seq().is_some());
    }

    #[test]
    fn subscribers_receive_the_wrapped_value() {
        let seq = ObservableArray::new(Vec::new());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        seq.subscribe(CHANNEL_ADD, move |splice| {
            sink.borrow_mut().push(splice.value.clone());
        });

        seq.push(Value::from(serde_json::json!({ "name": "a" })));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].as_map().is_some());
        // the installed element and the published one are the same wrapper
        assert!(seen[0].same(&seq.get(0).unwrap()));
    }

    #[test]
    fn subscriber_may_shrink_the_sequence_mid_flush() {
        let seq = ObservableArray::new(ints(&[1]));
        let log = Rc::new(RefCell::new(Vec::new()));

        // the first add event triggers a pop while the extend is still
        // flushing its remaining ops
        let reentrant = seq.clone();
        let popped = Rc::new(std::cell::Cell::new(false));
        let adds = log.clone();
        seq.subscribe(CHANNEL_ADD, move |splice| {
            adds.borrow_mut()
                .push(Event::Add(splice.value.clone(), splice.index));
            if !popped.get() {
                popped.set(true);
                reentrant.pop();
            }
        });
        let removes = log.clone();
        seq.subscribe(CHANNEL_REMOVE, move |splice| {
            removes
                .borrow_mut()
                .push(Event::Remove(splice.value.clone(), splice.index));
        });

        seq.extend(ints(&[2, 3]));

        // the second add's slot is gone by the time the flush reaches it;
        // the event still fires and the backing vector stays consistent
        assert_eq!(
            log.borrow().as_slice(),
            &[
                Event::Add(Value::from(2), 1),
                Event::Remove(Value::from(3), 2),
                Event::Add(Value::from(3), 2)
            ]
        );
        assert_eq!(seq.to_plain(), Value::List(ints(&[1, 2])));
    }

    #[test]
    fn length_tracks_every_commit() {
        let seq = ObservableArray::new(ints(&[1]));
        assert_eq!(seq.len(), 1);
        seq.extend(ints(&[2, 3]));
        assert_eq!(seq.len(), 3);
        seq.splice(0, 2, ints(&[9]));
        assert_eq!(seq.len(), 2);
        seq.pop();
        seq.pop();
        assert_eq!(seq.len(), 0);
    }
}
