//! Publisher
//!
//! The Publisher is the fundamental notification primitive: a mapping from
//! channel name to an ordered list of subscriber callbacks. Records use one
//! with property names as channels; sequences use one with the structural
//! event kinds `"add"` and `"remove"`.
//!
//! # Protocol
//!
//! 1. `subscribe` appends a callback to a channel and returns a [`Handle`]
//!    that can remove exactly that registration.
//!
//! 2. `publish` invokes every callback currently registered on the channel,
//!    in subscription order. Publishing to a channel nobody listens on is a
//!    no-op, never an error.
//!
//! 3. Callbacks may themselves subscribe, detach, or publish: the subscriber
//!    list is snapshotted before iteration, so a re-entrant mutation never
//!    invalidates an in-flight publish. A subscriber added during a publish
//!    is not invoked in that same pass.
//!
//! # Invariant
//!
//! A channel with zero subscribers is removed from the mapping. Detaching
//! the last subscriber prunes the entry, so the channel table never
//! accumulates dangling empty lists.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use tracing::trace;

/// Unique identifier for one subscription.
///
/// Uses an atomic counter so identifiers stay unique even if publishers are
/// created on more than one thread (each individual publisher is still
/// single-threaded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

type Callback<E> = Rc<dyn Fn(&E)>;

struct Subscription<E> {
    id: SubscriberId,
    callback: Callback<E>,
}

type ChannelTable<E> = RefCell<IndexMap<String, Vec<Subscription<E>>>>;

/// A named-channel subscribe/publish primitive, generic over the event
/// payload `E`.
pub struct Publisher<E> {
    channels: Rc<ChannelTable<E>>,
}

impl<E> Publisher<E> {
    pub fn new() -> Self {
        Self {
            channels: Rc::new(RefCell::new(IndexMap::new())),
        }
    }

    /// Append `callback` to `channel`'s subscriber list, creating the list
    /// if absent. The returned handle removes exactly this registration.
    pub fn subscribe(&self, channel: &str, callback: impl Fn(&E) + 'static) -> Handle<E> {
        let id = SubscriberId::new();
        self.channels
            .borrow_mut()
            .entry(channel.to_owned())
            .or_default()
            .push(Subscription {
                id,
                callback: Rc::new(callback),
            });
        Handle {
            channels: Rc::downgrade(&self.channels),
            channel: channel.to_owned(),
            id,
        }
    }

    /// Invoke every callback currently registered on `channel`, in
    /// subscription order. No-op if the channel has no subscribers.
    pub fn publish(&self, channel: &str, event: &E) {
        let callbacks: Vec<Callback<E>> = {
            let table = self.channels.borrow();
            match table.get(channel) {
                Some(subscriptions) => subscriptions
                    .iter()
                    .map(|s| Rc::clone(&s.callback))
                    .collect(),
                None => return,
            }
        };
        trace!(channel, subscribers = callbacks.len(), "publish");
        for callback in callbacks {
            callback(event);
        }
    }

    /// Number of subscribers currently registered on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .borrow()
            .get(channel)
            .map(|subscriptions| subscriptions.len())
            .unwrap_or(0)
    }

    /// Whether `channel` has an entry in the mapping at all.
    pub fn has_channel(&self, channel: &str) -> bool {
        self.channels.borrow().contains_key(channel)
    }
}

impl<E> Default for Publisher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Publisher<E> {
    fn clone(&self) -> Self {
        Self {
            channels: Rc::clone(&self.channels),
        }
    }
}

/// A detachable reference to one subscription.
///
/// Holds only a weak reference to the publisher's channel table, so a handle
/// outliving its publisher is harmless.
pub struct Handle<E> {
    channels: Weak<ChannelTable<E>>,
    channel: String,
    id: SubscriberId,
}

impl<E> Handle<E> {
    /// Remove the subscription this handle refers to.
    ///
    /// Prunes the channel entry if it is now empty. Detaching twice, or
    /// after the publisher is gone, is a safe no-op.
    pub fn detach(&self) {
        let Some(channels) = self.channels.upgrade() else {
            return;
        };
        let mut table = channels.borrow_mut();
        let Some(subscriptions) = table.get_mut(&self.channel) else {
            return;
        };
        subscriptions.retain(|s| s.id != self.id);
        if subscriptions.is_empty() {
            table.shift_remove(&self.channel);
        }
    }
}
