//! Subscriber Registry
//!
//! Every store owns one registry: the set of change-notification callbacks
//! that are told about each committed write.
//!
//! # Identity
//!
//! A callback is identified by its allocation, not by its behaviour. Two
//! clones of the same `Callback` Arc are the same subscriber; two separately
//! boxed closures with identical bodies are two subscribers. Registering the
//! same subscriber twice leaves a single entry.
//!
//! # Fan-out
//!
//! Notification copies the live callbacks out of the registry and releases
//! the lock before invoking them. Callbacks are free to read the store, write
//! to it, subscribe, or unsubscribe while the fan-out is running.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;

/// A change-notification callback.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Wrap a closure as a [`Callback`].
///
/// Keep the returned Arc around if you intend to register it more than once;
/// its allocation is what makes it the "same" callback.
pub fn callback<F>(f: F) -> Callback
where
    F: Fn() + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Token for one live registration in a [`SubscriberRegistry`].
///
/// Adding a callback that is already present hands back the token of the
/// existing entry. An [`Unsubscribe`] handle carries the token it was issued
/// and removes the entry only while the tokens still match, so a handle that
/// outlived its registration cannot remove a later one for the same callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// The identity under which a callback is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackKey(usize);

impl CallbackKey {
    /// Key a callback by the address of its allocation.
    pub fn of(callback: &Callback) -> Self {
        Self(Arc::as_ptr(callback).cast::<()>() as usize)
    }

    /// Key supplied by the caller, for callables whose identity lives
    /// outside Rust (for example a foreign object pointer).
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }
}

struct Entry {
    id: SubscriberId,
    callback: Callback,
}

type Entries = Mutex<IndexMap<CallbackKey, Entry>>;

/// The set of callbacks attached to one store.
pub struct SubscriberRegistry {
    entries: Arc<Entries>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(IndexMap::new())),
        }
    }

    /// Register a callback keyed by its own allocation.
    pub fn add(&self, callback: &Callback) -> Unsubscribe {
        self.add_keyed(CallbackKey::of(callback), Arc::clone(callback))
    }

    /// Register a callback under an explicit key.
    ///
    /// If the key is already present the existing registration is kept and
    /// the returned handle refers to it.
    pub fn add_keyed(&self, key: CallbackKey, callback: Callback) -> Unsubscribe {
        let id = {
            let mut entries = self.entries.lock();
            entries
                .entry(key)
                .or_insert_with(|| Entry {
                    id: SubscriberId::next(),
                    callback,
                })
                .id
        };

        Unsubscribe {
            target: Some((Arc::downgrade(&self.entries), key, id)),
            done: AtomicBool::new(false),
        }
    }

    /// Whether a callback is currently registered.
    pub fn contains(&self, callback: &Callback) -> bool {
        self.entries.lock().contains_key(&CallbackKey::of(callback))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Invoke every callback registered at the moment this call starts.
    ///
    /// Returns the number of callbacks invoked.
    pub fn notify_all(&self) -> usize {
        let callbacks: SmallVec<[Callback; 8]> = self
            .entries
            .lock()
            .values()
            .map(|entry| Arc::clone(&entry.callback))
            .collect();

        for callback in &callbacks {
            callback();
        }

        callbacks.len()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("len", &self.len())
            .finish()
    }
}

/// Handle returned by a registration.
///
/// Calling [`Unsubscribe::unsubscribe`] removes exactly the registration that
/// produced this handle. Later calls do nothing, and a handle never removes a
/// newer registration of the same callback. Dropping the handle does NOT
/// unsubscribe.
pub struct Unsubscribe {
    target: Option<(Weak<Entries>, CallbackKey, SubscriberId)>,
    done: AtomicBool,
}

impl Unsubscribe {
    /// A handle with nothing to remove.
    pub fn noop() -> Self {
        Self {
            target: None,
            done: AtomicBool::new(true),
        }
    }

    /// Remove the registration. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }

        let Some((entries, key, id)) = &self.target else {
            return;
        };

        // The store may already be gone.
        let Some(entries) = entries.upgrade() else {
            return;
        };

        let mut entries = entries.lock();
        if entries.get(key).is_some_and(|entry| entry.id == *id) {
            entries.shift_remove(key);
        }
    }

    /// Whether this handle has already been used (or never had a target).
    pub fn is_spent(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// The registration this handle removes, if any.
    pub fn subscriber_id(&self) -> Option<SubscriberId> {
        self.target.as_ref().map(|(_, _, id)| *id)
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("subscriber_id", &self.subscriber_id())
            .field("spent", &self.is_spent())
            .finish()
    }
}
