//! Store Implementation
//!
//! A Store holds exactly one current value and the registry of callbacks
//! interested in it.
//!
//! # How Writes Work
//!
//! 1. `set` copies the current snapshot and merges the patch into the copy.
//!
//! 2. The copy is committed with a single pointer swap. The previous snapshot
//!    is never touched, so anyone holding it keeps a consistent old value.
//!
//! 3. Every callback registered when the fan-out starts is invoked once,
//!    synchronously, before `set` returns.
//!
//! # Detached Stores
//!
//! A detached store stands in when no provider scope is active. It always
//! reports the factory's initial value, silently discards writes and keeps
//! no subscribers.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use super::merge::ShallowMerge;
use super::subscriber::{callback, Callback, CallbackKey, SubscriberRegistry, Unsubscribe};

/// Unique identifier for a store instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(u64);

impl StoreId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store#{}", self.0)
    }
}

/// A shared mutable container written through shallow merges.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use pubsub_core::Store;
///
/// let store = Store::new(HashMap::from([("peter_pan", 10)]));
/// store.set(HashMap::from([("tinker_bell", 20)]));
///
/// assert_eq!(store.get()["peter_pan"], 10);
/// assert_eq!(store.get()["tinker_bell"], 20);
/// ```
pub struct Store<T: ShallowMerge> {
    id: StoreId,

    /// The current snapshot. Replaced wholesale on every write.
    value: RwLock<Arc<T>>,

    registry: SubscriberRegistry,

    /// Number of committed writes.
    version: AtomicU64,

    detached: bool,
}

impl<T: ShallowMerge> Store<T> {
    /// Create a store holding `value`.
    pub fn new(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Create a store whose first snapshot is `value`.
    pub fn from_arc(value: Arc<T>) -> Self {
        Self {
            id: StoreId::next(),
            value: RwLock::new(value),
            registry: SubscriberRegistry::new(),
            version: AtomicU64::new(0),
            detached: false,
        }
    }

    /// Create a detached store: `get` always returns `value`, `set` is a
    /// no-op and `subscribe` registers nothing.
    pub fn detached(value: Arc<T>) -> Self {
        Self {
            detached: true,
            ..Self::from_arc(value)
        }
    }

    pub fn id(&self) -> StoreId {
        self.id
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Get the current snapshot.
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&self.value.read())
    }

    /// Run `f` against the current value without taking a snapshot.
    ///
    /// `f` must not write to this store.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let guard = self.value.read();
        f(&guard)
    }

    /// Merge `patch` into the current value, commit, and notify subscribers.
    pub fn set(&self, patch: T::Patch) {
        self.commit(|_| patch);
    }

    /// Compute a patch from the current value and apply it.
    ///
    /// Use this to grow or shrink a field that the merge would otherwise
    /// replace wholesale, such as a list. `f` runs under the write lock, so
    /// concurrent updates never lose each other's changes; it must not touch
    /// this store.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T::Patch,
    {
        self.commit(f);
    }

    fn commit<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T::Patch,
    {
        if self.detached {
            debug!(store = %self.id, "write to detached store discarded");
            return;
        }

        let version = {
            let mut guard = self.value.write();
            let patch = f(&guard);
            let mut next = T::clone(&guard);
            if let Err(err) = next.try_merge(patch) {
                warn!(store = %self.id, error = %err, "patch rejected; nothing committed");
                return;
            }
            *guard = Arc::new(next);
            self.version.fetch_add(1, Ordering::AcqRel) + 1
        };

        let notified = self.registry.notify_all();
        trace!(store = %self.id, version, subscribers = notified, "store updated");
    }

    /// Register a callback to run after every committed write.
    pub fn subscribe(&self, callback: &Callback) -> Unsubscribe {
        if self.detached {
            return Unsubscribe::noop();
        }
        self.registry.add(callback)
    }

    /// Register a callback under an identity supplied by the caller.
    pub fn subscribe_keyed(&self, key: CallbackKey, callback: Callback) -> Unsubscribe {
        if self.detached {
            return Unsubscribe::noop();
        }
        self.registry.add_keyed(key, callback)
    }

    /// Register a closure. Each call creates a distinct subscriber.
    pub fn on_change<F>(&self, f: F) -> Unsubscribe
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(&callback(f))
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of writes committed so far.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}

impl<T> Debug for Store<T>
where
    T: ShallowMerge + Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id)
            .field("value", &self.get())
            .field("version", &self.version())
            .field("subscriber_count", &self.subscriber_count())
            .field("detached", &self.detached)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
