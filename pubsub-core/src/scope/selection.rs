//! Selector Subscriptions
//!
//! A consumer never watches the whole store. It supplies a selector that
//! derives the slice it cares about, and is refreshed whenever the store is
//! written.
//!
//! # How Subscriptions Work
//!
//! 1. A [`Selection`] pairs a store with a selector. It is an
//!    [`ExternalStore`]: anything can subscribe to it and pull the latest
//!    derived snapshot.
//!
//! 2. A [`SyncExternalStore`] is the consumer side. It reads the snapshot
//!    once when created, then re-reads it on every notification and commits
//!    it only when it differs from what it last rendered.
//!
//! 3. A [`Subscription`] is the pairing handed out by `use_sub`: the consumer
//!    plus a setter bound to the same store.
//!
//! # Equality
//!
//! The selector re-runs on every write. Whether a consumer re-renders is
//! decided by `PartialEq` on the derived value, in the consumer, never in
//! the store. A selector that builds a fresh value each time is fine as long
//! as equal inputs produce equal outputs.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::store::{callback, Callback, ShallowMerge, Store, Unsubscribe};

/// A selector deriving a view from the store's value.
pub type Selector<T, D> = Arc<dyn Fn(&T) -> D + Send + Sync>;

/// The observer contract between a store and the host that renders it.
pub trait ExternalStore: Send + Sync + 'static {
    /// The value the host renders.
    type Snapshot;

    /// Register a callback fired after every change.
    fn subscribe(&self, callback: &Callback) -> Unsubscribe;

    /// The latest snapshot. Called after every notification.
    fn get_snapshot(&self) -> Self::Snapshot;
}

/// A store seen through a selector.
pub struct Selection<T: ShallowMerge, D> {
    store: Arc<Store<T>>,
    selector: Selector<T, D>,
}

impl<T, D> Selection<T, D>
where
    T: ShallowMerge,
    D: 'static,
{
    pub fn new<F>(store: Arc<Store<T>>, selector: F) -> Self
    where
        F: Fn(&T) -> D + Send + Sync + 'static,
    {
        Self {
            store,
            selector: Arc::new(selector),
        }
    }

    /// `selector(current value)`, evaluated now.
    pub fn data(&self) -> D {
        self.store.read(|value| (self.selector)(value))
    }

    /// Write any patch of the full store value.
    pub fn set_data(&self, patch: T::Patch) {
        self.store.set(patch);
    }

    pub fn store(&self) -> &Arc<Store<T>> {
        &self.store
    }
}

impl<T: ShallowMerge, D> Clone for Selection<T, D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            selector: Arc::clone(&self.selector),
        }
    }
}

impl<T, D> ExternalStore for Selection<T, D>
where
    T: ShallowMerge,
    D: 'static,
{
    type Snapshot = D;

    fn subscribe(&self, callback: &Callback) -> Unsubscribe {
        self.store.subscribe(callback)
    }

    fn get_snapshot(&self) -> D {
        self.data()
    }
}

impl<T: ShallowMerge, D> Debug for Selection<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("store", &self.store.id())
            .finish_non_exhaustive()
    }
}

struct Rendered<D> {
    data: Mutex<D>,
    renders: AtomicUsize,
    notifications: AtomicUsize,
}

/// A consumer kept in sync with an [`ExternalStore`].
///
/// The consumer holds the last rendered snapshot. On every notification it
/// pulls a fresh snapshot and replaces the rendered one if they differ.
/// Dropping the consumer unsubscribes it.
pub struct SyncExternalStore<S>
where
    S: ExternalStore,
{
    source: Arc<S>,
    rendered: Arc<Rendered<S::Snapshot>>,
    unsubscribe: Unsubscribe,
}

impl<S> SyncExternalStore<S>
where
    S: ExternalStore,
    S::Snapshot: Clone + PartialEq + Send + 'static,
{
    /// Render the initial snapshot and subscribe to changes.
    pub fn new(source: S) -> Self {
        let source = Arc::new(source);
        let rendered = Arc::new(Rendered {
            data: Mutex::new(source.get_snapshot()),
            renders: AtomicUsize::new(1),
            notifications: AtomicUsize::new(0),
        });

        // Weak references only: the store owns this callback, and must not
        // keep its own consumers alive.
        let weak_source = Arc::downgrade(&source);
        let weak_rendered = Arc::downgrade(&rendered);
        let on_change = callback(move || {
            let (Some(source), Some(rendered)) = (weak_source.upgrade(), weak_rendered.upgrade())
            else {
                return;
            };

            rendered.notifications.fetch_add(1, Ordering::AcqRel);
            let next = source.get_snapshot();

            let mut data = rendered.data.lock();
            if *data != next {
                *data = next;
                let renders = rendered.renders.fetch_add(1, Ordering::AcqRel) + 1;
                trace!(renders, "consumer re-rendered");
            }
        });

        let unsubscribe = source.subscribe(&on_change);

        Self {
            source,
            rendered,
            unsubscribe,
        }
    }

    /// The last rendered snapshot.
    pub fn data(&self) -> S::Snapshot {
        self.rendered.data.lock().clone()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Number of times the rendered snapshot changed, counting the first
    /// render.
    pub fn render_count(&self) -> usize {
        self.rendered.renders.load(Ordering::Acquire)
    }

    /// Number of notifications received.
    pub fn notification_count(&self) -> usize {
        self.rendered.notifications.load(Ordering::Acquire)
    }

    /// Stop receiving notifications. The last rendered snapshot is kept.
    pub fn unsubscribe(&self) {
        self.unsubscribe.unsubscribe();
    }

    pub fn is_subscribed(&self) -> bool {
        !self.unsubscribe.is_spent()
    }
}

impl<S> Drop for SyncExternalStore<S>
where
    S: ExternalStore,
{
    fn drop(&mut self) {
        self.unsubscribe.unsubscribe();
    }
}

/// The result of `use_sub`: a selected slice that tracks the store, plus a
/// setter for the whole store.
///
/// # Example
///
/// ```rust
/// use pubsub_core::{store_data, PubSub};
///
/// store_data! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Name => NamePatch {
///         pub name: String,
///     }
/// }
///
/// let pubsub = PubSub::new(Name { name: String::new() });
/// pubsub.wrap(|| {
///     let name = pubsub.use_sub(|s: &Name| s.name.clone());
///     assert_eq!(name.data(), "");
///
///     name.set_data(NamePatch { name: Some("peter pan".into()) });
///     assert_eq!(name.data(), "peter pan");
/// });
/// ```
pub struct Subscription<T: ShallowMerge, D>
where
    D: Clone + PartialEq + Send + 'static,
{
    consumer: SyncExternalStore<Selection<T, D>>,
}

impl<T, D> Subscription<T, D>
where
    T: ShallowMerge,
    D: Clone + PartialEq + Send + 'static,
{
    pub fn new(selection: Selection<T, D>) -> Self {
        Self {
            consumer: SyncExternalStore::new(selection),
        }
    }

    /// The derived value as of the most recent notification.
    pub fn data(&self) -> D {
        self.consumer.data()
    }

    /// Write any patch of the full store value, not just the selected slice.
    pub fn set_data(&self, patch: T::Patch) {
        self.consumer.source().set_data(patch);
    }

    /// Compute a patch from the store's current value and write it.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T::Patch,
    {
        self.consumer.source().store().update(f);
    }

    pub fn store(&self) -> &Arc<Store<T>> {
        self.consumer.source().store()
    }

    pub fn render_count(&self) -> usize {
        self.consumer.render_count()
    }

    pub fn notification_count(&self) -> usize {
        self.consumer.notification_count()
    }

    pub fn unsubscribe(&self) {
        self.consumer.unsubscribe();
    }

    pub fn is_subscribed(&self) -> bool {
        self.consumer.is_subscribed()
    }
}

impl<T, D> Debug for Subscription<T, D>
where
    T: ShallowMerge,
    D: Clone + PartialEq + Send + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("store", &self.store().id())
            .field("data", &self.data())
            .field("render_count", &self.render_count())
            .finish()
    }
}
