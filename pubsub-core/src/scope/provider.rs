//! Factory and Provider
//!
//! [`PubSub`] is built once from an initial value. Every [`Provider`] it
//! creates owns a fresh store seeded with that same initial value; a
//! provider never inherits state from an enclosing provider of the same
//! factory, and a torn-down provider's state is gone for good.
//!
//! Consumers find their store in one of two ways:
//!
//! - explicitly, by asking the provider (`provider.use_sub(..)`), or
//! - ambiently, by asking the factory (`pubsub.use_sub(..)`) while a provider
//!   scope is entered on the current thread.
//!
//! With no scope entered, the factory resolves to its detached store, which
//! reports the initial value forever and drops every write.

use std::borrow::Cow;
use std::fmt::{self, Debug};
use std::sync::Arc;

use tracing::debug;

use super::context::{FactoryId, ScopeContext, ScopeGuard, ScopeId};
use super::selection::{Selection, Subscription};
use crate::store::{ShallowMerge, Store};

/// Builds scoped stores that all start from the same initial value.
///
/// Cloning a factory is cheap; clones share identity, so a provider entered
/// through one clone is visible to `use_sub` on another.
pub struct PubSub<T: ShallowMerge> {
    inner: Arc<PubSubInner<T>>,
}

struct PubSubInner<T: ShallowMerge> {
    id: FactoryId,
    name: Option<Cow<'static, str>>,
    initial: Arc<T>,
    /// Built once and shared by every consumer outside a provider.
    fallback: Arc<Store<T>>,
}

impl<T: ShallowMerge> PubSub<T> {
    /// Create a factory for stores starting at `initial`.
    pub fn new(initial: T) -> Self {
        Self::builder(initial).build()
    }

    pub fn builder(initial: T) -> PubSubBuilder<T> {
        PubSubBuilder {
            initial,
            name: None,
        }
    }

    pub fn id(&self) -> FactoryId {
        self.inner.id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// The value every new provider starts from.
    pub fn initial(&self) -> Arc<T> {
        Arc::clone(&self.inner.initial)
    }

    /// Instantiate a provider with its own fresh store.
    pub fn provider(&self) -> Provider<T> {
        let store = Arc::new(Store::from_arc(self.initial()));
        let scope = ScopeId::next();
        debug!(
            factory = ?self.inner.id,
            name = self.name(),
            ?scope,
            store = %store.id(),
            "provider instantiated"
        );

        Provider {
            factory: self.inner.id,
            scope,
            store,
        }
    }

    /// Instantiate a provider and run `f` inside its scope.
    ///
    /// The provider is torn down when `f` returns.
    pub fn wrap<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.provider().scope(f)
    }

    /// The store of the innermost entered provider, or the detached store.
    pub fn resolve(&self) -> Arc<Store<T>> {
        ScopeContext::lookup(self.inner.id).unwrap_or_else(|| self.fallback())
    }

    /// The detached store used outside any provider.
    pub fn fallback(&self) -> Arc<Store<T>> {
        Arc::clone(&self.inner.fallback)
    }

    /// Whether a provider of this factory is entered on this thread.
    pub fn in_scope(&self) -> bool {
        ScopeContext::current_scope(self.inner.id).is_some()
    }

    /// Select from the resolved store without subscribing.
    pub fn select<D, F>(&self, selector: F) -> Selection<T, D>
    where
        D: 'static,
        F: Fn(&T) -> D + Send + Sync + 'static,
    {
        Selection::new(self.resolve(), selector)
    }

    /// Subscribe to a derived slice of the resolved store.
    pub fn use_sub<D, F>(&self, selector: F) -> Subscription<T, D>
    where
        D: Clone + PartialEq + Send + 'static,
        F: Fn(&T) -> D + Send + Sync + 'static,
    {
        Subscription::new(self.select(selector))
    }
}

impl<T: ShallowMerge> Clone for PubSub<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for PubSub<T>
where
    T: ShallowMerge + Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubSub")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("initial", &self.inner.initial)
            .finish()
    }
}

/// Configures a [`PubSub`].
pub struct PubSubBuilder<T: ShallowMerge> {
    initial: T,
    name: Option<Cow<'static, str>>,
}

impl<T: ShallowMerge> PubSubBuilder<T> {
    /// Label the factory in log output.
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn build(self) -> PubSub<T> {
        let initial = Arc::new(self.initial);
        let fallback = Arc::new(Store::detached(Arc::clone(&initial)));

        PubSub {
            inner: Arc::new(PubSubInner {
                id: FactoryId::next(),
                name: self.name,
                initial,
                fallback,
            }),
        }
    }
}

/// One instantiation of a factory's scope, owning one store.
pub struct Provider<T: ShallowMerge> {
    factory: FactoryId,
    scope: ScopeId,
    store: Arc<Store<T>>,
}

impl<T: ShallowMerge> Provider<T> {
    pub fn scope_id(&self) -> ScopeId {
        self.scope
    }

    pub fn store(&self) -> &Arc<Store<T>> {
        &self.store
    }

    /// Make this provider the innermost scope for its factory until the
    /// guard is dropped.
    pub fn enter(&self) -> ScopeGuard {
        ScopeContext::enter(self.factory, self.scope, Arc::clone(&self.store))
    }

    /// Run `f` with this provider entered.
    pub fn scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.enter();
        f()
    }

    /// Select from this provider's store without subscribing.
    pub fn select<D, F>(&self, selector: F) -> Selection<T, D>
    where
        D: 'static,
        F: Fn(&T) -> D + Send + Sync + 'static,
    {
        Selection::new(Arc::clone(&self.store), selector)
    }

    /// Subscribe to a derived slice of this provider's store.
    pub fn use_sub<D, F>(&self, selector: F) -> Subscription<T, D>
    where
        D: Clone + PartialEq + Send + 'static,
        F: Fn(&T) -> D + Send + Sync + 'static,
    {
        Subscription::new(self.select(selector))
    }
}

impl<T> Debug for Provider<T>
where
    T: ShallowMerge + Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("factory", &self.factory)
            .field("scope", &self.scope)
            .field("store", &self.store)
            .finish()
    }
}
