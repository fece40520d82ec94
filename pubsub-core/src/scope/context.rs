//! Scope Context
//!
//! The scope context records which providers are currently active so that a
//! consumer can find the store of its nearest enclosing provider without
//! being handed it explicitly.
//!
//! # Implementation
//!
//! We use a thread-local stack of active scopes. Entering a provider pushes
//! an entry tagged with the factory that built it; the returned guard removes
//! it again. Lookup walks the stack from the top and returns the first entry
//! belonging to the requested factory, so providers of other factories in
//! between are skipped and a nested provider of the same factory shadows the
//! outer one.

use std::any::Any;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::store::{ShallowMerge, Store};

/// Identifies one factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FactoryId(u64);

impl FactoryId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identifies one provider instantiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

thread_local! {
    static SCOPE_STACK: RefCell<Vec<ScopeEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the scope stack.
struct ScopeEntry {
    factory: FactoryId,
    scope: ScopeId,
    /// An `Arc<Store<T>>` for the factory's `T`.
    store: Arc<dyn Any + Send + Sync>,
}

/// Guard that removes its scope when dropped.
///
/// Guards may be dropped in any order; each removes only its own entry. The
/// guard is tied to the thread that entered the scope.
pub struct ScopeGuard {
    scope: ScopeId,
    _not_send: PhantomData<*const ()>,
}

/// Access to the thread's scope stack.
pub struct ScopeContext;

impl ScopeContext {
    /// Make `store` the innermost scope for `factory` until the guard drops.
    pub fn enter<T: ShallowMerge>(
        factory: FactoryId,
        scope: ScopeId,
        store: Arc<Store<T>>,
    ) -> ScopeGuard {
        let depth = SCOPE_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(ScopeEntry {
                factory,
                scope,
                store,
            });
            stack.len()
        });
        debug!(?factory, ?scope, depth, "entered scope");

        ScopeGuard {
            scope,
            _not_send: PhantomData,
        }
    }

    /// Find the store of the innermost active scope built by `factory`.
    pub fn lookup<T: ShallowMerge>(factory: FactoryId) -> Option<Arc<Store<T>>> {
        let store = SCOPE_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .find(|entry| entry.factory == factory)
                .map(|entry| Arc::clone(&entry.store))
        })?;

        store.downcast::<Store<T>>().ok()
    }

    /// The innermost active scope of `factory`, if any.
    pub fn current_scope(factory: FactoryId) -> Option<ScopeId> {
        SCOPE_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .find(|entry| entry.factory == factory)
                .map(|entry| entry.scope)
        })
    }

    /// Number of active scopes on this thread, across all factories.
    pub fn depth() -> usize {
        SCOPE_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPE_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|entry| entry.scope == self.scope) {
                stack.remove(pos);
            }
        });
        debug!(scope = ?self.scope, "left scope");
    }
}
