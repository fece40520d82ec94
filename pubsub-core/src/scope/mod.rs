//! Scopes and Subscriptions
//!
//! This module connects stores to the consumers that read them.
//!
//! # Concepts
//!
//! ## Factory
//!
//! A [`PubSub`] captures an initial value once. It hands out providers and
//! resolves consumers to the right store.
//!
//! ## Provider
//!
//! A [`Provider`] is one instantiation of a scope. It owns one store, seeded
//! from the factory's initial value. Nested providers of the same factory
//! are independent.
//!
//! ## Subscription
//!
//! A [`Subscription`] reads `selector(store value)` and refreshes itself on
//! every write, re-rendering only when the derived value changes.
//!
//! # Implementation Notes
//!
//! Ambient lookup uses a thread-local stack of entered providers, much like
//! the tracking context used by signal-based reactive runtimes. Code that
//! prefers explicit wiring can skip it and call `Provider::use_sub`
//! directly.

mod context;
mod provider;
mod selection;

pub use context::{FactoryId, ScopeContext, ScopeGuard, ScopeId};
pub use provider::{Provider, PubSub, PubSubBuilder};
pub use selection::{ExternalStore, Selection, Selector, Subscription, SyncExternalStore};
