//! Store Primitives
//!
//! This module implements the store engine: the container holding the
//! current value, the shallow-merge update rule, and the registry of change
//! callbacks.
//!
//! # Concepts
//!
//! ## Store
//!
//! A Store owns one current value. It is only ever written through a patch,
//! which is merged one level deep into a copy of the current value. The copy
//! then replaces the current value in a single step.
//!
//! ## Patches
//!
//! A patch names the top-level fields (or keys) to overwrite. Anything the
//! patch leaves out keeps its previous value. Nested values are replaced
//! whole; a caller that wants to append to a list reads the list, builds the
//! new list and writes it back.
//!
//! ## Subscribers
//!
//! A subscriber is a no-argument callback. The registry is a set: adding the
//! same callback twice leaves one entry, and every write notifies each entry
//! exactly once.
//!
//! # Implementation Notes
//!
//! Notification is synchronous. By the time `set` returns, every callback
//! that was registered when the fan-out began has run. Callbacks must not
//! depend on the order in which they are called.

mod container;
mod merge;
mod record;
mod subscriber;

pub use container::{Store, StoreId};
pub use merge::ShallowMerge;
pub use record::{patch_from, Record};
pub use subscriber::{
    callback, Callback, CallbackKey, SubscriberId, SubscriberRegistry, Unsubscribe,
};
