//! PubSub Core
//!
//! This crate provides scoped, shared stores with selector-based
//! subscriptions. It implements:
//!
//! - A store engine (current value, shallow-merge writes, subscriber set)
//! - A factory that instantiates one store per provider scope
//! - Selector subscriptions that refresh on every write and re-render only
//!   when the selected value changes
//!
//! The crate is designed to be used both as a native Rust library and, with
//! the `python` feature, as a Python extension module via PyO3.
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `store`: the container, the merge rule and the subscriber registry
//! - `scope`: the factory, providers, ambient scope lookup and subscriptions
//!
//! # Example
//!
//! ```rust
//! use pubsub_core::{store_data, PubSub};
//!
//! store_data! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Address => AddressPatch {
//!         pub street1: String,
//!         pub street2: Option<String>,
//!         pub city: String,
//!     }
//! }
//!
//! let pubsub = PubSub::new(Address {
//!     street1: "1 hack drive".into(),
//!     street2: None,
//!     city: "menlo park".into(),
//! });
//!
//! let provider = pubsub.provider();
//! provider.scope(|| {
//!     let street1 = pubsub.use_sub(|s: &Address| s.street1.clone());
//!
//!     // Any subscriber may write any field.
//!     street1.set_data(AddressPatch {
//!         street2: Some(Some("PO Box 123".into())),
//!         ..Default::default()
//!     });
//!
//!     assert_eq!(street1.data(), "1 hack drive");
//!     assert_eq!(street1.render_count(), 1);
//! });
//!
//! assert_eq!(provider.store().get().street2.as_deref(), Some("PO Box 123"));
//! ```

pub mod error;
pub mod scope;
pub mod store;

#[cfg(feature = "python")]
pub mod python;

pub use error::PatchError;
pub use scope::{
    ExternalStore, Provider, PubSub, PubSubBuilder, ScopeGuard, Selection, Subscription,
    SyncExternalStore,
};
pub use store::{callback, Callback, Record, ShallowMerge, Store, Unsubscribe};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module definition.
///
/// This function is called by Python when importing the module.
/// It registers all Python-exposed types.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyPubSub>()?;
    m.add_class::<python::PyStore>()?;
    m.add_class::<python::PyUnsubscribe>()?;

    // Add version info
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
