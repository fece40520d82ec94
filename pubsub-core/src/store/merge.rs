//! Shallow Merge
//!
//! A store is only ever written through a patch. Merging a patch replaces
//! whole top-level fields (or keys); nothing below the top level is merged
//! element-wise, and nothing the patch leaves out is removed.
//!
//! # Shapes
//!
//! - Keyed mappings (`HashMap`, `BTreeMap`, `IndexMap`): the patch is a map of
//!   the same type. Every key it carries overwrites; other keys stay.
//! - Dynamic records ([`Record`](super::Record)): a JSON object patched by
//!   another JSON object. See the `record` module.
//! - Typed records: declare them with [`store_data!`](crate::store_data),
//!   which generates the patch struct alongside the record.

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use indexmap::IndexMap;

use crate::error::PatchError;

/// A value that can absorb a partial update of itself.
///
/// `merge` is applied to a private copy of the current snapshot; the store
/// commits the copy afterwards. Implementations only assign fields.
pub trait ShallowMerge: Clone + Send + Sync + 'static {
    /// The partial-update type. Every field or key it carries overwrites the
    /// corresponding top-level entry of `Self` in full.
    type Patch: Send + 'static;

    /// Overwrite every top-level entry present in `patch`.
    fn merge(&mut self, patch: Self::Patch);

    /// Like `merge`, for shapes where applying a patch can fail. On error the
    /// store commits nothing and notifies nobody.
    fn try_merge(&mut self, patch: Self::Patch) -> Result<(), PatchError> {
        self.merge(patch);
        Ok(())
    }
}

impl<K, V, S> ShallowMerge for HashMap<K, V, S>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: BuildHasher + Clone + Send + Sync + 'static,
{
    type Patch = HashMap<K, V, S>;

    fn merge(&mut self, patch: Self::Patch) {
        self.extend(patch);
    }
}

impl<K, V> ShallowMerge for BTreeMap<K, V>
where
    K: Ord + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Patch = BTreeMap<K, V>;

    fn merge(&mut self, patch: Self::Patch) {
        self.extend(patch);
    }
}

impl<K, V, S> ShallowMerge for IndexMap<K, V, S>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: BuildHasher + Clone + Send + Sync + 'static,
{
    type Patch = IndexMap<K, V, S>;

    // Existing keys keep their position; new keys are appended.
    fn merge(&mut self, patch: Self::Patch) {
        self.extend(patch);
    }
}

/// Declare a record type together with its patch type.
///
/// Every field of the patch is the record's field wrapped in `Option`:
/// `None` leaves the field alone, `Some(v)` replaces it. A field that is
/// itself optional therefore gets an `Option<Option<_>>` patch field, and
/// `Some(None)` clears it.
///
/// ```rust
/// use pubsub_core::store_data;
///
/// store_data! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Address => AddressPatch {
///         pub street1: String,
///         pub street2: Option<String>,
///         pub zipcode: u32,
///     }
/// }
///
/// use pubsub_core::ShallowMerge;
///
/// let mut address = Address {
///     street1: "1 hack drive".into(),
///     street2: None,
///     zipcode: 94025,
/// };
/// address.merge(AddressPatch {
///     street2: Some(Some("PO Box 123".into())),
///     ..Default::default()
/// });
/// assert_eq!(address.street1, "1 hack drive");
/// assert_eq!(address.street2.as_deref(), Some("PO Box 123"));
/// ```
#[macro_export]
macro_rules! store_data {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident => $patch:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        #[doc = concat!("Partial update of [`", stringify!($name), "`].")]
        #[derive(Clone, Default)]
        #[allow(clippy::option_option)]
        $vis struct $patch {
            $(
                $field_vis $field: ::core::option::Option<$ty>,
            )*
        }

        impl $crate::ShallowMerge for $name {
            type Patch = $patch;

            fn merge(&mut self, patch: Self::Patch) {
                $(
                    if let ::core::option::Option::Some(value) = patch.$field {
                        self.$field = value;
                    }
                )*
            }
        }
    };
}
