//! Error types.
//!
//! Store operations never fail. Errors only arise while turning foreign data
//! into a patch or merging such a patch; a store that sees one commits
//! nothing.

use thiserror::Error;

/// Failure to build a patch for a store.
#[derive(Debug, Error)]
pub enum PatchError {
    /// The value did not serialise to a key/value object.
    #[error("patch must be an object, found {found}")]
    NotAnObject { found: &'static str },

    /// The value could not be serialised at all.
    #[error("failed to serialise patch: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The patch was built but could not be merged into the current value.
    #[error("patch could not be merged: {0}")]
    Rejected(String),
}
