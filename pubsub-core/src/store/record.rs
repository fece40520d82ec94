//! Dynamic records.
//!
//! A [`Record`] is a JSON object used as store data when the shape is only
//! known at runtime. Patches are records too. Keys the patch carries are
//! written verbatim, including keys the initial value never had and explicit
//! `null`s; a key can never be removed through a patch.

use serde::Serialize;
use serde_json::{Map, Value};

use super::merge::ShallowMerge;
use crate::error::PatchError;

/// A JSON object holding the store's fields.
pub type Record = Map<String, Value>;

impl ShallowMerge for Record {
    type Patch = Record;

    fn merge(&mut self, patch: Self::Patch) {
        for (key, value) in patch {
            self.insert(key, value);
        }
    }
}

/// Build a record patch from any serialisable value.
///
/// The value must serialise to a JSON object.
pub fn patch_from<P>(partial: &P) -> Result<Record, PatchError>
where
    P: Serialize + ?Sized,
{
    match serde_json::to_value(partial)? {
        Value::Object(map) => Ok(map),
        other => Err(PatchError::NotAnObject {
            found: kind_of(&other),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
