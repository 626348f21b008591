//! JSON merge patch (RFC 7396) used for character updates.
//!
//! Updates are partial: object keys in the patch overwrite stored keys
//! recursively, `null` removes a key, and keys absent from the patch are kept.
//! A non-object patch replaces the document wholesale. Applying the same patch
//! twice yields the same document as applying it once.

use serde_json::{Map, Value};

/// Apply `patch` to `target` in place.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        target.clone_from(patch);
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Return a copy of `target` with `patch` applied.
#[must_use]
pub fn merged(target: &Value, patch: &Value) -> Value {
    let mut out = target.clone();
    merge_patch(&mut out, patch);
    out
}
