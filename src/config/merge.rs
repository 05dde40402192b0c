//! Deep merge of configuration fragments.
//!
//! Merge semantics follow the raw-mutator contract: maps merge recursively,
//! arrays concatenate, scalars overwrite with the later value winning on
//! conflicting keys.

use serde_json::Value;

/// Merge `incoming` over `base` and return the result.
pub fn merge(base: Value, incoming: Value) -> Value {
    match (base, incoming) {
        (Value::Object(mut base), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match base.remove(&key) {
                    Some(existing) => {
                        base.insert(key, merge(existing, value));
                    }
                    None => {
                        base.insert(key, value);
                    }
                }
            }
            Value::Object(base)
        }
        (Value::Array(mut base), Value::Array(incoming)) => {
            base.extend(incoming);
            Value::Array(base)
        }
        (_, incoming) => incoming,
    }
}

/// Merge `incoming` into `base` in place.
pub fn merge_into(base: &mut Value, incoming: Value) {
    let existing = std::mem::take(base);
    *base = merge(existing, incoming);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_overwrite() {
        let merged = merge(json!({ "a": 1, "b": 2 }), json!({ "b": 3 }));
        assert_eq!(merged, json!({ "a": 1, "b": 3 }));
    }

    #[test]
    fn test_nested_objects_merge() {
        let merged = merge(
            json!({ "output": { "path": "dist", "publicPath": "/" } }),
            json!({ "output": { "publicPath": "/app/" } }),
        );
        assert_eq!(
            merged,
            json!({ "output": { "path": "dist", "publicPath": "/app/" } })
        );
    }

    #[test]
    fn test_arrays_concatenate() {
        let merged = merge(
            json!({ "plugins": [{ "name": "a" }] }),
            json!({ "plugins": [{ "name": "b" }] }),
        );
        assert_eq!(
            merged,
            json!({ "plugins": [{ "name": "a" }, { "name": "b" }] })
        );
    }

    #[test]
    fn test_type_mismatch_overwrites() {
        let merged = merge(json!({ "entry": "main.js" }), json!({ "entry": ["a", "b"] }));
        assert_eq!(merged, json!({ "entry": ["a", "b"] }));
    }

    #[test]
    fn test_merge_into() {
        let mut base = json!({ "a": { "b": 1 } });
        merge_into(&mut base, json!({ "a": { "c": 2 } }));
        assert_eq!(base, json!({ "a": { "b": 1, "c": 2 } }));
    }
}
