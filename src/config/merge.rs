//! Deep merge over loosely-typed configuration values.
//!
//! Mappings merge key-by-key, recursively. Every other value type -
//! scalars and arrays included - is replaced wholesale by the override.
//! Absent override keys keep the base value.

use serde_json::Value;

/// Merge `over` into `base` in place.
pub fn merge_value(base: &mut Value, over: Value) {
    match (base, over) {
        (Value::Object(base_map), Value::Object(over_map)) => {
            for (key, over_value) in over_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => merge_value(base_value, over_value),
                    None => {
                        base_map.insert(key, over_value);
                    }
                }
            }
        }
        (base_slot, over_value) => *base_slot = over_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn merged(mut base: Value, over: Value) -> Value {
        merge_value(&mut base, over);
        base
    }

    #[test]
    fn test_nested_merge_preserves_siblings() {
        assert_eq!(
            merged(json!({"a": {"b": 1, "c": 2}}), json!({"a": {"b": 5}})),
            json!({"a": {"b": 5, "c": 2}})
        );
    }

    #[test]
    fn test_arrays_replaced_wholesale() {
        assert_eq!(
            merged(json!({"list": [1, 2]}), json!({"list": [3]})),
            json!({"list": [3]})
        );
    }

    #[test]
    fn test_scalar_replaced() {
        assert_eq!(merged(json!({"a": 1}), json!({"a": "x"})), json!({"a": "x"}));
    }

    #[test]
    fn test_absent_keys_keep_defaults() {
        assert_eq!(
            merged(json!({"a": 1, "b": 2}), json!({})),
            json!({"a": 1, "b": 2})
        );
    }

    #[test]
    fn test_new_keys_added() {
        assert_eq!(
            merged(json!({"a": {"b": 1}}), json!({"a": {"d": 4}, "e": 5})),
            json!({"a": {"b": 1, "d": 4}, "e": 5})
        );
    }

    #[test]
    fn test_object_replaces_scalar() {
        assert_eq!(
            merged(json!({"a": 1}), json!({"a": {"b": 2}})),
            json!({"a": {"b": 2}})
        );
    }
}
