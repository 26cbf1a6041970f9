//! Path-addressed access over untyped JSON trees.
//!
//! Converters never touch node fields directly; these two functions are the
//! sole structural primitive. A path is a slice of segments; a segment with a
//! trailing `[]` marker distributes the remaining path over every element of
//! the sequence found (or created) at that position.
//!
//! The sentinel path `["_self"]` addresses the whole node.

use serde_json::{Map, Value};

/// True for values that must never materialize in a wire body: absent
/// optional fields stay absent rather than becoming explicit nulls/zeros.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Set `value` at `keys` inside `data`, creating intermediate objects.
///
/// A zero/empty/nil value is a complete no-op: the input tree is not touched.
/// Intermediate positions holding a non-object are overwritten with a fresh
/// object. A `key[]` segment distributes: one element object is created per
/// element of a sequence value (or the existing element objects are
/// extended), and the remaining path is applied to each element, pairing a
/// same-length sequence value element-for-element and broadcasting anything
/// else.
pub fn set_value_by_path(data: &mut Value, keys: &[&str], value: &Value) {
    if keys.is_empty() || is_empty_value(value) {
        return;
    }
    if !data.is_object() {
        *data = Value::Object(Map::new());
    }

    let key = keys[0];
    let rest = &keys[1..];

    if let Some(key_name) = key.strip_suffix("[]") {
        let map = data.as_object_mut().expect("data coerced to object above");
        if rest.is_empty() {
            map.insert(key_name.to_string(), value.clone());
            return;
        }
        let slot = map
            .entry(key_name.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        let arr = slot.as_array_mut().expect("slot coerced to array above");
        if arr.is_empty() {
            let n = match value {
                Value::Array(items) => items.len(),
                _ => 1,
            };
            arr.resize(n, Value::Object(Map::new()));
        }

        match value {
            Value::Array(items) if items.len() == arr.len() => {
                for (element, item) in arr.iter_mut().zip(items) {
                    set_value_by_path(element, rest, item);
                }
            }
            other => {
                for element in arr.iter_mut() {
                    set_value_by_path(element, rest, other);
                }
            }
        }
        return;
    }

    if rest.is_empty() {
        data.as_object_mut()
            .expect("data coerced to object above")
            .insert(key.to_string(), value.clone());
        return;
    }

    let map = data.as_object_mut().expect("data coerced to object above");
    let child = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !child.is_object() {
        *child = Value::Object(Map::new());
    }
    set_value_by_path(child, rest, value);
}

/// Look up the value at `keys` inside `data`.
///
/// Returns `None` (never an error) for an empty path, a missing key, or a
/// non-object intermediate node. A `key[]` segment maps the remaining path
/// over every element and returns the results as an array, with `Null`
/// standing in for elements where the suffix is absent.
pub fn get_value_by_path(data: &Value, keys: &[&str]) -> Option<Value> {
    if keys.is_empty() {
        return None;
    }
    if keys == ["_self"] {
        return Some(data.clone());
    }

    let key = keys[0];
    let rest = &keys[1..];

    if let Some(key_name) = key.strip_suffix("[]") {
        let arr = data.as_object()?.get(key_name)?.as_array()?;
        if rest.is_empty() {
            return Some(Value::Array(arr.clone()));
        }
        let mapped = arr
            .iter()
            .map(|element| get_value_by_path(element, rest).unwrap_or(Value::Null))
            .collect();
        return Some(Value::Array(mapped));
    }

    let next = data.as_object()?.get(key)?;
    if rest.is_empty() {
        if next.is_null() {
            None
        } else {
            Some(next.clone())
        }
    } else {
        get_value_by_path(next, rest)
    }
}
