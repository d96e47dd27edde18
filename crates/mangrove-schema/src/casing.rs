//! Wire-casing conversion.
//!
//! Pure, reversible renaming between snake_case (internal model fields)
//! and camelCase (wire format) applied recursively to JSON object keys.
//!
//! Keys beginning with an underscore (identifier fields like `_id`) are
//! never converted, in either direction. Round-tripping is exact for
//! canonical snake_case keys (`decamelize(camelize(k)) == k`).

use serde_json::{Map, Value};

/// Converts a snake_case key to camelCase.
///
/// Keys starting with `_` are returned unchanged.
#[must_use]
pub fn camelize_key(key: &str) -> String {
    if key.starts_with('_') {
        return key.to_string();
    }

    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Converts a camelCase key to snake_case.
///
/// Keys starting with `_` are returned unchanged.
#[must_use]
pub fn decamelize_key(key: &str) -> String {
    if key.starts_with('_') {
        return key.to_string();
    }

    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Recursively camelizes all object keys in a JSON value.
#[must_use]
pub fn camelize(value: Value) -> Value {
    transform_keys(value, &camelize_key)
}

/// Recursively decamelizes all object keys in a JSON value.
#[must_use]
pub fn decamelize(value: Value) -> Value {
    transform_keys(value, &decamelize_key)
}

fn transform_keys(value: Value, rename: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(object) => Value::Object(
            object
                .into_iter()
                .map(|(key, value)| (rename(&key), transform_keys(value, rename)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| transform_keys(item, rename))
                .collect(),
        ),
        scalar => scalar,
    }
}
