use std::collections::BTreeSet;

use serde_json::Value;

use crate::criteria::registry::Operation;

/// Dotted key paths of a JSON object. Arrays add their own path once and the
/// keys of any objects they hold, without index segments.
pub fn flatten_keys(value: &Value) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    if let Value::Object(map) = value {
        for (key, child) in map {
            collect(key, child, &mut keys);
        }
    }
    keys
}

fn collect(path: &str, value: &Value, keys: &mut BTreeSet<String>) {
    keys.insert(path.to_string());
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                collect(&format!("{path}.{key}"), child, keys);
            }
        }
        Value::Array(items) => {
            for item in items {
                if let Value::Object(map) = item {
                    for (key, child) in map {
                        collect(&format!("{path}.{key}"), child, keys);
                    }
                }
            }
        }
        _ => {}
    }
}

/// HAS_ONE / HAS_ALL over the flattened key set of `input`. Malformed JSON is
/// simply a non-match.
pub fn process_payload(operation: Operation, input: &str, values: &[String]) -> bool {
    let Ok(payload) = serde_json::from_str::<Value>(input) else {
        return false;
    };
    let keys = flatten_keys(&payload);
    match operation {
        Operation::HasOne => values.iter().any(|v| keys.contains(v)),
        Operation::HasAll => !values.is_empty() && values.iter().all(|v| keys.contains(v)),
        _ => false,
    }
}
