//! Deep merge of YAML configuration trees.
//!
//! Higher tiers override lower tiers key by key. Arrays are replaced, never
//! concatenated.

use serde_json::Value;

/// Deep merge two values, with `overlay` taking precedence over `base`.
///
/// - Objects merge recursively
/// - Any other overlay value replaces the base value
/// - A null overlay keeps the base (null means "not specified")
///
/// # Example
/// ```
/// use serde_json::json;
/// use project_progress_mcp::config::deep_merge;
///
/// let base = json!({"reconcile": {"issue_policy": "fold", "strict_versions": false}});
/// let overlay = json!({"reconcile": {"strict_versions": true}});
/// let merged = deep_merge(base, overlay);
/// assert_eq!(merged["reconcile"]["issue_policy"], "fold");
/// assert_eq!(merged["reconcile"]["strict_versions"], true);
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Merge values in order; later values win.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}
