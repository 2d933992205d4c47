//! Field-path evaluation over JSON responses
//!
//! Paths use dot and bracket segments interchangeably: `data.items[0].value`
//! and `data.items.0.value` address the same field. Falsy values (`0`,
//! `false`, `""`) are found values, only a missing segment is "not found".

use serde_json::Value;

/// Split a path into segments, ignoring empty ones
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['.', '[', ']']).filter(|s| !s.is_empty())
}

/// Resolve `path` inside `value`; `None` as soon as a segment cannot be followed
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Like [`lookup`] but a terminal `null` also counts as not found
pub fn lookup_present<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    lookup(value, path).filter(|v| !v.is_null())
}
