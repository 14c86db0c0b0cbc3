// Dotted-path access into report data
//
// `a.b.c` walks nested objects; a numeric segment indexes into an array
// (`actions.0.qui`). Lookups never fail loudly, they return `None`.

use serde_json::{Map, Value};

/// Resolve `path` inside `data`
pub fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if path.trim().is_empty() {
        return None;
    }

    path.split('.').try_fold(data, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Display text of a scalar value
///
/// Strings are returned as is, numbers and booleans are formatted, arrays of
/// scalars are joined with ", ". Null, objects and empty strings give `None`.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_to_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        Value::Null | Value::Object(_) => None,
    }
}

/// Lookup + [`value_to_text`] in one step
pub fn lookup_text(data: &Value, path: &str) -> Option<String> {
    lookup(data, path).and_then(value_to_text)
}

/// Write `value` at `path`, creating intermediate objects as needed
///
/// Any non-object found along the way is replaced by an object.
pub fn set_path(data: &mut Value, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = data;
    for segment in parents {
        current = ensure_object(current)
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(current).insert(last.to_string(), value);
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by an object"),
    }
}

/// Replace every `{{dotted.path}}` in `text` with the value found in `data`
///
/// Returns the interpolated text and the paths that did not resolve; those
/// are replaced by an empty string.
pub fn interpolate(text: &str, data: &Value) -> (String, Vec<String>) {
    let mut output = String::with_capacity(text.len());
    let mut missing = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        output.push_str(&rest[..start]);

        let path = rest[start + 2..start + 2 + len].trim();
        match lookup_text(data, path) {
            Some(value) => output.push_str(&value),
            None => missing.push(path.to_string()),
        }
        rest = &rest[start + 2 + len + 2..];
    }
    output.push_str(rest);

    (output, missing)
}
