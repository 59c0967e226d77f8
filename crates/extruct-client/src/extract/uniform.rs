//! Reshape syntax-specific items into `@context` / `@type` / flat properties.

use serde_json::{Map, Value, json};

/// Context used for microformats2 items.
pub(crate) const MICROFORMAT_CONTEXT: &str = "http://microformats.org/wiki/";

pub(crate) fn microdata(items: Vec<Value>, schema_context: &str) -> Vec<Value> {
    items
        .into_iter()
        .map(|item| flatten_item(item, schema_context, true))
        .collect()
}

pub(crate) fn microformat(items: Vec<Value>) -> Vec<Value> {
    items
        .into_iter()
        .map(|item| flatten_item(item, MICROFORMAT_CONTEXT, true))
        .collect()
}

/// Collapse `[name, value]` pairs into one object per item. The first value
/// of a repeated property wins; `og:type` becomes `@type`.
pub(crate) fn opengraph(items: Vec<Value>) -> Vec<Value> {
    items
        .into_iter()
        .map(|item| {
            let mut out = Map::new();
            if let Some(pairs) = item.get("properties").and_then(Value::as_array) {
                for pair in pairs {
                    if let (Some(name), Some(value)) =
                        (pair.get(0).and_then(Value::as_str), pair.get(1))
                        && !out.contains_key(name)
                    {
                        out.insert(name.to_string(), value.clone());
                    }
                }
            }
            if let Some(ty) = out.remove("og:type") {
                out.insert("@type".into(), ty);
            }
            out.insert(
                "@context".into(),
                item.get("namespace").cloned().unwrap_or_else(|| json!({})),
            );
            Value::Object(out)
        })
        .collect()
}

fn flatten_item(item: Value, context: &str, add_context: bool) -> Value {
    let Value::Object(fields) = item else {
        return item;
    };

    let mut out = Map::new();
    if add_context {
        out.insert("@context".into(), json!(context));
    }
    for (field, value) in fields {
        if field == "type" {
            out.insert("@type".into(), strip_type(value, context));
        } else if field == "properties" {
            if let Value::Object(props) = value {
                for (name, value) in props {
                    out.insert(name, flatten_value(value, context));
                }
            }
        } else if field == "children" {
            let children = flatten_value(value, context);
            out.insert(field, children);
        } else {
            out.insert(field, value);
        }
    }
    Value::Object(out)
}

fn flatten_value(value: Value, context: &str) -> Value {
    match value {
        Value::Object(_) => flatten_item(value, context, false),
        Value::Array(values) => Value::Array(
            values
                .into_iter()
                .map(|v| flatten_value(v, context))
                .collect(),
        ),
        other => other,
    }
}

/// Drop the `<context>/` prefix from type IRIs; a single-element list
/// becomes a plain string.
fn strip_type(value: Value, context: &str) -> Value {
    let prefix = format!("{}/", context.trim_end_matches('/'));
    let strip = |t: &str| t.strip_prefix(&prefix).unwrap_or(t).to_string();

    match value {
        Value::String(t) => json!(strip(&t)),
        Value::Array(mut types) if types.len() == 1 => strip_type(types.remove(0), context),
        Value::Array(types) => Value::Array(
            types
                .into_iter()
                .map(|t| match t {
                    Value::String(s) => json!(strip(&s)),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}
