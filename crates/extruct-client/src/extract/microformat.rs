//! microformats2 (`h-*` roots with `p-` / `u-` / `dt-` / `e-` properties).

use std::collections::BTreeMap;

use scraper::{ElementRef, Html};
use serde_json::{Map, Value, json};
use url::Url;

use super::dom::{child_elements, resolve, text_content};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropertyKind {
    Plain,
    Url,
    DateTime,
    Embedded,
}

/// Extract every top-level microformats2 item in `doc`.
pub(crate) fn extract(doc: &Html, base: Option<&Url>) -> Vec<Value> {
    let mut items = Vec::new();
    let mut pending = vec![doc.root_element()];
    while let Some(el) = pending.pop() {
        if !root_types(el).is_empty() {
            items.push(Value::Object(parse_item(el, base)));
            continue;
        }
        let children: Vec<ElementRef<'_>> = child_elements(el).collect();
        pending.extend(children.into_iter().rev());
    }
    items
}

/// Properties collected while walking one item's subtree.
#[derive(Default)]
struct ItemState {
    properties: BTreeMap<String, Vec<Value>>,
    children: Vec<Value>,
    has_plain_or_embedded: bool,
    has_url: bool,
    has_nested: bool,
}

fn parse_item(el: ElementRef<'_>, base: Option<&Url>) -> Map<String, Value> {
    let mut state = ItemState::default();
    walk(el, base, &mut state);
    add_implied(el, base, &mut state);

    let mut item = Map::new();
    item.insert("type".into(), json!(root_types(el)));
    let properties: Map<String, Value> = state
        .properties
        .into_iter()
        .map(|(name, values)| (name, Value::Array(values)))
        .collect();
    item.insert("properties".into(), Value::Object(properties));
    if !state.children.is_empty() {
        item.insert("children".into(), Value::Array(state.children));
    }
    item
}

fn walk(el: ElementRef<'_>, base: Option<&Url>, state: &mut ItemState) {
    for child in child_elements(el) {
        let props = property_classes(child);
        for (kind, _) in &props {
            match kind {
                PropertyKind::Plain | PropertyKind::Embedded => state.has_plain_or_embedded = true,
                PropertyKind::Url => state.has_url = true,
                PropertyKind::DateTime => {}
            }
        }

        if !root_types(child).is_empty() {
            state.has_nested = true;
            let nested = parse_item(child, base);
            if props.is_empty() {
                state.children.push(Value::Object(nested));
                continue;
            }
            for (kind, name) in props {
                let mut value = nested.clone();
                value.insert("value".into(), nested_value(kind, child, &nested, base));
                if kind == PropertyKind::Embedded {
                    value.insert("html".into(), json!(child.inner_html().trim()));
                }
                state.push(name, Value::Object(value));
            }
            continue;
        }

        for (kind, name) in props {
            state.push(name, property_value(kind, child, base));
        }
        walk(child, base, state);
    }
}

impl ItemState {
    fn push(&mut self, name: String, value: Value) {
        self.properties.entry(name).or_default().push(value);
    }
}

/// The `value` of a nested item used as a property: its own name or url
/// when it has one, else the plain parse of the element.
fn nested_value(
    kind: PropertyKind,
    el: ElementRef<'_>,
    nested: &Map<String, Value>,
    base: Option<&Url>,
) -> Value {
    let own = match kind {
        PropertyKind::Plain => Some("name"),
        PropertyKind::Url => Some("url"),
        _ => None,
    };
    let from_item = own.and_then(|name| {
        nested
            .get("properties")
            .and_then(|p| p.get(name))
            .and_then(|v| v.get(0))
            .filter(|v| v.is_string())
            .cloned()
    });

    match from_item {
        Some(v) => v,
        None if kind == PropertyKind::Embedded => json!(text_content(el)),
        None => property_value(kind, el, base),
    }
}

fn property_value(kind: PropertyKind, el: ElementRef<'_>, base: Option<&Url>) -> Value {
    let e = el.value();
    let name = e.name();
    match kind {
        PropertyKind::Plain => {
            let attr = match name {
                "abbr" | "link" => e.attr("title"),
                "data" | "input" => e.attr("value"),
                "img" | "area" => e.attr("alt"),
                _ => None,
            };
            json!(attr.map(str::to_string).unwrap_or_else(|| text_content(el)))
        }
        PropertyKind::Url => {
            let attr = match name {
                "a" | "area" | "link" => e.attr("href"),
                "img" | "audio" | "source" | "iframe" => e.attr("src"),
                "video" => e.attr("src").or_else(|| e.attr("poster")),
                "object" => e.attr("data"),
                _ => None,
            };
            match attr {
                Some(url) => json!(resolve(base, url)),
                None => {
                    let fallback = match name {
                        "abbr" => e.attr("title"),
                        "data" | "input" => e.attr("value"),
                        _ => None,
                    };
                    json!(fallback.map(str::to_string).unwrap_or_else(|| text_content(el)))
                }
            }
        }
        PropertyKind::DateTime => {
            let attr = match name {
                "time" | "ins" | "del" => e.attr("datetime"),
                "abbr" => e.attr("title"),
                "data" | "input" => e.attr("value"),
                _ => None,
            };
            json!(attr.map(str::to_string).unwrap_or_else(|| text_content(el)))
        }
        PropertyKind::Embedded => json!({
            "html": el.inner_html().trim(),
            "value": text_content(el),
        }),
    }
}

fn add_implied(el: ElementRef<'_>, base: Option<&Url>, state: &mut ItemState) {
    let only_child = {
        let mut children = child_elements(el);
        match (children.next(), children.next()) {
            (Some(child), None) => Some(child),
            _ => None,
        }
    };

    if !state.properties.contains_key("name") && !state.has_plain_or_embedded && !state.has_nested
    {
        let name = implied_attr(el, &[("img", "alt"), ("area", "alt"), ("abbr", "title")])
            .or_else(|| {
                only_child.and_then(|c| {
                    implied_attr(c, &[("img", "alt"), ("area", "alt"), ("abbr", "title")])
                })
            })
            .unwrap_or_else(|| text_content(el));
        state.push("name".into(), json!(name));
    }

    if !state.properties.contains_key("photo") && !state.has_url && !state.has_nested {
        let photo = implied_attr(el, &[("img", "src"), ("object", "data")]).or_else(|| {
            only_child.and_then(|c| implied_attr(c, &[("img", "src"), ("object", "data")]))
        });
        if let Some(src) = photo {
            state.push("photo".into(), json!(resolve(base, &src)));
        }
    }

    if !state.properties.contains_key("url") && !state.has_url && !state.has_nested {
        let url = implied_attr(el, &[("a", "href"), ("area", "href")])
            .or_else(|| only_child.and_then(|c| implied_attr(c, &[("a", "href"), ("area", "href")])));
        if let Some(href) = url {
            state.push("url".into(), json!(resolve(base, &href)));
        }
    }
}

/// First `(tag, attr)` pair that matches `el`, returning the attribute value.
fn implied_attr(el: ElementRef<'_>, candidates: &[(&str, &str)]) -> Option<String> {
    let e = el.value();
    candidates
        .iter()
        .filter(|(tag, _)| e.name() == *tag)
        .find_map(|(_, attr)| e.attr(attr))
        .map(str::to_string)
}

/// `h-*` classes of `el`, sorted and deduplicated.
fn root_types(el: ElementRef<'_>) -> Vec<String> {
    let mut types: Vec<String> = el
        .value()
        .classes()
        .filter(|c| c.strip_prefix("h-").is_some_and(is_valid_name))
        .map(str::to_string)
        .collect();
    types.sort();
    types.dedup();
    types
}

fn property_classes(el: ElementRef<'_>) -> Vec<(PropertyKind, String)> {
    let mut out: Vec<(PropertyKind, String)> = Vec::new();
    for class in el.value().classes() {
        let parsed = [
            ("p-", PropertyKind::Plain),
            ("u-", PropertyKind::Url),
            ("dt-", PropertyKind::DateTime),
            ("e-", PropertyKind::Embedded),
        ]
        .into_iter()
        .find_map(|(prefix, kind)| {
            class
                .strip_prefix(prefix)
                .filter(|rest| is_valid_name(rest))
                .map(|rest| (kind, rest.to_string()))
        });
        if let Some(prop) = parsed
            && !out.contains(&prop)
        {
            out.push(prop);
        }
    }
    out
}

/// Lowercase letters, digits and single inner hyphens, with at least one letter.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--")
        && name.chars().any(|c| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
