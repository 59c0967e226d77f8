//! HTML microdata (`itemscope` / `itemtype` / `itemprop`).

use std::collections::BTreeMap;

use scraper::{ElementRef, Html};
use serde_json::{Map, Value, json};
use url::Url;

use super::dom::{child_elements, elements, resolve, text_content};

/// Extract every top-level microdata item in `doc`.
///
/// Items nested as property values are emitted inside their parent only.
pub(crate) fn extract(doc: &Html, base: Option<&Url>) -> Vec<Value> {
    let mut parser = MicrodataParser {
        doc,
        base,
        emitted: Vec::new(),
        open: Vec::new(),
    };

    let scopes: Vec<ElementRef<'_>> = elements(doc.root_element())
        .filter(|e| e.value().attr("itemscope").is_some())
        .collect();

    let mut items = Vec::new();
    for scope in scopes {
        if parser.emitted.contains(&scope) {
            continue;
        }
        items.extend(parser.item(scope));
    }
    items
}

struct MicrodataParser<'a> {
    doc: &'a Html,
    base: Option<&'a Url>,
    /// Item scopes already emitted, either top-level or nested. Only
    /// suppresses top-level duplicates.
    emitted: Vec<ElementRef<'a>>,
    /// Items currently being built, innermost last.
    open: Vec<ElementRef<'a>>,
}

impl<'a> MicrodataParser<'a> {
    /// Build the item rooted at `node`, or `None` when `node` is already
    /// being built further up (an `itemref` cycle).
    fn item(&mut self, node: ElementRef<'a>) -> Option<Value> {
        if self.open.contains(&node) {
            tracing::debug!("Microdata itemref cycle, skipping nested item");
            return None;
        }
        if !self.emitted.contains(&node) {
            self.emitted.push(node);
        }
        self.open.push(node);
        let item = self.build_item(node);
        self.open.pop();
        Some(item)
    }

    fn build_item(&mut self, node: ElementRef<'a>) -> Value {
        let mut item = Map::new();
        let types: Vec<&str> = node
            .value()
            .attr("itemtype")
            .unwrap_or_default()
            .split_whitespace()
            .collect();
        if !types.is_empty() {
            let ty = if types.len() == 1 {
                json!(types[0])
            } else {
                json!(types)
            };
            item.insert("type".into(), ty);

            if let Some(id) = node.value().attr("itemid").map(str::trim)
                && !id.is_empty()
            {
                item.insert("id".into(), json!(id));
            }
        }

        let mut properties: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        self.collect_properties(node, &mut properties);
        self.follow_refs(node, &mut properties);

        if properties.is_empty() {
            item.insert("value".into(), self.plain_value(node));
        } else {
            let props: Map<String, Value> = properties
                .into_iter()
                .map(|(name, mut values)| {
                    let value = if values.len() == 1 {
                        values.remove(0)
                    } else {
                        Value::Array(values)
                    };
                    (name, value)
                })
                .collect();
            item.insert("properties".into(), Value::Object(props));
        }

        Value::Object(item)
    }

    /// Walk the descendants of `node`, stopping at nested item scopes.
    fn collect_properties(
        &mut self,
        node: ElementRef<'a>,
        properties: &mut BTreeMap<String, Vec<Value>>,
    ) {
        for child in child_elements(node) {
            if child.value().attr("itemprop").is_some() {
                self.add_property(child, properties);
            }
            if child.value().attr("itemscope").is_none() {
                self.collect_properties(child, properties);
            }
        }
    }

    fn follow_refs(
        &mut self,
        node: ElementRef<'a>,
        properties: &mut BTreeMap<String, Vec<Value>>,
    ) {
        let Some(refs) = node.value().attr("itemref") else {
            return;
        };
        let doc = self.doc;
        for id in refs.split_whitespace() {
            let Some(target) = elements(doc.root_element()).find(|e| e.value().id() == Some(id))
            else {
                tracing::debug!(itemref = id, "Microdata itemref points at a missing id");
                continue;
            };
            if target.value().attr("itemprop").is_some() {
                self.add_property(target, properties);
            }
            if target.value().attr("itemscope").is_none() {
                self.collect_properties(target, properties);
            }
        }
    }

    fn add_property(
        &mut self,
        el: ElementRef<'a>,
        properties: &mut BTreeMap<String, Vec<Value>>,
    ) {
        let value = if el.value().attr("itemscope").is_some() {
            match self.item(el) {
                Some(item) => item,
                None => return,
            }
        } else {
            self.plain_value(el)
        };

        for name in el.value().attr("itemprop").unwrap_or_default().split_whitespace() {
            properties
                .entry(name.to_string())
                .or_default()
                .push(value.clone());
        }
    }

    /// Property value of a non-item element, by tag name.
    fn plain_value(&self, el: ElementRef<'a>) -> Value {
        let attrs = el.value();
        let url_attr = |name: &str| {
            json!(
                attrs
                    .attr(name)
                    .map(|v| resolve(self.base, v))
                    .unwrap_or_default()
            )
        };

        match attrs.name() {
            "meta" => json!(attrs.attr("content").unwrap_or_default()),
            "audio" | "embed" | "iframe" | "img" | "source" | "track" | "video" => url_attr("src"),
            "a" | "area" | "link" => url_attr("href"),
            "object" => url_attr("data"),
            "data" | "meter" => json!(attrs.attr("value").unwrap_or_default()),
            "time" => match attrs.attr("datetime") {
                Some(dt) => json!(dt),
                None => json!(text_content(el)),
            },
            _ => match attrs.attr("content") {
                Some(content) => json!(content),
                None => json!(text_content(el)),
            },
        }
    }
}
