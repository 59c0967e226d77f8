//! OpenGraph `<meta property="og:..." content="...">` tags.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html};
use serde_json::{Value, json};

use super::dom::{child_elements, elements};

/// Namespaces recognised without an explicit `prefix` declaration.
const KNOWN_NAMESPACES: [(&str, &str); 8] = [
    ("og", "http://ogp.me/ns#"),
    ("fb", "http://www.facebook.com/2008/fbml"),
    ("music", "http://ogp.me/ns/music#"),
    ("video", "http://ogp.me/ns/video#"),
    ("article", "http://ogp.me/ns/article#"),
    ("book", "http://ogp.me/ns/book#"),
    ("profile", "http://ogp.me/ns/profile#"),
    ("website", "http://ogp.me/ns/website#"),
];

/// One item per `<head>`, holding the namespaces in use and the ordered
/// `[property, content]` pairs.
pub(crate) fn extract(doc: &Html) -> Vec<Value> {
    let root = doc.root_element();
    let root_prefixes = root.value().attr("prefix").map(parse_prefixes);

    elements(root)
        .filter(|e| e.value().name() == "head")
        .filter_map(|head| head_item(head, root_prefixes.clone().unwrap_or_default()))
        .collect()
}

fn head_item(head: ElementRef<'_>, mut namespaces: BTreeMap<String, String>) -> Option<Value> {
    if let Some(declared) = head.value().attr("prefix") {
        namespaces.extend(parse_prefixes(declared));
    }

    let mut properties = Vec::new();
    for meta in child_elements(head).filter(|e| e.value().name() == "meta") {
        let (Some(property), Some(content)) =
            (meta.value().attr("property"), meta.value().attr("content"))
        else {
            continue;
        };
        if content.is_empty() {
            continue;
        }

        let prefix = property.split(':').next().unwrap_or(property);
        if let Some((_, uri)) = KNOWN_NAMESPACES.iter().find(|(p, _)| *p == prefix) {
            namespaces.insert(prefix.to_string(), uri.to_string());
        }
        if namespaces.contains_key(prefix) {
            properties.push(json!([property, content]));
        }
    }

    if properties.is_empty() {
        None
    } else {
        Some(json!({"namespace": namespaces, "properties": properties}))
    }
}

/// Parse an RDFa-style `prefix` attribute: `"og: http://ogp.me/ns# ex: http://ex.org/"`.
pub(crate) fn parse_prefixes(raw: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let mut tokens = raw.split_whitespace();
    while let Some(token) = tokens.next() {
        if let Some(prefix) = token.strip_suffix(':')
            && !prefix.is_empty()
            && let Some(uri) = tokens.next()
        {
            out.insert(prefix.to_ascii_lowercase(), uri.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_opengraph() {
        let doc = Html::parse_document(
            r#"<html><head>
                <meta property="og:title" content="The Rock">
                <meta property="og:type" content="video.movie">
                <meta property="og:image" content="">
                <meta name="description" content="not og">
            </head><body></body></html>"#,
        );

        assert_eq!(
            extract(&doc),
            vec![json!({
                "namespace": {"og": "http://ogp.me/ns#"},
                "properties": [["og:title", "The Rock"], ["og:type", "video.movie"]],
            })]
        );
    }

    #[test]
    fn test_declared_prefix_is_honoured() {
        let doc = Html::parse_document(
            r#"<html prefix="my: http://example.com/ns#"><head>
                <meta property="my:rating" content="5">
                <meta property="other:thing" content="dropped">
            </head></html>"#,
        );

        let items = extract(&doc);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["namespace"]["my"], "http://example.com/ns#");
        assert_eq!(items[0]["properties"], json!([["my:rating", "5"]]));
    }

    #[test]
    fn test_repeated_properties_are_kept_in_order() {
        let doc = Html::parse_document(
            r#"<head>
                <meta property="og:image" content="a.png">
                <meta property="og:image" content="b.png">
            </head>"#,
        );

        assert_eq!(
            extract(&doc)[0]["properties"],
            json!([["og:image", "a.png"], ["og:image", "b.png"]])
        );
    }

    #[test]
    fn test_no_opengraph() {
        let doc = Html::parse_document("<html><head><title>x</title></head></html>");
        assert!(extract(&doc).is_empty());
    }

    #[test]
    fn test_parse_prefixes() {
        let parsed = parse_prefixes("og: http://ogp.me/ns#  fb: http://fb.example/ dangling:");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["fb"], "http://fb.example/");
    }
}
